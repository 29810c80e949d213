// src/pipeline/schedule.rs

//! Daily scheduling.

use chrono::{Days, Local, NaiveDateTime, NaiveTime};

use crate::pipeline::RunCoordinator;

/// Next occurrence of `run_time` strictly after `now`.
pub fn next_run_after(now: NaiveDateTime, run_time: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(run_time);
    if today > now {
        today
    } else {
        now.date()
            .checked_add_days(Days::new(1))
            .map(|d| d.and_time(run_time))
            .unwrap_or(today)
    }
}

/// Run a cycle every day at `run_time` local time. Never returns.
pub async fn run_daily(coordinator: &mut RunCoordinator, run_time: NaiveTime) {
    log::info!("Daily schedule active, running at {}", run_time.format("%H:%M"));

    loop {
        let now = Local::now().naive_local();
        let next = next_run_after(now, run_time);
        let wait = (next - now).to_std().unwrap_or_default();
        log::info!(
            "Next run at {} (in {}m)",
            next.format("%Y-%m-%d %H:%M"),
            wait.as_secs() / 60
        );
        tokio::time::sleep(wait).await;

        let report = coordinator.run_cycle().await;
        if !report.is_clean() {
            log::warn!("{} of {} sites failed", report.failed, report.total_sites());
        }
    }
}
