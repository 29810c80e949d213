//! Pipeline entry points for monitoring runs.
//!
//! - `SiteMonitor`: check one site with bounded retries
//! - `RunCoordinator`: check every site and report once per cycle
//! - `run_daily`: repeat cycles at a fixed local time

pub mod diff;
pub mod monitor;
pub mod run;
pub mod schedule;

pub use diff::new_articles;
pub use monitor::{EMPTY_PARSE_MESSAGE, RetryPolicy, SiteMonitor, SiteOutcome};
pub use run::RunCoordinator;
pub use schedule::{next_run_after, run_daily};
