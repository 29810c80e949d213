// src/utils/log.rs

//! Banner-style helpers on top of the `log` facade.
//!
//! Plain messages go through `log::info!` and friends directly; these helpers
//! only format the framed sections that open and close a monitoring cycle.

const RULE_WIDTH: usize = 60;

/// Log a header framed by double rules.
pub fn header(title: &str) {
    let border = "═".repeat(RULE_WIDTH);
    log::info!("{border}");
    log::info!("  {title}");
    log::info!("{border}");
}

/// Log a separator line.
pub fn separator() {
    log::info!("{}", "─".repeat(RULE_WIDTH));
}

/// Log a sub-item (indented).
pub fn sub_item(message: &str) {
    log::info!("    {message}");
}

/// Log a summary section.
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {title}");
    for (key, value) in items {
        sub_item(&format!("{key}: {value}"));
    }
}
