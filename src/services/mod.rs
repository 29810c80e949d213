//! Service layer for the site monitor.
//!
//! This module contains the moving parts of a site check:
//! - Article extraction (`ExtractorRegistry`)
//! - Page retrieval (`HttpFetcher`, `PageRenderer`)
//! - Notification delivery (`NotifierSet`)

pub mod extractors;
mod fetcher;
pub mod notifier;
mod renderer;

pub use extractors::{ExtractionRule, ExtractorRegistry};
pub use fetcher::{HttpFetcher, PageFetcher};
pub use notifier::{EmailNotifier, LogNotifier, Notifier, NotifierSet, TelegramNotifier};
#[cfg(feature = "render")]
pub use renderer::ChromeRenderer;
pub use renderer::PageRenderer;
