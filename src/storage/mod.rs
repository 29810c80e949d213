//! Snapshot persistence.
//!
//! A snapshot maps each site key to the article list seen on the last
//! successful check:
//!
//! ```text
//! {
//!   "3erp":   [ {"title": "...", "url": "https://...", "date": null}, ... ],
//!   "fictiv": [ ... ]
//! }
//! ```
//!
//! Entries are replaced wholesale after every successful extraction, never
//! merged.

pub mod local;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Article;
use crate::pipeline::new_articles;

// Re-export for convenience
pub use local::LocalSnapshotStore;

/// Whole snapshot document, ordered by site key.
pub type SnapshotDocument = BTreeMap<String, Vec<Article>>;

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Articles recorded for a site, empty if the site was never seen.
    async fn previous_articles(&self, site_key: &str) -> Result<Vec<Article>>;

    /// Articles of `current` whose URL is not in the site's snapshot, in
    /// `current` order.
    async fn new_articles(&self, site_key: &str, current: &[Article]) -> Result<Vec<Article>> {
        let previous = self.previous_articles(site_key).await?;
        Ok(new_articles(&previous, current))
    }

    /// Replace the site's snapshot with `current`.
    async fn update_snapshot(&self, site_key: &str, current: &[Article]) -> Result<()>;

    /// Every recorded site.
    async fn load_all(&self) -> Result<SnapshotDocument>;
}
