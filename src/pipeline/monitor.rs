// src/pipeline/monitor.rs

//! Single-site check: fetch, extract, diff, update.
//!
//! A failed fetch (network, HTTP status, rendering) or a snapshot I/O error
//! is retried after a fixed delay until the retry budget is spent. An empty
//! extraction after a successful fetch ends the check immediately and leaves
//! the snapshot untouched.

use std::time::Duration;

use crate::error::Result;
use crate::models::{Article, KeywordFilter, SiteTarget, TaskConfig};
use crate::services::{ExtractorRegistry, PageFetcher};
use crate::storage::SnapshotStorage;

/// Failure message for a page that parsed to nothing.
pub const EMPTY_PARSE_MESSAGE: &str = "empty parse result, site structure may have changed";

/// Bounded fixed-delay retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn from_task(task: &TaskConfig) -> Self {
        Self::new(task.retry_count, task.retry_delay())
    }
}

/// Result of checking one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteOutcome {
    pub succeeded: bool,
    /// New articles whose title mentions a keyword
    pub matched_articles: Vec<Article>,
    pub error: Option<String>,
    /// Fetch attempts made, including the first
    pub attempts: u32,
}

impl SiteOutcome {
    fn success(matched_articles: Vec<Article>, attempts: u32) -> Self {
        Self {
            succeeded: true,
            matched_articles,
            error: None,
            attempts,
        }
    }

    fn failure(message: impl Into<String>, attempts: u32) -> Self {
        Self {
            succeeded: false,
            matched_articles: Vec::new(),
            error: Some(message.into()),
            attempts,
        }
    }
}

enum Attempt {
    Completed {
        extracted: usize,
        fresh: usize,
        matched: Vec<Article>,
    },
    Empty,
}

/// Drives one site through a check using borrowed collaborators.
pub struct SiteMonitor<'a> {
    fetcher: &'a mut dyn PageFetcher,
    registry: &'a ExtractorRegistry,
    store: &'a dyn SnapshotStorage,
    keywords: &'a KeywordFilter,
    retry: RetryPolicy,
}

impl<'a> SiteMonitor<'a> {
    pub fn new(
        fetcher: &'a mut dyn PageFetcher,
        registry: &'a ExtractorRegistry,
        store: &'a dyn SnapshotStorage,
        keywords: &'a KeywordFilter,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            registry,
            store,
            keywords,
            retry,
        }
    }

    /// Check a site. Never fails: problems are reported in the outcome.
    pub async fn check(&mut self, target: &SiteTarget) -> SiteOutcome {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.attempt(target).await {
                Ok(Attempt::Completed {
                    extracted,
                    fresh,
                    matched,
                }) => {
                    log::info!(
                        "[{}] {extracted} articles, {fresh} new, {} matching keywords",
                        target.name,
                        matched.len()
                    );
                    return SiteOutcome::success(matched, attempt);
                }
                Ok(Attempt::Empty) => {
                    log::error!("[{}] {EMPTY_PARSE_MESSAGE}", target.name);
                    return SiteOutcome::failure(EMPTY_PARSE_MESSAGE, attempt);
                }
                Err(e) if attempt <= self.retry.max_retries => {
                    log::warn!(
                        "[{}] attempt {attempt} failed: {e}. Retrying in {}s ({}/{})",
                        target.name,
                        self.retry.delay.as_secs(),
                        attempt,
                        self.retry.max_retries
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => {
                    log::error!("[{}] giving up: {e}", target.name);
                    return SiteOutcome::failure(
                        format!("{e} (failed after {} retries)", self.retry.max_retries),
                        attempt,
                    );
                }
            }
        }
    }

    async fn attempt(&mut self, target: &SiteTarget) -> Result<Attempt> {
        let html = self.fetcher.fetch(target).await?;

        let articles = self.registry.extract(&target.key, &html);
        if articles.is_empty() {
            return Ok(Attempt::Empty);
        }

        let fresh = self.store.new_articles(&target.key, &articles).await?;
        self.store.update_snapshot(&target.key, &articles).await?;

        for article in &fresh {
            log::debug!("[{}] new: {} ({})", target.name, article.title, article.url);
        }

        Ok(Attempt::Completed {
            extracted: articles.len(),
            fresh: fresh.len(),
            matched: self.keywords.apply(&fresh),
        })
    }
}
