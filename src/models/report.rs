//! Per-cycle run report.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::models::{Article, SiteArticle, SiteError};

/// Aggregate outcome of one monitoring cycle.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Keyword-matched new articles in site order
    pub new_articles: Vec<SiteArticle>,
    /// One entry per failed site
    pub errors: Vec<SiteError>,
    pub succeeded: usize,
    pub failed: usize,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
}

impl RunReport {
    pub fn start() -> Self {
        Self {
            new_articles: Vec::new(),
            errors: Vec::new(),
            succeeded: 0,
            failed: 0,
            started_at: Local::now(),
            finished_at: None,
        }
    }

    /// Record a site that completed, with its matched new articles.
    pub fn record_success(&mut self, site: &str, articles: Vec<Article>) {
        self.succeeded += 1;
        self.new_articles
            .extend(articles.into_iter().map(|article| SiteArticle {
                site: site.to_string(),
                article,
            }));
    }

    /// Record a site that failed.
    pub fn record_failure(&mut self, site: &str, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(SiteError {
            site: site.to_string(),
            message: message.into(),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Local::now());
    }

    /// Every site succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Anything worth notifying about.
    pub fn has_news(&self) -> bool {
        !self.new_articles.is_empty() || !self.errors.is_empty()
    }

    pub fn total_sites(&self) -> usize {
        self.succeeded + self.failed
    }
}
