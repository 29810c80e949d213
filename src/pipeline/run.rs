// src/pipeline/run.rs

//! Monitoring cycle over every configured site.

use crate::error::{AppError, Result};
use crate::models::{Config, KeywordFilter, RunReport, SiteTarget};
use crate::pipeline::monitor::{RetryPolicy, SiteMonitor, SiteOutcome};
use crate::services::{ExtractorRegistry, HttpFetcher, NotifierSet, PageFetcher};
use crate::storage::{LocalSnapshotStore, SnapshotStorage};
use crate::utils::log::{header, separator, summary};

/// Owns the collaborators of a monitoring run and drives sites through
/// [`SiteMonitor`] one at a time.
pub struct RunCoordinator {
    fetcher: Box<dyn PageFetcher>,
    registry: ExtractorRegistry,
    store: Box<dyn SnapshotStorage>,
    notifiers: NotifierSet,
    targets: Vec<SiteTarget>,
    keywords: KeywordFilter,
    retry: RetryPolicy,
}

impl RunCoordinator {
    /// Assemble a coordinator from explicit collaborators. Targets, keywords
    /// and retry settings come from `config`.
    pub fn new(
        config: &Config,
        registry: ExtractorRegistry,
        fetcher: Box<dyn PageFetcher>,
        store: Box<dyn SnapshotStorage>,
        notifiers: NotifierSet,
    ) -> Self {
        Self {
            fetcher,
            registry,
            store,
            notifiers,
            targets: config.targets.clone(),
            keywords: KeywordFilter::new(&config.keywords),
            retry: RetryPolicy::from_task(&config.task),
        }
    }

    /// Production wiring: HTTP fetcher, JSON snapshot file, log, Telegram and email.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config,
            ExtractorRegistry::with_builtin_rules(config.task.snapshot_size),
            Box::new(HttpFetcher::from_config(&config.task)?),
            Box::new(LocalSnapshotStore::new(&config.storage.data_file)),
            NotifierSet::from_config(config)?,
        ))
    }

    /// Check every site and send one summary if anything happened.
    pub async fn run_cycle(&mut self) -> RunReport {
        header(&format!("Checking {} sites", self.targets.len()));
        let mut report = RunReport::start();
        let total = self.targets.len();

        for (i, target) in self.targets.iter().enumerate() {
            log::info!("[{}/{total}] {} ({})", i + 1, target.name, target.url);
            let outcome = Self::check(
                self.fetcher.as_mut(),
                &self.registry,
                self.store.as_ref(),
                &self.keywords,
                self.retry,
                target,
            )
            .await;

            match outcome.error {
                None => report.record_success(&target.name, outcome.matched_articles),
                Some(message) => report.record_failure(&target.name, message),
            }
        }
        report.finish();

        separator();
        summary(
            "Cycle complete",
            &[
                ("Sites", report.total_sites().to_string()),
                ("Succeeded", report.succeeded.to_string()),
                ("Failed", report.failed.to_string()),
                ("New articles", report.new_articles.len().to_string()),
            ],
        );

        if report.has_news() {
            let delivered = self.notifiers.send_summary(&report).await;
            log::info!("Summary delivered via {delivered} transports");
        } else {
            log::info!("No new articles and no errors, nothing to send");
        }

        report
    }

    /// Check one site by key and send site-level alerts.
    pub async fn run_site(&mut self, key: &str) -> Result<SiteOutcome> {
        let target = self
            .targets
            .iter()
            .find(|t| t.key == key)
            .ok_or_else(|| AppError::UnknownSite(key.to_string()))?;

        header(&format!("Checking {}", target.name));
        let outcome = Self::check(
            self.fetcher.as_mut(),
            &self.registry,
            self.store.as_ref(),
            &self.keywords,
            self.retry,
            target,
        )
        .await;

        match &outcome.error {
            None if outcome.matched_articles.is_empty() => {}
            None => {
                self.notifiers
                    .send_site_articles(&target.name, &outcome.matched_articles)
                    .await;
            }
            Some(message) => {
                self.notifiers.send_error_alert(&target.name, message).await;
            }
        }
        Ok(outcome)
    }

    /// Release the fetcher's rendering session.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.fetcher.shutdown().await
    }

    async fn check(
        fetcher: &mut dyn PageFetcher,
        registry: &ExtractorRegistry,
        store: &dyn SnapshotStorage,
        keywords: &KeywordFilter,
        retry: RetryPolicy,
        target: &SiteTarget,
    ) -> SiteOutcome {
        SiteMonitor::new(fetcher, registry, store, keywords, retry)
            .check(target)
            .await
    }
}
