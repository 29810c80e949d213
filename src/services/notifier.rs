// src/services/notifier.rs

//! Notification transports.
//!
//! A cycle produces at most one summary. Single-site checks send the site's
//! matched articles or one error alert instead. Delivery problems are
//! logged by [`NotifierSet`] and never reach the monitoring logic.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{Article, Config, EmailConfig, RunReport, TelegramConfig};
use crate::utils::{char_len, truncate_chars};

/// Titles and error messages are cut to this length in summaries.
const SUMMARY_FIELD_LEN: usize = 50;

/// Telegram rejects longer messages.
const TELEGRAM_MAX_LEN: usize = 4096;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A delivery channel for monitoring results.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Transport name used in logs.
    fn name(&self) -> &str;

    /// Whether the transport has everything it needs to deliver.
    fn is_configured(&self) -> bool {
        true
    }

    async fn send_summary(&self, report: &RunReport) -> Result<()>;

    async fn send_article_alert(&self, site: &str, article: &Article) -> Result<()>;

    async fn send_error_alert(&self, site: &str, message: &str) -> Result<()>;

    /// Report every matched article of one site. Defaults to one alert per
    /// article, stopping at the first failure.
    async fn send_site_articles(&self, site: &str, articles: &[Article]) -> Result<()> {
        for article in articles {
            self.send_article_alert(site, article).await?;
        }
        Ok(())
    }
}

// ============================================================================
// Telegram
// ============================================================================

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

/// Telegram Bot API transport using HTML formatted messages.
pub struct TelegramNotifier {
    client: reqwest::Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, config })
    }

    async fn send_message(&self, text: &str) -> Result<()> {
        let url = format!("{TELEGRAM_API}/bot{}/sendMessage", self.config.bot_token);
        let body = SendMessage {
            chat_id: &self.config.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::notify("telegram", e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::notify(
                "telegram",
                format!("HTTP {}: {}", status.as_u16(), detail.trim()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn send_summary(&self, report: &RunReport) -> Result<()> {
        let messages = summary_messages(report, TELEGRAM_MAX_LEN);
        let parts = messages.len();
        for (i, message) in messages.iter().enumerate() {
            log::debug!("Sending summary part {}/{parts}", i + 1);
            self.send_message(message).await?;
        }
        Ok(())
    }

    async fn send_article_alert(&self, site: &str, article: &Article) -> Result<()> {
        self.send_message(&format_article_alert(site, article, Local::now()))
            .await
    }

    async fn send_error_alert(&self, site: &str, message: &str) -> Result<()> {
        self.send_message(&format_error_alert(site, message, Local::now()))
            .await
    }
}

// ============================================================================
// Email
// ============================================================================

/// SMTP transport sending HTML mail to every configured recipient.
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let host = self.config.smtp_host.trim();
        let builder = if self.config.use_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| AppError::notify("email", e))?
        } else if self.config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| AppError::notify("email", e))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };

        Ok(builder
            .port(self.config.smtp_port)
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(30)))
            .build())
    }

    /// Build the message without sending it.
    fn compose(&self, subject: &str, html: String) -> Result<lettre::Message> {
        let from: Mailbox = parse_mailbox(self.config.sender())?;
        let mut builder = lettre::Message::builder().from(from).subject(subject);
        for recipient in &self.config.to_emails {
            builder = builder.to(parse_mailbox(recipient)?);
        }

        builder
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| AppError::notify("email", e))
    }

    async fn send_email(&self, subject: &str, html: String) -> Result<()> {
        let message = self.compose(subject, html)?;
        self.transport()?
            .send(message)
            .await
            .map_err(|e| AppError::notify("email", e))?;
        log::info!("Email sent: {subject}");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .trim()
        .parse()
        .map_err(|e| AppError::notify("email", format!("invalid address '{address}': {e}")))
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn send_summary(&self, report: &RunReport) -> Result<()> {
        if !report.has_news() {
            log::debug!("Nothing to report by email");
            return Ok(());
        }
        self.send_email(&summary_subject(report), format_summary_html(report))
            .await
    }

    async fn send_article_alert(&self, site: &str, article: &Article) -> Result<()> {
        self.send_site_articles(site, std::slice::from_ref(article))
            .await
    }

    async fn send_error_alert(&self, site: &str, message: &str) -> Result<()> {
        let at = Local::now();
        let subject = format!(
            "[Competitor Monitor] {site} check failed - {}",
            at.format(TIMESTAMP_FORMAT)
        );
        self.send_email(&subject, format_error_html(site, message, at))
            .await
    }

    /// One mail per site listing every matched article.
    async fn send_site_articles(&self, site: &str, articles: &[Article]) -> Result<()> {
        if articles.is_empty() {
            return Ok(());
        }
        let at = Local::now();
        let subject = format!(
            "[Competitor Monitor] New articles on {site} - {}",
            at.format("%Y-%m-%d")
        );
        self.send_email(&subject, format_site_articles_html(site, articles, at))
            .await
    }
}

// ============================================================================
// Log
// ============================================================================

/// Writes results to the application log. Always available.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send_summary(&self, report: &RunReport) -> Result<()> {
        if report.new_articles.is_empty() {
            log::info!("No new articles");
        } else {
            log::info!("{} new articles:", report.new_articles.len());
            for entry in &report.new_articles {
                log::info!(
                    "  [{}] {} - {}",
                    entry.site,
                    entry.article.title,
                    entry.article.url
                );
            }
        }
        if !report.errors.is_empty() {
            log::warn!("{} sites failed:", report.errors.len());
            for error in &report.errors {
                log::warn!("  [{}] {}", error.site, error.message);
            }
        }
        Ok(())
    }

    async fn send_article_alert(&self, site: &str, article: &Article) -> Result<()> {
        log::info!("New article on {site}: {} - {}", article.title, article.url);
        Ok(())
    }

    async fn send_error_alert(&self, site: &str, message: &str) -> Result<()> {
        log::warn!("Site {site} failed: {message}");
        Ok(())
    }
}

// ============================================================================
// Fan-out
// ============================================================================

#[derive(Clone, Copy)]
enum Dispatch<'a> {
    Summary(&'a RunReport),
    Articles(&'a str, &'a [Article]),
    Error(&'a str, &'a str),
}

/// Every transport a cycle reports to.
#[derive(Default)]
pub struct NotifierSet {
    transports: Vec<Box<dyn Notifier>>,
}

impl NotifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log transport plus Telegram and email.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut set = Self::new();
        set.push(Box::new(LogNotifier));
        set.push(Box::new(TelegramNotifier::new(config.telegram.clone())?));
        set.push(Box::new(EmailNotifier::new(config.email.clone())));
        Ok(set)
    }

    pub fn push(&mut self, transport: Box<dyn Notifier>) {
        self.transports.push(transport);
    }

    /// Send the cycle summary. Returns the number of transports that delivered.
    pub async fn send_summary(&self, report: &RunReport) -> usize {
        self.dispatch(Dispatch::Summary(report)).await
    }

    pub async fn send_site_articles(&self, site: &str, articles: &[Article]) -> usize {
        self.dispatch(Dispatch::Articles(site, articles)).await
    }

    pub async fn send_error_alert(&self, site: &str, message: &str) -> usize {
        self.dispatch(Dispatch::Error(site, message)).await
    }

    async fn dispatch(&self, message: Dispatch<'_>) -> usize {
        let mut delivered = 0;
        for transport in &self.transports {
            if !transport.is_configured() {
                log::warn!("Notifier '{}' is not configured, skipping", transport.name());
                continue;
            }

            let result = match message {
                Dispatch::Summary(report) => transport.send_summary(report).await,
                Dispatch::Articles(site, articles) => {
                    transport.send_site_articles(site, articles).await
                }
                Dispatch::Error(site, text) => transport.send_error_alert(site, text).await,
            };

            match result {
                Ok(()) => {
                    log::debug!("Notification delivered via '{}'", transport.name());
                    delivered += 1;
                }
                Err(e) => log::error!("Notification via '{}' failed: {e}", transport.name()),
            }
        }
        delivered
    }
}

// ============================================================================
// Message formatting
// ============================================================================

/// Escape text for Telegram's HTML parse mode and for HTML mail.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// A heading followed by entries that must not be split.
struct Section {
    heading: String,
    entries: Vec<String>,
}

fn summary_sections(report: &RunReport) -> Vec<Section> {
    let mut intro = format!(
        "📊 <b>Competitor Monitor Daily Report</b>\n\n<b>Checked at</b>: {}\n\n",
        report.started_at.format(TIMESTAMP_FORMAT)
    );
    if report.new_articles.is_empty() {
        intro.push_str("No new articles\n\n");
    }
    let mut sections = vec![Section {
        heading: String::new(),
        entries: vec![intro],
    }];

    if !report.new_articles.is_empty() {
        sections.push(Section {
            heading: format!("📢 <b>{} new articles:</b>\n", report.new_articles.len()),
            entries: report
                .new_articles
                .iter()
                .map(|entry| {
                    format!(
                        "• [{}] {}\n{}\n\n",
                        escape_html(&entry.site),
                        escape_html(&truncate_chars(&entry.article.title, SUMMARY_FIELD_LEN)),
                        escape_html(&entry.article.url)
                    )
                })
                .collect(),
        });
    }

    if !report.errors.is_empty() {
        sections.push(Section {
            heading: format!("⚠️ <b>{} sites failed:</b>\n", report.errors.len()),
            entries: report
                .errors
                .iter()
                .map(|error| {
                    format!(
                        "• {}: {}\n",
                        escape_html(&error.site),
                        escape_html(&truncate_chars(&error.message, SUMMARY_FIELD_LEN))
                    )
                })
                .collect(),
        });
    }
    sections
}

/// Consolidated cycle report split into messages of at most `max_len`
/// characters.
///
/// Messages break only between entries. A section continued in a new message
/// repeats its heading.
pub fn summary_messages(report: &RunReport, max_len: usize) -> Vec<String> {
    let mut messages = Vec::new();
    let mut current = String::new();

    for section in summary_sections(report) {
        let mut heading_pending = true;
        for entry in &section.entries {
            let piece_len = |with_heading: bool| {
                char_len(entry) + if with_heading { char_len(&section.heading) } else { 0 }
            };
            if !current.is_empty()
                && char_len(&current).saturating_add(piece_len(heading_pending)) > max_len
            {
                messages.push(current.trim_end().to_string());
                current.clear();
                heading_pending = true;
            }
            if heading_pending {
                current.push_str(&section.heading);
                heading_pending = false;
            }
            current.push_str(entry);
            if char_len(&current) > max_len {
                log::warn!("Summary entry longer than {max_len} characters was cut");
                current = truncate_chars(&current, max_len);
            }
        }
    }

    let last = current.trim_end();
    if !last.is_empty() {
        messages.push(last.to_string());
    }
    messages
}

/// Consolidated cycle report as a single message.
pub fn format_summary(report: &RunReport) -> String {
    summary_messages(report, usize::MAX).concat()
}

/// Alert for a single new article.
pub fn format_article_alert(site: &str, article: &Article, at: DateTime<Local>) -> String {
    format!(
        "📢 <b>New competitor article</b>\n\n\
         <b>Site</b>: {}\n\
         <b>Title</b>: {}\n\
         <b>Link</b>: {}\n\
         <b>Detected</b>: {}",
        escape_html(site),
        escape_html(&article.title),
        escape_html(&article.url),
        at.format(TIMESTAMP_FORMAT)
    )
}

/// Alert for a site whose check failed.
pub fn format_error_alert(site: &str, message: &str, at: DateTime<Local>) -> String {
    format!(
        "⚠️ <b>Site check failed</b>\n\n\
         <b>Site</b>: {}\n\
         <b>Error</b>: {}\n\
         <b>Time</b>: {}",
        escape_html(site),
        escape_html(message),
        at.format(TIMESTAMP_FORMAT)
    )
}

const MAIL_STYLE: &str = "table { border-collapse: collapse; width: 100%; margin-bottom: 20px; }\n\
     th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }\n\
     th { background-color: #4CAF50; color: white; }\n\
     tr:nth-child(even) { background-color: #f2f2f2; }";

fn mail_document(body: &str) -> String {
    format!(
        "<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n{MAIL_STYLE}\n</style>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

fn link(url: &str, label: &str) -> String {
    format!("<a href=\"{}\">{}</a>", escape_html(url), escape_html(label))
}

/// Mail subject of a cycle summary, with the article count when there is news.
pub fn summary_subject(report: &RunReport) -> String {
    let at = report.started_at.format(TIMESTAMP_FORMAT);
    match report.new_articles.len() {
        0 => format!("[Competitor Monitor] Daily report - {at}"),
        n => format!("[Competitor Monitor] {n} new articles - {at}"),
    }
}

/// HTML mail body of a cycle summary.
pub fn format_summary_html(report: &RunReport) -> String {
    let mut body = format!(
        "<h2>📊 Competitor Monitor Daily Report</h2>\n<p><b>Checked at</b>: {}</p>\n",
        report.started_at.format(TIMESTAMP_FORMAT)
    );

    body.push_str(&format!(
        "<h3>📢 New articles ({})</h3>\n",
        report.new_articles.len()
    ));
    if report.new_articles.is_empty() {
        body.push_str("<p>No new articles</p>\n");
    } else {
        body.push_str("<table>\n<tr><th>Site</th><th>Title</th><th>Link</th></tr>\n");
        for entry in &report.new_articles {
            body.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(&entry.site),
                escape_html(&entry.article.title),
                link(&entry.article.url, "Link")
            ));
        }
        body.push_str("</table>\n");
    }

    if !report.errors.is_empty() {
        body.push_str(&format!(
            "<h3>⚠️ Failed sites ({})</h3>\n<table>\n<tr><th>Site</th><th>Error</th></tr>\n",
            report.errors.len()
        ));
        for error in &report.errors {
            body.push_str(&format!(
                "<tr><td>{}</td><td>{}</td></tr>\n",
                escape_html(&error.site),
                escape_html(&error.message)
            ));
        }
        body.push_str("</table>\n");
    }

    mail_document(&body)
}

/// HTML mail body listing one site's new articles.
pub fn format_site_articles_html(site: &str, articles: &[Article], at: DateTime<Local>) -> String {
    let mut body = String::from(
        "<h2>📢 New competitor articles</h2>\n\
         <p>The following new articles matched the monitored keywords:</p>\n\
         <table>\n<tr><th>Site</th><th>Title</th><th>Link</th><th>Date</th></tr>\n",
    );
    for article in articles {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(site),
            escape_html(&article.title),
            link(&article.url, &article.url),
            escape_html(article.date.as_deref().unwrap_or_default())
        ));
    }
    body.push_str(&format!(
        "</table>\n<p style=\"color: #666; font-size: 12px;\">Sent by sitewatch<br>Detected: {}</p>\n",
        at.format("%Y-%m-%d %H:%M:%S")
    ));
    mail_document(&body)
}

/// HTML mail body for a site whose check failed.
pub fn format_error_html(site: &str, message: &str, at: DateTime<Local>) -> String {
    mail_document(&format!(
        "<h2>⚠️ Site check failed</h2>\n\
         <p><b>Site</b>: {}</p>\n<p><b>Error</b>: {}</p>\n<p><b>Time</b>: {}</p>\n",
        escape_html(site),
        escape_html(message),
        at.format(TIMESTAMP_FORMAT)
    ))
}
