//! Site-specific article extraction.
//!
//! Every monitored site gets its own [`ExtractionRule`]. A rule turns the
//! listing page HTML into the ordered list of its most recent articles.
//! Rules never fail on unexpected markup: a selector that matches nothing
//! simply yields fewer (or zero) articles, which the monitor reports as a
//! possible structure change.
//!
//! Relative links are resolved against each rule's own base URL.

mod containers;
mod headings;
mod links;

use std::collections::{HashMap, HashSet};

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::Article;
use crate::utils::{normalize_whitespace, resolve_url};

use containers::{CardSpec, ListingSpec};
use links::LinkScan;

/// Extraction heuristic for one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionRule {
    ThreeErp,
    RapidDirect,
    Fictiv,
    Protolabs,
    Wayken,
    Jlccnc,
    Partmfg,
    ChinaMachining,
    HlcMetalparts,
    Zintilon,
    CncLathing,
}

impl ExtractionRule {
    /// All built-in rules.
    pub const ALL: [ExtractionRule; 11] = [
        Self::ThreeErp,
        Self::RapidDirect,
        Self::Fictiv,
        Self::Protolabs,
        Self::Wayken,
        Self::Jlccnc,
        Self::Partmfg,
        Self::ChinaMachining,
        Self::HlcMetalparts,
        Self::Zintilon,
        Self::CncLathing,
    ];

    /// Site key the rule is registered under.
    pub fn key(self) -> &'static str {
        match self {
            Self::ThreeErp => "3erp",
            Self::RapidDirect => "rapiddirect",
            Self::Fictiv => "fictiv",
            Self::Protolabs => "protolabs",
            Self::Wayken => "wayken",
            Self::Jlccnc => "jlccnc",
            Self::Partmfg => "partmfg",
            Self::ChinaMachining => "china-machining",
            Self::HlcMetalparts => "hlc-metalparts",
            Self::Zintilon => "zintilon",
            Self::CncLathing => "cnclathing",
        }
    }

    /// Find the built-in rule for a site key.
    pub fn for_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rule| rule.key() == key)
    }

    /// Origin used to absolutize relative links.
    pub fn base_url(self) -> &'static str {
        match self {
            Self::ThreeErp => "https://www.3erp.com",
            Self::RapidDirect => "https://www.rapiddirect.com",
            Self::Fictiv => "https://fictiv.com",
            Self::Protolabs => "https://www.protolabs.com",
            Self::Wayken => "https://waykenrm.com",
            Self::Jlccnc => "https://jlccnc.com",
            Self::Partmfg => "https://www.partmfg.com",
            Self::ChinaMachining => "https://www.china-machining.com",
            Self::HlcMetalparts => "https://www.hlc-metalparts.com",
            Self::Zintilon => "https://www.zintilon.com",
            Self::CncLathing => "https://www.cnclathing.com",
        }
    }

    /// Extract at most `limit` articles from a parsed listing page.
    pub fn extract(self, document: &Html, limit: usize) -> Result<Vec<Article>> {
        let base = Url::parse(self.base_url())?;
        let mut out = ArticleList::new(&base, limit);

        match self {
            Self::ThreeErp => containers::extract_cards(document, &CardSpec::THREE_ERP, &mut out)?,
            Self::RapidDirect => {
                headings::extract_next_link(document, "h2", "/blog/", &mut out)?
            }
            Self::Protolabs | Self::Zintilon => {
                headings::extract_enclosing_link(document, "h2, h3", &mut out)?
            }
            Self::Wayken => containers::extract_listing(document, &ListingSpec::WAYKEN, &mut out)?,
            Self::Partmfg => {
                containers::extract_listing(document, &ListingSpec::PARTMFG, &mut out)?
            }
            Self::ChinaMachining => {
                containers::extract_listing(document, &ListingSpec::CHINA_MACHINING, &mut out)?
            }
            Self::Fictiv => links::extract_with_heading(document, "/articles/", &mut out)?,
            Self::Jlccnc => links::extract_link_text(document, &LinkScan::JLCCNC, &mut out)?,
            Self::HlcMetalparts => links::extract_news_links(document, &mut out)?,
            Self::CncLathing => links::extract_guide_links(document, &mut out)?,
        }

        Ok(out.into_vec())
    }
}

/// Maps site keys to extraction rules.
#[derive(Debug, Clone)]
pub struct ExtractorRegistry {
    rules: HashMap<String, ExtractionRule>,
    limit: usize,
}

impl ExtractorRegistry {
    /// Create an empty registry returning at most `limit` articles per site.
    pub fn new(limit: usize) -> Self {
        Self {
            rules: HashMap::new(),
            limit,
        }
    }

    /// Create a registry with every built-in rule under its own key.
    pub fn with_builtin_rules(limit: usize) -> Self {
        let mut registry = Self::new(limit);
        for rule in ExtractionRule::ALL {
            registry.register(rule.key(), rule);
        }
        registry
    }

    /// Register (or replace) the rule for a site key.
    pub fn register(&mut self, key: impl Into<String>, rule: ExtractionRule) {
        self.rules.insert(key.into(), rule);
    }

    pub fn rule(&self, key: &str) -> Option<ExtractionRule> {
        self.rules.get(key).copied()
    }

    /// Extract the newest articles of a site from its listing HTML.
    ///
    /// Unknown keys and unusable markup both produce an empty list.
    pub fn extract(&self, site_key: &str, html: &str) -> Vec<Article> {
        let Some(rule) = self.rule(site_key) else {
            log::warn!("No extraction rule registered for site '{site_key}'");
            return Vec::new();
        };

        let document = Html::parse_document(html);
        match rule.extract(&document, self.limit) {
            Ok(articles) => {
                log::debug!("Extracted {} articles for '{site_key}'", articles.len());
                articles
            }
            Err(e) => {
                log::error!("Extraction rule for '{site_key}' failed: {e}");
                Vec::new()
            }
        }
    }
}

/// Ordered, URL-deduplicated article accumulator with a size cap.
pub(crate) struct ArticleList<'b> {
    base: &'b Url,
    limit: usize,
    seen: HashSet<String>,
    articles: Vec<Article>,
}

impl<'b> ArticleList<'b> {
    fn new(base: &'b Url, limit: usize) -> Self {
        Self {
            base,
            limit,
            seen: HashSet::new(),
            articles: Vec::new(),
        }
    }

    /// Add an article whose link may be relative. Duplicates are dropped.
    pub(crate) fn push(&mut self, title: String, href: &str) {
        self.push_dated(title, href, None);
    }

    pub(crate) fn push_dated(&mut self, title: String, href: &str, date: Option<String>) {
        if self.is_full() || title.is_empty() || href.is_empty() {
            return;
        }
        let url = resolve_url(self.base, href);
        if self.seen.insert(url.clone()) {
            let article = Article::new(title, url);
            self.articles.push(match date {
                Some(date) => article.with_date(date),
                None => article,
            });
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.articles.len() >= self.limit
    }

    pub(crate) fn limit(&self) -> usize {
        self.limit
    }

    fn into_vec(self) -> Vec<Article> {
        self.articles
    }
}

/// Parse a CSS selector.
pub(crate) fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Visible text of an element with whitespace collapsed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// `href` attribute of an element, or an empty string.
pub(crate) fn href_of<'a>(element: ElementRef<'a>) -> &'a str {
    element.value().attr("href").unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_rule_round_trips_its_key() {
        for rule in ExtractionRule::ALL {
            assert_eq!(ExtractionRule::for_key(rule.key()), Some(rule));
            assert!(Url::parse(rule.base_url()).is_ok());
        }
        assert_eq!(ExtractionRule::for_key("unknown-site"), None);
    }

    #[test]
    fn test_unknown_key_returns_empty() {
        let registry = ExtractorRegistry::with_builtin_rules(3);
        let html = r#"<html><body><h2><a href="/blog/a">A perfectly fine title</a></h2></body></html>"#;
        assert!(registry.extract("not-registered", html).is_empty());
    }

    #[test]
    fn test_unmatched_structure_returns_empty() {
        let registry = ExtractorRegistry::with_builtin_rules(3);
        let html = "<html><body><p>Maintenance in progress</p></body></html>";
        for rule in ExtractionRule::ALL {
            assert!(
                registry.extract(rule.key(), html).is_empty(),
                "{} matched an empty page",
                rule.key()
            );
        }
    }

    #[test]
    fn test_register_custom_key() {
        let mut registry = ExtractorRegistry::new(3);
        registry.register("fictiv-mirror", ExtractionRule::Fictiv);
        assert_eq!(registry.rule("fictiv-mirror"), Some(ExtractionRule::Fictiv));
        assert_eq!(registry.rule("fictiv"), None);
    }

    #[test]
    fn test_article_list_dedupes_and_caps() {
        let base = Url::parse("https://example.com").unwrap();
        let mut list = ArticleList::new(&base, 2);
        list.push("First".into(), "/a");
        list.push("First again".into(), "https://example.com/a");
        list.push("Second".into(), "/b");
        list.push("Third".into(), "/c");

        let articles = list.into_vec();
        assert_eq!(
            articles,
            vec![
                Article::new("First", "https://example.com/a"),
                Article::new("Second", "https://example.com/b"),
            ]
        );
    }

    #[test]
    fn test_article_list_skips_empty_parts() {
        let base = Url::parse("https://example.com").unwrap();
        let mut list = ArticleList::new(&base, 3);
        list.push(String::new(), "/a");
        list.push("Title".into(), "");
        assert!(list.into_vec().is_empty());
    }

    #[test]
    fn test_element_text_collapses_whitespace() {
        let html = Html::parse_fragment("<h2>  CNC\n  <span>Milling</span>  Guide </h2>");
        let sel = parse_selector("h2").unwrap();
        let h2 = html.select(&sel).next().unwrap();
        assert_eq!(element_text(h2), "CNC Milling Guide");
    }

    #[test]
    fn test_invalid_selector_is_error() {
        assert!(parse_selector("[[invalid").is_err());
        assert!(parse_selector("div[class*='bde-text-']").is_ok());
    }
}
