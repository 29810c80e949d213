//! Article data structures.

use serde::{Deserialize, Serialize};

/// An article listed on a monitored site.
///
/// Two articles are the same article when their URLs are equal; titles are
/// not stable enough to identify anything.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Article {
    /// Article title as shown on the listing page
    pub title: String,

    /// Absolute URL of the article
    pub url: String,

    /// Publication date, when the listing exposes one
    #[serde(default)]
    pub date: Option<String>,
}

impl Article {
    /// Create an article without a publication date.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            date: None,
        }
    }

    /// Attach a publication date.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Check whether the title contains any of the given keywords.
    ///
    /// Keywords are expected in upper case (see [`KeywordFilter`]).
    ///
    /// [`KeywordFilter`]: crate::models::KeywordFilter
    pub(crate) fn title_contains_any(&self, upper_keywords: &[String]) -> bool {
        let title = self.title.to_uppercase();
        upper_keywords.iter().any(|k| title.contains(k.as_str()))
    }
}

/// A new article together with the site it was found on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteArticle {
    /// Display name of the site
    pub site: String,
    pub article: Article,
}

/// A site-level failure recorded during a cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteError {
    /// Display name of the site
    pub site: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_entry_without_date() {
        let json = r#"{"title": "Anodizing 101", "url": "https://example.com/a"}"#;
        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article, Article::new("Anodizing 101", "https://example.com/a"));
    }

    #[test]
    fn test_snapshot_entry_with_date() {
        let json = r#"{"title": "T", "url": "https://example.com/a", "date": "Feb 10, 2026"}"#;
        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.date.as_deref(), Some("Feb 10, 2026"));
    }

    #[test]
    fn test_title_contains_any_ignores_case() {
        let article = Article::new("Precision cnc Machining Tips", "https://example.com/x");
        assert!(article.title_contains_any(&["CNC".to_string()]));
        assert!(!article.title_contains_any(&["LASER".to_string()]));
    }
}
