//! Keyword relevance filter.

use crate::models::Article;

/// Case-insensitive title filter applied to newly found articles.
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_uppercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Check whether an article title mentions any keyword.
    pub fn matches(&self, article: &Article) -> bool {
        article.title_contains_any(&self.keywords)
    }

    /// Keep the articles that mention any keyword, preserving order.
    pub fn apply(&self, articles: &[Article]) -> Vec<Article> {
        articles
            .iter()
            .filter(|a| self.matches(a))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_case_insensitively() {
        let filter = KeywordFilter::new(["CNC"]);
        let article = Article::new("Precision cnc Machining Tips", "https://example.com/1");
        assert!(filter.matches(&article));
    }

    #[test]
    fn test_lowercase_keyword_matches_uppercase_title() {
        let filter = KeywordFilter::new(["machining"]);
        let article = Article::new("5-AXIS MACHINING EXPLAINED", "https://example.com/1");
        assert!(filter.matches(&article));
    }

    #[test]
    fn test_apply_keeps_order() {
        let filter = KeywordFilter::new(["CNC", "Machining"]);
        let articles = vec![
            Article::new("CNC turning basics", "https://example.com/1"),
            Article::new("Injection molding guide", "https://example.com/2"),
            Article::new("Machining titanium", "https://example.com/3"),
        ];

        let matched = filter.apply(&articles);
        let urls: Vec<_> = matched.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/1", "https://example.com/3"]);
    }

    #[test]
    fn test_blank_keywords_are_ignored() {
        let filter = KeywordFilter::new(["", "  "]);
        let article = Article::new("Anything at all", "https://example.com/1");
        assert!(!filter.matches(&article));
    }
}
