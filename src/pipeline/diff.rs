//! Snapshot difference.
//!
//! Article identity is the URL string, compared exactly: no case folding and
//! no trailing-slash normalization.

use std::collections::HashSet;

use crate::models::Article;

/// Articles of `current` whose URL does not appear in `previous`, in
/// `current` order.
pub fn new_articles(previous: &[Article], current: &[Article]) -> Vec<Article> {
    let known: HashSet<&str> = previous.iter().map(|a| a.url.as_str()).collect();
    current
        .iter()
        .filter(|a| !known.contains(a.url.as_str()))
        .cloned()
        .collect()
}
