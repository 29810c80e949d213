//! Rules that scan every link on the page and keep the ones that look like
//! articles, judged by their href and text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use super::{ArticleList, element_text, href_of, parse_selector};
use crate::error::Result;
use crate::utils::{char_len, normalize_whitespace, truncate_chars};

/// Extracted titles are cut to this many characters.
const MAX_TITLE_LEN: usize = 100;

/// `Feb 10, 2026` style dates glued to news titles.
static LISTING_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d+,\s+\d{4}")
        .expect("listing date pattern is valid")
});

/// Links whose own text is the article title.
pub(crate) struct LinkScan {
    /// href must contain this
    pub path: &'static str,
    /// Titles must be longer than this many characters
    pub min_title_len: usize,
}

impl LinkScan {
    pub const JLCCNC: LinkScan = LinkScan {
        path: "/blog/",
        min_title_len: 15,
    };
}

/// Article links whose title sits in a heading of the surrounding block.
pub(crate) fn extract_with_heading(document: &Html, path: &str, out: &mut ArticleList) -> Result<()> {
    let link_sel = parse_selector("a[href]")?;
    let heading_sel = parse_selector("h2, h3, h4")?;
    let mut seen = HashSet::new();

    for link in document.select(&link_sel) {
        if out.is_full() {
            break;
        }
        let href = href_of(link);
        if !href.contains(path) || href.contains("category") || !seen.insert(href) {
            continue;
        }

        let Some(block) = enclosing_block(link) else {
            continue;
        };
        if let Some(heading) = block.select(&heading_sel).next() {
            let title = element_text(heading);
            if char_len(&title) > 10 {
                out.push(truncate_chars(&title, MAX_TITLE_LEN), href);
            }
        }
    }
    Ok(())
}

/// Links to `scan.path` whose text is long enough to be a title.
pub(crate) fn extract_link_text(document: &Html, scan: &LinkScan, out: &mut ArticleList) -> Result<()> {
    let link_sel = parse_selector("a[href]")?;
    let mut seen = HashSet::new();

    for link in document.select(&link_sel) {
        if out.is_full() {
            break;
        }
        let href = href_of(link);
        if !href.contains(scan.path) || href.contains("category") || !seen.insert(href) {
            continue;
        }

        let text = element_text(link);
        if char_len(&text) > scan.min_title_len {
            out.push(truncate_chars(&text, MAX_TITLE_LEN), href);
        }
    }
    Ok(())
}

/// News links. Image-only or "more" links borrow the text of their
/// grandparent block. A listing date is moved from the title to the article.
pub(crate) fn extract_news_links(document: &Html, out: &mut ArticleList) -> Result<()> {
    let link_sel = parse_selector("a[href]")?;
    let mut seen = HashSet::new();

    for link in document.select(&link_sel) {
        if out.is_full() {
            break;
        }
        let href = href_of(link);
        if !href.contains("/news/") || !seen.insert(href) {
            continue;
        }

        let mut text = element_text(link);
        if char_len(&text) < 5 {
            if let Some(grandparent) = grandparent(link) {
                text = element_text(grandparent);
            }
        }
        let date = LISTING_DATE.find(&text).map(|m| m.as_str().to_string());
        let text = normalize_whitespace(&LISTING_DATE.replace_all(&text, ""));

        if char_len(&text) > 15 {
            out.push_dated(truncate_chars(&text, MAX_TITLE_LEN), href, date);
        }
    }
    Ok(())
}

/// Navigation and contact links that share the guide pages' markup.
const EXCLUDED_HREF_PARTS: &[&str] = &[
    "quote", "about", "products", "contact", "home", "email", "cdn-cgi", "tel:", "blog", "news",
];
const EXCLUDED_TEXT_PARTS: &[&str] = &["email", "quote", "phone", "contact"];

/// Any long-titled link that is not navigation, contact or another section.
pub(crate) fn extract_guide_links(document: &Html, out: &mut ArticleList) -> Result<()> {
    let link_sel = parse_selector("a[href]")?;
    let mut seen = HashSet::new();

    for link in document.select(&link_sel) {
        if out.is_full() {
            break;
        }
        let href = href_of(link);
        if href.is_empty() || seen.contains(href) {
            continue;
        }

        let text = element_text(link);
        if char_len(&text) <= 15 {
            continue;
        }
        let href_lower = href.to_lowercase();
        let text_lower = text.to_lowercase();
        if EXCLUDED_HREF_PARTS.iter().any(|p| href_lower.contains(p))
            || EXCLUDED_TEXT_PARTS.iter().any(|p| text_lower.contains(p))
        {
            continue;
        }
        if !href.contains('/') || href.starts_with("//") {
            continue;
        }

        seen.insert(href);
        out.push(truncate_chars(&text, MAX_TITLE_LEN), href);
    }
    Ok(())
}

/// Closest `div`, `section` or `article` ancestor.
fn enclosing_block(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| matches!(el.value().name(), "div" | "section" | "article"))
}

fn grandparent(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .parent()
        .and_then(|p| p.parent())
        .and_then(ElementRef::wrap)
}
