//! Rules that start from headings and look for the link that belongs to them.

use scraper::{ElementRef, Html};

use super::{ArticleList, element_text, href_of, parse_selector};
use crate::error::Result;
use crate::utils::char_len;

const MIN_TITLE_LEN: usize = 5;

/// Pair each of the first `limit` headings with the next `<a>` in document
/// order. The link must contain `path` and must not point to a category.
pub(crate) fn extract_next_link(
    document: &Html,
    heading: &str,
    path: &str,
    out: &mut ArticleList,
) -> Result<()> {
    let heading_sel = parse_selector(heading)?;

    for h in document.select(&heading_sel).take(out.limit()) {
        let title = element_text(h);
        if char_len(&title) <= MIN_TITLE_LEN {
            continue;
        }
        let Some(link) = next_link_after(document, h) else {
            continue;
        };
        let href = href_of(link);
        if href.contains(path) && !href.contains("category") {
            out.push(title, href);
        }
    }
    Ok(())
}

/// Pair each of the first `limit` headings with the `<a>` wrapping it.
pub(crate) fn extract_enclosing_link(
    document: &Html,
    heading: &str,
    out: &mut ArticleList,
) -> Result<()> {
    let heading_sel = parse_selector(heading)?;

    for h in document.select(&heading_sel).take(out.limit()) {
        let title = element_text(h);
        if char_len(&title) <= MIN_TITLE_LEN {
            continue;
        }
        if let Some(link) = enclosing_link(h) {
            out.push(title, href_of(link));
        }
    }
    Ok(())
}

/// First `<a>` that starts after `element` opens, including its own children.
fn next_link_after<'a>(document: &'a Html, element: ElementRef<'a>) -> Option<ElementRef<'a>> {
    let start = element.id();
    document
        .root_element()
        .descendants()
        .skip_while(|node| node.id() != start)
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "a")
}

/// Closest `<a>` ancestor.
fn enclosing_link(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "a")
}
