//! Rules that read one article per repeated container element.

use scraper::Html;

use super::{ArticleList, element_text, href_of, parse_selector};
use crate::error::Result;
use crate::utils::char_len;

/// Card layout where title and link live in separate child elements.
pub(crate) struct CardSpec {
    pub container: &'static str,
    /// Tried in order; the first selector that matches provides the title
    pub titles: &'static [&'static str],
    pub link: &'static str,
    /// Titles must be longer than this many characters
    pub min_title_len: usize,
}

impl CardSpec {
    pub const THREE_ERP: CardSpec = CardSpec {
        container: "article.bde-loop-item",
        titles: &[
            "h2.bde-heading",
            "div.bde-text-20841-103",
            "div[class*='bde-text-']",
        ],
        link: "a.bde-container-link",
        min_title_len: 5,
    };
}

/// Classic blog listing where one anchor carries both title and link.
pub(crate) struct ListingSpec {
    pub container: &'static str,
    pub title: &'static str,
    pub link: &'static str,
}

impl ListingSpec {
    pub const WAYKEN: ListingSpec = ListingSpec {
        container: "div.blog-item, article, div.post",
        title: "h2 a, h3 a, a.article-title",
        link: "h2 a, h3 a, a.article-title",
    };

    pub const PARTMFG: ListingSpec = ListingSpec {
        container: "div.blog-post, article, div.post",
        title: "h2 a, h3 a, a.post-title",
        link: "h2 a, h3 a, a.post-title",
    };

    pub const CHINA_MACHINING: ListingSpec = ListingSpec {
        container: "div.blog-item, article, div.news-item",
        title: "h2 a, h3 a, a.title",
        link: "h2 a, h3 a, a.title",
    };
}

/// Only the first `limit` cards are inspected.
pub(crate) fn extract_cards(document: &Html, spec: &CardSpec, out: &mut ArticleList) -> Result<()> {
    let container_sel = parse_selector(spec.container)?;
    let title_sels = spec
        .titles
        .iter()
        .map(|s| parse_selector(s))
        .collect::<Result<Vec<_>>>()?;
    let link_sel = parse_selector(spec.link)?;

    for card in document.select(&container_sel).take(out.limit()) {
        let title_elem = title_sels.iter().find_map(|sel| card.select(sel).next());
        let link_elem = card.select(&link_sel).next();

        if let (Some(title_elem), Some(link_elem)) = (title_elem, link_elem) {
            let title = element_text(title_elem);
            if char_len(&title) > spec.min_title_len {
                out.push(title, href_of(link_elem));
            }
        }
    }
    Ok(())
}

/// Only the first `limit` containers are inspected.
pub(crate) fn extract_listing(
    document: &Html,
    spec: &ListingSpec,
    out: &mut ArticleList,
) -> Result<()> {
    let container_sel = parse_selector(spec.container)?;
    let title_sel = parse_selector(spec.title)?;
    let link_sel = parse_selector(spec.link)?;

    for container in document.select(&container_sel).take(out.limit()) {
        let title_elem = container.select(&title_sel).next();
        let link_elem = container.select(&link_sel).next();

        if let (Some(title_elem), Some(link_elem)) = (title_elem, link_elem) {
            out.push(element_text(title_elem), href_of(link_elem));
        }
    }
    Ok(())
}
