// src/models/target.rs

//! Monitored site definitions.

use serde::{Deserialize, Serialize};

/// One externally monitored content source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteTarget {
    /// Stable identifier; selects the extraction rule and the snapshot entry
    pub key: String,

    /// Human-readable site name used in reports
    pub name: String,

    /// Listing page to fetch
    pub url: String,

    /// Page only lists articles after script execution
    #[serde(default)]
    pub requires_rendering: bool,
}

impl SiteTarget {
    pub fn new(key: &str, name: &str, url: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            requires_rendering: false,
        }
    }

    /// Mark the target as needing a rendered page.
    pub fn rendered(mut self) -> Self {
        self.requires_rendering = true;
        self
    }
}

/// Built-in roster of competitor blogs.
pub fn default_targets() -> Vec<SiteTarget> {
    vec![
        SiteTarget::new("3erp", "3ERP", "https://www.3erp.com/blog/"),
        SiteTarget::new(
            "rapiddirect",
            "RapidDirect",
            "https://www.rapiddirect.com/blog/",
        ),
        SiteTarget::new("fictiv", "Fictiv", "https://fictiv.com/articles"),
        SiteTarget::new(
            "protolabs",
            "Protolabs",
            "https://www.protolabs.com/resources/blog/",
        ),
        SiteTarget::new("wayken", "Wayken", "https://waykenrm.com/blogs/"),
        SiteTarget::new(
            "jlccnc",
            "JLCCNC",
            "https://jlccnc.com/blog/category/knowledge-hub",
        )
        .rendered(),
        SiteTarget::new("partmfg", "Partmfg", "https://www.partmfg.com/blog/"),
        SiteTarget::new(
            "china-machining",
            "China-Machining",
            "https://www.china-machining.com/blog/",
        ),
        SiteTarget::new(
            "hlc-metalparts",
            "HLC-Metalparts",
            "https://www.hlc-metalparts.com/newslist-757014-1",
        ),
        SiteTarget::new("zintilon", "Zintilon", "https://www.zintilon.com/blog/"),
        SiteTarget::new("cnclathing", "CNC Lathing", "https://www.cnclathing.com/guide"),
    ]
}
