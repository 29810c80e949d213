// src/models/mod.rs

//! Domain models for the site monitor.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod article;
mod config;
mod keywords;
mod report;
mod target;

// Re-export all public types
pub use article::{Article, SiteArticle, SiteError};
pub use config::{Config, EmailConfig, StorageConfig, TaskConfig, TelegramConfig};
pub use keywords::KeywordFilter;
pub use report::RunReport;
pub use target::{SiteTarget, default_targets};
