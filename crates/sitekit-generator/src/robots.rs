//! Robots.txt generation.
//!
//! Generates the robots.txt file for search engine crawlers.

use std::path::Path;

use sitekit_core::fs::write_atomic;
use thiserror::Error;
use tracing::info;

use crate::sitemap::{DEFAULT_BASE_URL, SITEMAP_FILE};

/// Robots output path relative to the output root.
pub const ROBOTS_FILE: &str = "robots.txt";

/// Robots generation errors.
#[derive(Debug, Error)]
pub enum RobotsError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for robots generation.
pub type Result<T> = std::result::Result<T, RobotsError>;

/// Robots.txt generator.
#[derive(Debug)]
pub struct RobotsGenerator {
    base_url: String,
}

impl Default for RobotsGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl RobotsGenerator {
    /// Create a generator whose sitemap directive points under `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Robots.txt content allowing every crawler.
    #[must_use]
    pub fn render(&self) -> String {
        let sitemap_url = format!("{}/{SITEMAP_FILE}", self.base_url.trim_end_matches('/'));
        format!("User-agent: *\nAllow: /\n\nSitemap: {sitemap_url}\n")
    }

    /// Generate robots.txt.
    pub fn generate(&self, output_dir: &Path) -> Result<()> {
        info!("generating robots.txt");
        write_atomic(&output_dir.join(ROBOTS_FILE), self.render())?;
        Ok(())
    }
}
