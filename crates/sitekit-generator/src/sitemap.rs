//! Sitemap generation.
//!
//! Builds `sitemap.xml` from the HTML files present in the output tree.

use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};

use chrono::{NaiveDate, Utc};
use sitekit_core::fs::write_atomic;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Base URL used when the site configuration has no `site_url`.
pub const DEFAULT_BASE_URL: &str = "https://aasemikov.github.io/my-static-site/";

/// Sitemap output path relative to the output root.
pub const SITEMAP_FILE: &str = "sitemap.xml";

/// Error page excluded from the sitemap.
const ERROR_PAGE: &str = "404.html";

const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Change frequency written for every entry.
pub const CHANGE_FREQ: &str = "weekly";

/// Priority written for every entry.
pub const PRIORITY: f32 = 0.8;

/// Sitemap generation errors.
#[derive(Debug, Error)]
pub enum SitemapError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Path outside the output root.
    #[error("invalid page path: {0}")]
    InvalidPath(PathBuf),
}

/// Result type for sitemap operations.
pub type Result<T> = std::result::Result<T, SitemapError>;

/// A sitemap URL entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapUrl {
    /// Absolute page URL.
    pub loc: String,

    pub lastmod: NaiveDate,

    pub changefreq: &'static str,

    /// Priority (0.0 to 1.0).
    pub priority: f32,
}

/// A rendered sitemap.
#[derive(Debug, Default)]
pub struct Sitemap {
    pub urls: Vec<SitemapUrl>,

    /// Parts of the tree that could not be read and are missing from `urls`.
    pub errors: Vec<SitemapError>,
}

impl Sitemap {
    /// Render as sitemap XML.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        let _ = writeln!(xml, r#"<urlset xmlns="{SITEMAP_NAMESPACE}">"#);

        for url in &self.urls {
            xml.push_str("  <url>\n");
            let _ = writeln!(xml, "    <loc>{}</loc>", escape_xml(&url.loc));
            let _ = writeln!(xml, "    <lastmod>{}</lastmod>", url.lastmod.format("%Y-%m-%d"));
            let _ = writeln!(xml, "    <changefreq>{}</changefreq>", url.changefreq);
            let _ = writeln!(xml, "    <priority>{:.1}</priority>", url.priority);
            xml.push_str("  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }
}

/// Sitemap generator.
#[derive(Debug)]
pub struct SitemapGenerator {
    base_url: String,
}

impl Default for SitemapGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl SitemapGenerator {
    /// Create a generator producing URLs under `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
        }
    }

    /// Collect entries for every page under `output_dir`, sorted by path.
    ///
    /// Unreadable directories are skipped and listed in [`Sitemap::errors`].
    pub fn generate(&self, output_dir: &Path) -> Result<Sitemap> {
        let lastmod = Utc::now().date_naive();
        let mut sitemap = Sitemap::default();

        for relative in find_pages(output_dir, &mut sitemap.errors)? {
            sitemap.urls.push(SitemapUrl {
                loc: format!("{}{}", self.base_url, url_path(&relative)),
                lastmod,
                changefreq: CHANGE_FREQ,
                priority: PRIORITY,
            });
        }

        debug!(count = sitemap.urls.len(), "collected sitemap entries");
        Ok(sitemap)
    }

    /// Generate and write `sitemap.xml` into `output_dir`.
    pub fn emit(&self, output_dir: &Path) -> Result<Sitemap> {
        let sitemap = self.generate(output_dir)?;
        let path = output_dir.join(SITEMAP_FILE);
        write_atomic(&path, sitemap.to_xml())?;

        info!(path = %path.display(), entries = sitemap.urls.len(), "generated sitemap");
        Ok(sitemap)
    }
}

/// `.html` files under `output_dir` except `404.html`, relative and sorted.
fn find_pages(output_dir: &Path, errors: &mut Vec<SitemapError>) -> Result<Vec<PathBuf>> {
    let mut pages = Vec::new();

    for entry in WalkDir::new(output_dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                errors.push(e.into());
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().is_none_or(|ext| ext != "html")
            || entry.file_name() == ERROR_PAGE
        {
            continue;
        }

        let relative = path
            .strip_prefix(output_dir)
            .map_err(|_| SitemapError::InvalidPath(path.to_path_buf()))?;
        pages.push(relative.to_path_buf());
    }

    pages.sort_by_key(|p| url_path(p));
    Ok(pages)
}

fn normalize_base_url(base: &str) -> String {
    format!("{}/", base.trim_end_matches('/'))
}

fn url_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
