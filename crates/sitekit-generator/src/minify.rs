//! HTML minification.
//!
//! Rewrites every `.html` file in the output tree in place. The settings are
//! conservative: closing tags, the `<html>` and `<head>` opening tags and the
//! doctype are kept, attribute values stay standards-compliant and inline CSS
//! is minified. Comments are dropped.

use std::{
    fs,
    path::{Path, PathBuf},
};

use minify_html::Cfg;
use sitekit_core::fs::write_atomic;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Minification errors.
#[derive(Debug, Error)]
pub enum MinifyError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Result type for minification.
pub type Result<T> = std::result::Result<T, MinifyError>;

/// A page that could not be minified.
#[derive(Debug)]
pub struct MinifyFailure {
    pub path: PathBuf,
    pub error: MinifyError,
}

/// Outcome of one minification pass.
#[derive(Debug, Default)]
pub struct MinifyReport {
    /// Pages processed.
    pub minified: usize,

    pub bytes_before: u64,

    pub bytes_after: u64,

    pub failures: Vec<MinifyFailure>,
}

impl MinifyReport {
    #[must_use]
    pub fn bytes_saved(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}

/// Minifies the HTML pages of a built site.
#[derive(Debug, Default)]
pub struct HtmlMinifier;

impl HtmlMinifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Minify one document.
    #[must_use]
    pub fn minify(&self, html: &[u8]) -> Vec<u8> {
        minify_html::minify(html, &conservative_cfg())
    }

    /// Minify every `.html` file under `output_dir`, in path order.
    ///
    /// Unreadable directories and pages that cannot be rewritten are
    /// recorded in the report; the rest of the tree is still processed.
    pub fn minify_dir(&self, output_dir: &Path) -> MinifyReport {
        info!(dir = %output_dir.display(), "minifying html");

        let cfg = conservative_cfg();
        let mut report = MinifyReport::default();

        for entry in WalkDir::new(output_dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| output_dir.to_path_buf(), Path::to_path_buf);
                    warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                    report.failures.push(MinifyFailure {
                        path,
                        error: e.into(),
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file()
                || entry.path().extension().is_none_or(|ext| ext != "html")
            {
                continue;
            }

            let path = entry.into_path();
            match minify_file(&path, &cfg) {
                Ok((before, after)) => {
                    report.minified += 1;
                    report.bytes_before += before as u64;
                    report.bytes_after += after as u64;
                }
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "failed to minify page");
                    report.failures.push(MinifyFailure { path, error });
                }
            }
        }

        info!(
            pages = report.minified,
            saved = report.bytes_saved(),
            failed = report.failures.len(),
            "html minification finished"
        );
        report
    }
}

fn conservative_cfg() -> Cfg {
    Cfg {
        do_not_minify_doctype: true,
        ensure_spec_compliant_unquoted_attribute_values: true,
        keep_closing_tags: true,
        keep_html_and_head_opening_tags: true,
        keep_spaces_between_attributes: true,
        minify_css: true,
        ..Cfg::new()
    }
}

/// Rewrite one page; returns sizes before and after.
fn minify_file(path: &Path, cfg: &Cfg) -> Result<(usize, usize)> {
    let html = fs::read(path)?;
    let minified = minify_html::minify(&html, cfg);

    if minified != html {
        write_atomic(path, &minified)?;
    }

    debug!(path = %path.display(), before = html.len(), after = minified.len(), "minified page");
    Ok((html.len(), minified.len()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const PAGE: &str = "<!DOCTYPE html>
<html lang=\"ru\">
  <head>
    <title>Docs</title>
  </head>
  <body>
    <!-- navigation -->
    <p>Hello    world</p>
  </body>
</html>
";

    #[test]
    fn test_strips_comments_and_whitespace() {
        let out = String::from_utf8(HtmlMinifier::new().minify(PAGE.as_bytes())).unwrap();

        assert!(out.len() < PAGE.len());
        assert!(!out.contains("navigation"));
        assert!(out.contains("<p>Hello world</p>"));
    }

    #[test]
    fn test_keeps_doctype_and_optional_tags() {
        let out = String::from_utf8(HtmlMinifier::new().minify(PAGE.as_bytes())).unwrap();

        assert!(out.to_ascii_lowercase().starts_with("<!doctype html>"));
        assert!(out.contains("<head>"));
        assert!(out.contains("</body>"));
        assert!(out.contains("</html>"));
    }

    #[test]
    fn test_minify_dir_rewrites_pages_only() {
        let site = TempDir::new().unwrap();
        fs::create_dir_all(site.path().join("guide")).unwrap();
        fs::write(site.path().join("index.html"), PAGE).unwrap();
        fs::write(site.path().join("guide/index.html"), PAGE).unwrap();
        fs::write(site.path().join("notes.txt"), "<!-- keep -->\n").unwrap();

        let report = HtmlMinifier::new().minify_dir(site.path());

        assert_eq!(report.minified, 2);
        assert!(report.failures.is_empty());
        assert!(report.bytes_saved() > 0);
        let index = fs::read_to_string(site.path().join("guide/index.html")).unwrap();
        assert!(!index.contains("navigation"));
        assert_eq!(
            fs::read_to_string(site.path().join("notes.txt")).unwrap(),
            "<!-- keep -->\n"
        );
    }

    #[test]
    fn test_second_pass_is_stable() {
        let site = TempDir::new().unwrap();
        let index = site.path().join("index.html");
        fs::write(&index, PAGE).unwrap();

        HtmlMinifier::new().minify_dir(site.path());
        let first = fs::read(&index).unwrap();
        let report = HtmlMinifier::new().minify_dir(site.path());

        assert_eq!(fs::read(&index).unwrap(), first);
        assert_eq!(report.bytes_saved(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_does_not_stop_walk() {
        use std::os::unix::fs::PermissionsExt;

        let site = TempDir::new().unwrap();
        fs::write(site.path().join("index.html"), PAGE).unwrap();
        let locked = site.path().join("private");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("page.html"), PAGE).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let report = HtmlMinifier::new().minify_dir(site.path());
        let readable = fs::read_dir(&locked).is_ok();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let index = fs::read_to_string(site.path().join("index.html")).unwrap();
        assert!(!index.contains("navigation"));
        if !readable {
            assert_eq!(report.minified, 1);
            assert_eq!(report.failures.len(), 1);
            assert!(matches!(report.failures[0].error, MinifyError::Walk(_)));
        }
    }
}
