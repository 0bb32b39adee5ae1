//! Markdown source checks.
//!
//! Three line-level heuristics, no real Markdown parsing:
//!
//! - an odd number of "```" sequences means a code block was left open;
//! - a line starting with `#` needs a space after the run of `#`;
//! - a line with a link to an `http` URL that also mentions `TODO` or
//!   `FIXME` is probably an unfinished link (warning only).
//!
//! The fence count is per file and counts the sequence anywhere, so a file
//! that mentions it as literal text can be reported falsely.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const FENCE: &str = "```";

/// Lint errors that prevent a check from running at all.
#[derive(Debug, Error)]
pub enum LintError {
    /// Source directory does not exist.
    #[error("source directory not found: {0}")]
    MissingDir(PathBuf),
}

/// Result type for lint operations.
pub type Result<T> = std::result::Result<T, LintError>;

/// What a diagnostic is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Odd number of code fences in the file.
    UnclosedCodeBlock,
    /// Heading marker not followed by a space.
    HeadingFormat,
    /// Link line mentioning TODO/FIXME.
    UnfinishedLink,
    /// File or directory could not be read.
    Unreadable,
}

/// A single finding, tied to a file and optionally a 1-based line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub line: Option<usize>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line} - {}", self.path.display(), self.message),
            None => write!(f, "{} - {}", self.path.display(), self.message),
        }
    }
}

/// Aggregated findings across all checked files.
#[derive(Debug, Default)]
pub struct LintReport {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub files_checked: usize,
}

impl LintReport {
    fn add_error(&mut self, diagnostic: Diagnostic) {
        self.errors.push(diagnostic);
    }

    fn add_warning(&mut self, diagnostic: Diagnostic) {
        self.warnings.push(diagnostic);
    }

    fn merge(&mut self, other: LintReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.files_checked += other.files_checked;
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Passes when there are no errors; warnings only count when `strict`.
    #[must_use]
    pub fn passes(&self, strict: bool) -> bool {
        !self.has_errors() && !(strict && self.has_warnings())
    }

    /// `true` iff there are no errors.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.passes(false)
    }
}

/// Checks `.md` files for common authoring mistakes.
#[derive(Debug, Default)]
pub struct MarkdownValidator;

impl MarkdownValidator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Check every `.md` file under `dir`, in path order.
    pub fn validate_dir(&self, dir: &Path) -> Result<LintReport> {
        if !dir.is_dir() {
            return Err(LintError::MissingDir(dir.to_path_buf()));
        }

        info!(dir = %dir.display(), "validating markdown");

        let mut report = LintReport::default();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
                    warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                    report.add_error(Diagnostic {
                        path,
                        line: None,
                        kind: DiagnosticKind::Unreadable,
                        message: format!("failed to read directory: {e}"),
                    });
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "md") {
                continue;
            }

            match std::fs::read_to_string(path) {
                Ok(content) => report.merge(self.validate_str(path, &content)),
                Err(e) => {
                    report.files_checked += 1;
                    report.add_error(Diagnostic {
                        path: path.to_path_buf(),
                        line: None,
                        kind: DiagnosticKind::Unreadable,
                        message: format!("failed to read file: {e}"),
                    });
                }
            }
        }

        info!(
            files = report.files_checked,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "markdown validation finished"
        );
        Ok(report)
    }

    /// Check one file's content; `path` is only used for reporting.
    #[must_use]
    pub fn validate_str(&self, path: &Path, content: &str) -> LintReport {
        let mut report = LintReport {
            files_checked: 1,
            ..LintReport::default()
        };

        let fences = content.matches(FENCE).count();
        if fences % 2 != 0 {
            debug!(path = %path.display(), fences, "odd fence count");
            report.add_error(Diagnostic {
                path: path.to_path_buf(),
                line: None,
                kind: DiagnosticKind::UnclosedCodeBlock,
                message: "unclosed code block".to_string(),
            });
        }

        for (index, line) in content.lines().enumerate() {
            let line_no = index + 1;

            if line.starts_with('#') && !is_valid_heading(line) {
                report.add_error(Diagnostic {
                    path: path.to_path_buf(),
                    line: Some(line_no),
                    kind: DiagnosticKind::HeadingFormat,
                    message: format!("invalid heading format: '{line}'"),
                });
            }

            if is_unfinished_link(line) {
                report.add_warning(Diagnostic {
                    path: path.to_path_buf(),
                    line: Some(line_no),
                    kind: DiagnosticKind::UnfinishedLink,
                    message: format!("possible unfinished link: '{line}'"),
                });
            }
        }

        report
    }
}

/// One or more `#` followed by a space.
fn is_valid_heading(line: &str) -> bool {
    line.trim_start_matches('#').starts_with(' ')
}

fn is_unfinished_link(line: &str) -> bool {
    line.contains("](") && line.contains("http") && (line.contains("TODO") || line.contains("FIXME"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn check(content: &str) -> LintReport {
        MarkdownValidator::new().validate_str(Path::new("docs/page.md"), content)
    }

    #[test]
    fn test_clean_file_passes() {
        let report = check("# Title\n\n## Section\n\n```rust\nfn main() {}\n```\n\nText.\n");

        assert!(report.is_ok());
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_odd_fences_report_one_error() {
        let report = check("# Title\n\n```bash\nls\n```\n\n```\nunterminated\n");

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, DiagnosticKind::UnclosedCodeBlock);
        assert_eq!(report.errors[0].line, None);
    }

    #[test]
    fn test_heading_without_space() {
        let report = check("# Fine\n\ntext\n#Heading\n");

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, DiagnosticKind::HeadingFormat);
        assert_eq!(report.errors[0].line, Some(4));
        assert!(report.errors[0].to_string().contains("docs/page.md:4"));
    }

    #[test]
    fn test_heading_variants() {
        assert!(is_valid_heading("### Deep"));
        assert!(is_valid_heading("# "));
        assert!(!is_valid_heading("#"));
        assert!(!is_valid_heading("##Deep"));
        assert!(!is_valid_heading("#\tTabbed"));
    }

    #[test]
    fn test_unfinished_link_is_warning_only() {
        let report = check("See [guide](https://example.com/guide) TODO: fix anchor\n");

        assert!(report.is_ok());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, DiagnosticKind::UnfinishedLink);
        assert_eq!(report.warnings[0].line, Some(1));
        assert!(!report.passes(true));
    }

    #[test]
    fn test_link_without_marker_is_fine() {
        let report = check("See [guide](https://example.com/guide).\nTODO: write more\n");
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_validate_dir_aggregates() {
        let docs = TempDir::new().unwrap();
        fs::write(docs.path().join("index.md"), "# Home\n").unwrap();
        fs::create_dir_all(docs.path().join("guide")).unwrap();
        fs::write(docs.path().join("guide/setup.md"), "#Setup\n```\n").unwrap();
        fs::write(
            docs.path().join("guide/links.md"),
            "[x](http://a.b) FIXME\n",
        )
        .unwrap();
        fs::write(docs.path().join("notes.txt"), "#not markdown\n").unwrap();

        let report = MarkdownValidator::new().validate_dir(docs.path()).unwrap();

        assert_eq!(report.files_checked, 3);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.warnings.len(), 1);
        assert!(!report.is_ok());
    }

    #[test]
    fn test_non_utf8_file_is_an_error() {
        let docs = TempDir::new().unwrap();
        fs::write(docs.path().join("bad.md"), b"\xff\xfe\x00").unwrap();

        let report = MarkdownValidator::new().validate_dir(docs.path()).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, DiagnosticKind::Unreadable);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_reported_and_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let docs = TempDir::new().unwrap();
        fs::write(docs.path().join("index.md"), "#Home\n").unwrap();
        let locked = docs.path().join("private");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("notes.md"), "# Notes\n").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let result = MarkdownValidator::new().validate_dir(docs.path());
        let readable = fs::read_dir(&locked).is_ok();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let report = result.unwrap();
        assert!(
            report
                .errors
                .iter()
                .any(|d| d.kind == DiagnosticKind::HeadingFormat)
        );
        if !readable {
            assert_eq!(report.files_checked, 1);
            assert_eq!(report.errors.len(), 2);
            assert!(
                report
                    .errors
                    .iter()
                    .any(|d| d.kind == DiagnosticKind::Unreadable && d.path == locked)
            );
        }
    }

    #[test]
    fn test_missing_dir() {
        let err = MarkdownValidator::new()
            .validate_dir(Path::new("/nonexistent/docs"))
            .unwrap_err();
        assert!(matches!(err, LintError::MissingDir(_)));
    }
}
