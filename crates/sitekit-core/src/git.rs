//! Version-control metadata.
//!
//! Lookups never fail: anything that goes wrong (no repository, git not
//! installed, non-zero exit, timeout) yields [`UNKNOWN`].

use std::path::Path;

use tracing::debug;

use crate::process::{RunOptions, run_with_timeout};

/// Placeholder for metadata that could not be determined.
pub const UNKNOWN: &str = "unknown";

/// Git metadata reader rooted at a working directory.
///
/// Each query is bounded by [`crate::process::DEFAULT_TIMEOUT`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GitInfo<'a> {
    repo: Option<&'a Path>,
}

impl<'a> GitInfo<'a> {
    /// Reader for the repository containing the current directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reader for the repository containing `repo`.
    #[must_use]
    pub fn at(repo: &'a Path) -> Self {
        Self { repo: Some(repo) }
    }

    /// Short hash of `HEAD`.
    #[must_use]
    pub fn commit(&self) -> String {
        self.rev_parse(&["--short", "HEAD"])
    }

    /// Current branch name (`HEAD` when detached).
    #[must_use]
    pub fn branch(&self) -> String {
        self.rev_parse(&["--abbrev-ref", "HEAD"])
    }

    fn rev_parse(&self, args: &[&str]) -> String {
        let options = RunOptions {
            cwd: self.repo,
            ..RunOptions::default()
        };

        let mut full = vec!["rev-parse"];
        full.extend_from_slice(args);

        match run_with_timeout("git", &full, options) {
            Ok(output) if output.success() => {
                let value = output.stdout_trimmed();
                if value.is_empty() {
                    UNKNOWN.to_string()
                } else {
                    value
                }
            }
            Ok(output) => {
                debug!(code = ?output.status.code(), "git rev-parse failed");
                UNKNOWN.to_string()
            }
            Err(e) => {
                debug!(error = %e, "git unavailable");
                UNKNOWN.to_string()
            }
        }
    }
}
