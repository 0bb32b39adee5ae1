//! Output tree validation.
//!
//! Existence checks only; file contents are not inspected.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::{build_info::BUILD_INFO_JS, robots::ROBOTS_FILE, sitemap::SITEMAP_FILE};

/// Paths that must exist in a finished build, relative to the output root.
pub const REQUIRED_FILES: [&str; 4] = ["index.html", BUILD_INFO_JS, SITEMAP_FILE, ROBOTS_FILE];

/// Result of validating an output tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Required files that were not found, as full paths.
    pub missing: Vec<PathBuf>,
}

impl ValidationReport {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Checks that a build produced every required file.
#[derive(Debug, Default)]
pub struct BuildValidator;

impl BuildValidator {
    /// Check every required path and collect the missing ones.
    #[must_use]
    pub fn check(output_dir: &Path) -> ValidationReport {
        let missing: Vec<PathBuf> = REQUIRED_FILES
            .iter()
            .map(|rel| output_dir.join(rel))
            .filter(|path| !path.exists())
            .collect();

        for path in &missing {
            error!(path = %path.display(), "missing required file");
        }
        if missing.is_empty() {
            info!(dir = %output_dir.display(), "build validated");
        }

        ValidationReport { missing }
    }

    /// `true` only if every required file exists.
    #[must_use]
    pub fn validate(output_dir: &Path) -> bool {
        Self::check(output_dir).is_ok()
    }
}
