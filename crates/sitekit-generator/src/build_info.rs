//! Build metadata.
//!
//! Writes a snapshot of the current build (time, site identity, interpreter
//! and VCS state) as `build-info.json` and as a script file that defines a
//! global `BUILD_INFO` constant for the site's client-side code.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sitekit_core::{
    Config, GitInfo,
    fs::{write_atomic, write_atomic_create_dirs},
    git::UNKNOWN,
    process::{CommandOutput, RunOptions, run_with_timeout},
};
use thiserror::Error;
use tracing::info;

/// JSON output path relative to the output root.
pub const BUILD_INFO_JSON: &str = "build-info.json";

/// Script output path relative to the output root.
pub const BUILD_INFO_JS: &str = "assets/javascripts/build-info.js";

/// Build-info errors.
#[derive(Debug, Error)]
pub enum BuildInfoError {
    /// IO error.
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding error.
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for build-info operations.
pub type Result<T> = std::result::Result<T, BuildInfoError>;

/// Metadata describing one build invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// ISO-8601 UTC timestamp.
    pub build_date: String,

    /// Unix epoch seconds.
    pub build_timestamp: i64,

    pub site_name: String,

    pub site_url: String,

    /// Version string of the Python interpreter that runs the site generator.
    pub python_version: String,

    pub git_commit: String,

    pub git_branch: String,
}

impl BuildInfo {
    /// Collect build metadata for `config` from the current environment.
    #[must_use]
    pub fn collect(config: &Config, git: &GitInfo<'_>) -> Self {
        // The two clock reads are independent and may straddle a second boundary.
        let build_date = Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
        let build_timestamp = Utc::now().timestamp();

        Self {
            build_date,
            build_timestamp,
            site_name: config.site_name().to_string(),
            site_url: config.site_url().to_string(),
            python_version: python_version(),
            git_commit: git.commit(),
            git_branch: git.branch(),
        }
    }

    /// Pretty-printed JSON document.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Script assigning the record to a global `BUILD_INFO` constant.
    pub fn to_script(&self) -> Result<String> {
        let literal = serde_json::to_string(self)?;
        Ok(format!("const BUILD_INFO = {literal};"))
    }
}

/// Emits the build-info files into an output directory.
#[derive(Debug, Default)]
pub struct BuildInfoEmitter<'a> {
    git: GitInfo<'a>,
}

impl<'a> BuildInfoEmitter<'a> {
    /// Create an emitter reading VCS metadata from the current directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git reader.
    #[must_use]
    pub fn with_git(mut self, git: GitInfo<'a>) -> Self {
        self.git = git;
        self
    }

    /// Collect the record and write both output files.
    pub fn emit(&self, config: &Config, output_dir: &Path) -> Result<BuildInfo> {
        let info = BuildInfo::collect(config, &self.git);
        self.write(&info, output_dir)?;
        Ok(info)
    }

    /// Write an existing record to both output files.
    pub fn write(&self, info: &BuildInfo, output_dir: &Path) -> Result<()> {
        let json_path = output_dir.join(BUILD_INFO_JSON);
        write_atomic(&json_path, info.to_json_pretty()?).map_err(|source| BuildInfoError::Io {
            path: json_path.clone(),
            source,
        })?;

        let js_path = output_dir.join(BUILD_INFO_JS);
        write_atomic_create_dirs(&js_path, info.to_script()?).map_err(|source| {
            BuildInfoError::Io {
                path: js_path.clone(),
                source,
            }
        })?;

        info!(
            commit = %info.git_commit,
            branch = %info.git_branch,
            "wrote build info"
        );
        Ok(())
    }
}

/// `python --version`, falling back to `python3`, or [`UNKNOWN`].
fn python_version() -> String {
    let options = RunOptions {
        capture_stderr: true,
        ..RunOptions::default()
    };

    for program in ["python", "python3"] {
        if let Some(version) = run_with_timeout(program, ["--version"], options)
            .ok()
            .and_then(|output| reported_version(&output))
        {
            return version;
        }
    }
    UNKNOWN.to_string()
}

/// Version line from a successful `--version` run.
///
/// Python 2 prints it to stderr, Python 3 to stdout.
fn reported_version(output: &CommandOutput) -> Option<String> {
    if !output.success() {
        return None;
    }
    [output.stdout_trimmed(), output.stderr_trimmed()]
        .into_iter()
        .find(|version| !version.is_empty())
}
