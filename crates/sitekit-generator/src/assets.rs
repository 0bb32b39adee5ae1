//! Asset fingerprinting.
//!
//! Writes a content-hashed copy of every stylesheet and script under
//! `<output>/assets` for cache busting. Originals are left in place and HTML
//! references are not rewritten; the mapping is recorded in an
//! [`AssetManifest`].

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use sha2::{Digest, Sha256};
use sitekit_core::fs::write_atomic;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Manifest output path relative to the output root.
pub const ASSET_MANIFEST: &str = "asset-manifest.json";

/// Length of the hex digest embedded in hashed file names.
pub const DIGEST_LEN: usize = 8;

/// File extensions to fingerprint, without the dot.
const ASSET_EXTENSIONS: [&str; 2] = ["css", "js"];

/// Asset processing errors.
#[derive(Debug, Error)]
pub enum AssetError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Invalid asset path.
    #[error("invalid asset path: {0}")]
    InvalidPath(PathBuf),

    /// JSON encoding error.
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for asset operations.
pub type Result<T> = std::result::Result<T, AssetError>;

/// Mapping from original asset path to its hashed copy.
///
/// Paths are relative to the output root, `/`-prefixed and `/`-separated.
#[derive(Debug, Clone, Default)]
pub struct AssetManifest {
    assets: BTreeMap<String, String>,
}

impl AssetManifest {
    /// Create a new empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset to the manifest.
    pub fn add(&mut self, original: impl Into<String>, hashed: impl Into<String>) {
        self.assets.insert(original.into(), hashed.into());
    }

    /// Get the hashed path for an asset.
    #[must_use]
    pub fn get(&self, original: &str) -> Option<&str> {
        self.assets.get(original).map(String::as_str)
    }

    /// All entries, sorted by original path.
    #[must_use]
    pub fn assets(&self) -> &BTreeMap<String, String> {
        &self.assets
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Serialize manifest to pretty JSON with sorted keys.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.assets)?)
    }
}

/// A file that could not be hashed.
#[derive(Debug)]
pub struct AssetFailure {
    pub path: PathBuf,
    pub error: AssetError,
}

/// Outcome of one hashing pass.
#[derive(Debug, Default)]
pub struct AssetReport {
    pub manifest: AssetManifest,

    /// Hashed copies from earlier runs that were left alone.
    pub skipped: usize,

    pub failures: Vec<AssetFailure>,
}

impl AssetReport {
    /// Number of hashed copies written.
    #[must_use]
    pub fn hashed(&self) -> usize {
        self.manifest.len()
    }
}

/// Writes content-hashed copies of CSS and JS assets.
#[derive(Debug, Default)]
pub struct AssetHasher;

impl AssetHasher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Hash every eligible file under `<output_dir>/assets`.
    ///
    /// Missing `assets` directory is a no-op. A file or directory that fails
    /// is recorded in the report and the pass continues with the next one.
    ///
    /// A file whose stem ends in `.<digest of its own content>` is a copy
    /// written by an earlier run and is skipped.
    pub fn optimize(&self, output_dir: &Path) -> Result<AssetReport> {
        let assets_dir = output_dir.join("assets");
        let mut report = AssetReport::default();

        if !assets_dir.is_dir() {
            debug!(dir = %assets_dir.display(), "assets directory does not exist, skipping");
            return Ok(report);
        }

        info!(dir = %assets_dir.display(), "hashing assets");

        // Snapshot the file list before any copy lands in the tree.
        let files = collect(&assets_dir, &mut report);

        for path in files {
            match hash_file(output_dir, &path) {
                Ok(Some((original, hashed))) => report.manifest.add(original, hashed),
                Ok(None) => {
                    debug!(path = %path.display(), "already hashed, skipping");
                    report.skipped += 1;
                }
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "failed to hash asset");
                    report.failures.push(AssetFailure { path, error });
                }
            }
        }

        info!(
            hashed = report.hashed(),
            skipped = report.skipped,
            failed = report.failures.len(),
            "assets hashed"
        );
        Ok(report)
    }

    /// Write the manifest for `report` into the output root.
    pub fn write_manifest(&self, report: &AssetReport, output_dir: &Path) -> Result<()> {
        let path = output_dir.join(ASSET_MANIFEST);
        write_atomic(&path, report.manifest.to_json()?)?;
        debug!(path = %path.display(), "wrote asset manifest");
        Ok(())
    }
}

/// Eligible files under `dir`, sorted by path.
///
/// Unreadable directories are recorded as failures and skipped.
fn collect(dir: &Path, report: &mut AssetReport) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() && is_eligible(entry.path()) => {
                files.push(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => {
                let path = e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
                warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                report.failures.push(AssetFailure {
                    path,
                    error: AssetError::Walk(e),
                });
            }
        }
    }
    files
}

fn is_eligible(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ASSET_EXTENSIONS.contains(&ext))
}

/// Copy one file to its hashed name and return the manifest paths, or
/// `None` when the file is itself a hashed copy.
fn hash_file(output_dir: &Path, path: &Path) -> Result<Option<(String, String)>> {
    let relative = path
        .strip_prefix(output_dir)
        .map_err(|_| AssetError::InvalidPath(path.to_path_buf()))?;

    let content = fs::read(path)?;
    let digest = content_digest(&content);
    if is_hashed_copy(path, &digest) {
        return Ok(None);
    }

    let hashed_name = hashed_file_name(path, &digest)
        .ok_or_else(|| AssetError::InvalidPath(path.to_path_buf()))?;
    let hashed_path = path.with_file_name(&hashed_name);

    write_atomic(&hashed_path, &content)?;

    debug!(
        src = %path.display(),
        dest = %hashed_path.display(),
        "wrote hashed copy"
    );

    let original = url_path(relative);
    let hashed = url_path(&relative.with_file_name(&hashed_name));
    Ok(Some((original, hashed)))
}

/// First [`DIGEST_LEN`] hex characters of the SHA-256 of `content`.
#[must_use]
pub fn content_digest(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))[..DIGEST_LEN].to_string()
}

/// `<stem>.<digest>.<ext>` for `path`, or `None` without a UTF-8 stem/extension.
fn hashed_file_name(path: &Path, digest: &str) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    Some(format!("{stem}.{digest}.{ext}"))
}

/// Whether the stem of `path` ends in `.<digest>`.
fn is_hashed_copy(path: &Path, digest: &str) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|stem| stem.rsplit_once('.'))
        .is_some_and(|(base, suffix)| !base.is_empty() && suffix == digest)
}

fn url_path(relative: &Path) -> String {
    format!("/{}", relative.display()).replace('\\', "/")
}
