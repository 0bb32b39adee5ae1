//! Image optimization.
//!
//! Converts raster images in the documentation sources to lossy WebP next to
//! the originals. `photo.png` gains a sibling `photo.webp`; the PNG stays.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use sitekit_core::fs::write_atomic;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Default WebP quality.
pub const DEFAULT_QUALITY: f32 = 85.0;

/// Extensions visited during the walk (lowercase).
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Extensions that get converted (lowercase).
const CONVERTIBLE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Image processing errors.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Source directory does not exist.
    #[error("source directory not found: {0}")]
    MissingDir(PathBuf),

    /// Directory traversal error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Decoding error.
    #[error("decode error: {0}")]
    Decode(#[from] image::ImageError),

    /// WebP encoding error.
    #[error("WebP encoding error: {0}")]
    Encode(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ImageError>;

/// A converted image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub source: PathBuf,
    pub output: PathBuf,
}

/// An image that could not be converted.
#[derive(Debug)]
pub struct ImageFailure {
    pub path: PathBuf,
    pub error: ImageError,
}

/// Outcome of one optimization pass.
#[derive(Debug, Default)]
pub struct ImageReport {
    pub converted: Vec<Conversion>,

    /// Images already in WebP format.
    pub skipped: usize,

    pub failures: Vec<ImageFailure>,
}

/// Converts JPEG and PNG sources to WebP.
#[derive(Debug, Clone)]
pub struct ImageOptimizer {
    quality: f32,
}

impl Default for ImageOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageOptimizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
        }
    }

    /// Set the WebP quality, clamped to `0.0..=100.0`.
    #[must_use]
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality.clamp(0.0, 100.0);
        self
    }

    #[must_use]
    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Convert every eligible image under `source_dir`.
    ///
    /// A single broken image or unreadable directory is recorded in the
    /// report and does not stop the walk.
    pub fn optimize(&self, source_dir: &Path) -> Result<ImageReport> {
        if !source_dir.is_dir() {
            return Err(ImageError::MissingDir(source_dir.to_path_buf()));
        }

        info!(dir = %source_dir.display(), quality = self.quality, "optimizing images");

        let mut report = ImageReport::default();
        for path in find_images(source_dir, &mut report) {
            if !has_extension(&path, &CONVERTIBLE_EXTENSIONS) {
                report.skipped += 1;
                continue;
            }

            match self.convert(&path) {
                Ok(output) => {
                    info!(src = %path.display(), dest = %output.display(), "optimized image");
                    report.converted.push(Conversion {
                        source: path,
                        output,
                    });
                }
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "failed to optimize image");
                    report.failures.push(ImageFailure { path, error });
                }
            }
        }

        info!(
            converted = report.converted.len(),
            skipped = report.skipped,
            failed = report.failures.len(),
            "image optimization finished"
        );
        Ok(report)
    }

    /// Convert one image, returning the path of the WebP file.
    pub fn convert(&self, path: &Path) -> Result<PathBuf> {
        let img = image::open(path)?;
        let encoded = self.encode(&img)?;

        let output = path.with_extension("webp");
        write_atomic(&output, &encoded)?;

        debug!(bytes = encoded.len(), path = %output.display(), "wrote webp");
        Ok(output)
    }

    fn encode(&self, img: &DynamicImage) -> Result<Vec<u8>> {
        let encoded = if img.color().has_alpha() {
            let rgba = img.to_rgba8();
            let (width, height) = rgba.dimensions();
            webp::Encoder::from_rgba(rgba.as_raw(), width, height)
                .encode_simple(false, self.quality)
        } else {
            let rgb = img.to_rgb8();
            let (width, height) = rgb.dimensions();
            webp::Encoder::from_rgb(rgb.as_raw(), width, height)
                .encode_simple(false, self.quality)
        };

        let memory = encoded.map_err(|e| ImageError::Encode(format!("{e:?}")))?;
        Ok(memory.to_vec())
    }
}

/// Image files under `dir`, sorted by path.
fn find_images(dir: &Path, report: &mut ImageReport) -> Vec<PathBuf> {
    let mut images = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
                warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                report.failures.push(ImageFailure {
                    path,
                    error: e.into(),
                });
                continue;
            }
        };
        if entry.file_type().is_file() && has_extension(entry.path(), &IMAGE_EXTENSIONS) {
            images.push(entry.into_path());
        }
    }
    images
}

/// Case-insensitive extension match.
fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}
