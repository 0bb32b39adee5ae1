//! Sitekit Generator Library
//!
//! Post-build steps for a static documentation site.
//!
//! # Modules
//!
//! - [`build_info`] - Build metadata as JSON and as a script global
//! - [`assets`] - Content-hashed copies of stylesheets and scripts
//! - [`sitemap`] - XML sitemap generation
//! - [`robots`] - robots.txt generation
//! - [`minify`] - In-place HTML minification
//! - [`validate`] - Required output file checks
//! - [`images`] - JPEG/PNG to WebP conversion for the source tree
//! - [`build`] - Build orchestration

pub mod assets;
pub mod build;
pub mod build_info;
pub mod images;
pub mod minify;
pub mod robots;
pub mod sitemap;
pub mod validate;

pub use assets::{AssetHasher, AssetManifest, AssetReport};
pub use build::{BuildError, BuildReport, Builder, GeneratorCommand};
pub use build_info::{BuildInfo, BuildInfoEmitter};
pub use images::{ImageOptimizer, ImageReport};
pub use minify::{HtmlMinifier, MinifyReport};
pub use robots::RobotsGenerator;
pub use sitemap::{Sitemap, SitemapGenerator};
pub use validate::{BuildValidator, ValidationReport};
