//! Images command - converts source images to WebP

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use sitekit_generator::ImageOptimizer;

/// Run the images command.
///
/// Broken images are listed but do not fail the command.
pub fn run(docs_dir: &Path, quality: f32) -> Result<()> {
    tracing::info!(?docs_dir, quality, "Optimizing images");

    let report = ImageOptimizer::new()
        .with_quality(quality)
        .optimize(docs_dir)
        .wrap_err("Image optimization failed")?;

    for conversion in &report.converted {
        println!(
            "  ✓ {} -> {}",
            conversion.source.display(),
            conversion.output.display()
        );
    }
    for failure in &report.failures {
        println!("  ✗ {}: {}", failure.path.display(), failure.error);
    }

    println!();
    println!(
        "Converted {} image(s), {} failed",
        report.converted.len(),
        report.failures.len()
    );
    Ok(())
}
