//! Check command - lint Markdown sources

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};
use sitekit_lint::MarkdownValidator;

/// Run the check command.
///
/// Prints warnings first, then errors. Fails on any error, or on any
/// warning when `strict` is set.
pub fn run(docs_dir: &Path, strict: bool) -> Result<()> {
    tracing::info!(?docs_dir, strict, "Checking Markdown sources");

    let report = MarkdownValidator::new()
        .validate_dir(docs_dir)
        .wrap_err("Markdown validation failed")?;

    for warn in &report.warnings {
        println!("⚠ {warn}");
    }
    for err in &report.errors {
        println!("✗ {err}");
    }

    if report.has_errors() {
        bail!("Validation failed with {} error(s)", report.errors.len());
    }

    if strict && report.has_warnings() {
        bail!(
            "Validation failed with {} warning(s) (strict mode)",
            report.warnings.len()
        );
    }

    println!("✓ All {} Markdown file(s) passed validation", report.files_checked);
    Ok(())
}
