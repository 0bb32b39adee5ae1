//! Build command - runs the site generator and the post-build steps

use std::{path::Path, time::Duration};

use color_eyre::eyre::{Result, WrapErr, bail};
use sitekit_core::Config;
use sitekit_generator::{Builder, GeneratorCommand, build::DEFAULT_GENERATOR_TIMEOUT};

/// Options for the build command.
#[derive(Debug, Clone)]
pub struct BuildOptions<'a> {
    pub config_path: &'a Path,
    pub output: &'a Path,
    /// Post-process `output` as it is instead of running MkDocs first.
    pub skip_generator: bool,
    /// Site generator timeout; defaults to [`DEFAULT_GENERATOR_TIMEOUT`].
    pub timeout: Option<Duration>,
    /// Override the config's `site_url`.
    pub base_url: Option<&'a str>,
    /// Minify the generated HTML.
    pub minify: bool,
}

/// Run the build command.
///
/// Fails when the config cannot be loaded, the site generator fails, or the
/// finished tree is missing required files.
pub fn run(options: &BuildOptions<'_>) -> Result<()> {
    tracing::info!(?options, "Starting build");

    let config = Config::load(options.config_path).wrap_err("Failed to load configuration")?;
    tracing::debug!(?config, "Loaded configuration");

    let generator = (!options.skip_generator)
        .then(|| GeneratorCommand::mkdocs(options.output).with_config_file(options.config_path));

    let mut builder = Builder::new(config, options.output)
        .with_generator(generator)
        .with_generator_timeout(options.timeout.unwrap_or(DEFAULT_GENERATOR_TIMEOUT))
        .with_minify(options.minify);
    if let Some(dir) = options.config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        builder = builder.with_project_dir(dir);
    }
    if let Some(url) = options.base_url {
        tracing::info!(base_url = url, "Overriding site URL from CLI");
        builder = builder.with_base_url(url);
    }

    println!("Building site into {}...", options.output.display());
    let report = builder.build().wrap_err("Build failed")?;

    if !report.step_failures.is_empty() {
        println!();
        println!("  Warnings:");
        for failure in &report.step_failures {
            println!("  ⚠ {failure}");
        }
    }

    println!();
    println!("  Hashed assets:   {}", report.assets_hashed);
    println!("  Sitemap entries: {}", report.sitemap_entries);
    println!("  Minified pages:  {}", report.pages_minified);
    println!("  Duration:        {:.2}s", report.duration_ms as f64 / 1000.0);
    println!("  Output:          {}", options.output.display());
    println!();

    if !report.is_ok() {
        for path in &report.validation.missing {
            println!("  ✗ Missing required file: {}", path.display());
        }
        bail!(
            "Build validation failed: {} required file(s) missing",
            report.validation.missing.len()
        );
    }

    println!("✓ Build completed and validated");
    tracing::info!(?report, "Build completed successfully");
    Ok(())
}
