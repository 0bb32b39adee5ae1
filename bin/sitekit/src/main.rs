//! Sitekit CLI
//!
//! Build helpers for MkDocs documentation sites.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::Result;
use sitekit::cmd::build::BuildOptions;

/// Command-line interface for sitekit.
#[derive(Parser)]
#[command(
    name = "sitekit",
    version,
    about = "Build helpers for MkDocs documentation sites"
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Build the site and run the post-build steps
    Build {
        /// Path to the site configuration file
        #[arg(short, long, default_value = "mkdocs.yml")]
        config: std::path::PathBuf,
        /// Output directory
        #[arg(short, long, default_value = "dist")]
        output: std::path::PathBuf,
        /// Post-process an existing output directory without running MkDocs
        #[arg(long)]
        skip_generator: bool,
        /// Site generator timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Override the site URL used for the sitemap and robots.txt
        #[arg(long)]
        base_url: Option<String>,
        /// Leave the generated HTML as it is
        #[arg(long)]
        no_minify: bool,
    },
    /// Convert JPEG and PNG images in the docs tree to WebP
    Images {
        /// Documentation source directory
        #[arg(short, long, default_value = "docs")]
        docs: std::path::PathBuf,
        /// WebP quality (0-100)
        #[arg(short, long, default_value_t = 85.0)]
        quality: f32,
    },
    /// Validate Markdown sources
    Check {
        /// Documentation source directory
        #[arg(short, long, default_value = "docs")]
        docs: std::path::PathBuf,
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    sitekit::init_tracing(cli.verbose);

    match cli.command {
        Commands::Build {
            config,
            output,
            skip_generator,
            timeout,
            base_url,
            no_minify,
        } => {
            sitekit::cmd::build::run(&BuildOptions {
                config_path: &config,
                output: &output,
                skip_generator,
                timeout: timeout.map(Duration::from_secs),
                base_url: base_url.as_deref(),
                minify: !no_minify,
            })?;
        }
        Commands::Images { docs, quality } => {
            sitekit::cmd::images::run(&docs, quality)?;
        }
        Commands::Check { docs, strict } => {
            sitekit::cmd::check::run(&docs, strict)?;
        }
    }

    Ok(())
}
