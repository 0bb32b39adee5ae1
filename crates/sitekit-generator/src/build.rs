//! Build orchestration.
//!
//! Runs the external site generator and then the post-build steps in a
//! fixed order: build info, asset hashing, sitemap, robots, HTML
//! minification, validation.

use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use sitekit_core::{
    Config, GitInfo,
    process::{ProcessError, RunOptions, run_with_timeout},
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    assets::AssetHasher,
    build_info::{BuildInfoEmitter, BuildInfoError},
    minify::HtmlMinifier,
    robots::RobotsGenerator,
    sitemap::{DEFAULT_BASE_URL, SitemapGenerator},
    validate::{BuildValidator, ValidationReport},
};

/// Default bound for the site generator run.
pub const DEFAULT_GENERATOR_TIMEOUT: Duration = Duration::from_secs(600);

/// Build errors. Each one aborts the pipeline.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Output directory could not be created.
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Site generator could not be run or timed out.
    #[error("site generator error: {0}")]
    Process(#[from] ProcessError),

    /// Site generator exited unsuccessfully.
    #[error("site generator `{program}` failed with exit code {}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    GeneratorFailed { program: String, code: Option<i32> },

    /// Build info could not be written.
    #[error("build info error: {0}")]
    BuildInfo(#[from] BuildInfoError),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// External site generator invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl GeneratorCommand {
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `mkdocs build --site-dir <output_dir> --strict`.
    #[must_use]
    pub fn mkdocs(output_dir: &Path) -> Self {
        Self::new(
            "mkdocs",
            vec![
                "build".to_string(),
                "--site-dir".to_string(),
                output_dir.to_string_lossy().into_owned(),
                "--strict".to_string(),
            ],
        )
    }

    /// Point MkDocs at a configuration file other than `./mkdocs.yml`.
    #[must_use]
    pub fn with_config_file(mut self, path: &Path) -> Self {
        self.args.push("--config-file".to_string());
        self.args.push(path.to_string_lossy().into_owned());
        self
    }
}

/// Build report.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Number of hashed asset copies written.
    pub assets_hashed: usize,

    /// Number of assets that could not be hashed.
    pub asset_failures: usize,

    /// Number of sitemap entries.
    pub sitemap_entries: usize,

    /// Number of HTML pages minified.
    pub pages_minified: usize,

    /// Non-fatal step failures, in pipeline order.
    pub step_failures: Vec<String>,

    pub validation: ValidationReport,

    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

impl BuildReport {
    /// Whether the output tree passed validation.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.validation.is_ok()
    }
}

/// Post-build pipeline for a generated site.
#[derive(Debug)]
pub struct Builder {
    config: Config,
    output_dir: PathBuf,
    generator: Option<GeneratorCommand>,
    generator_timeout: Duration,
    base_url: String,
    minify: bool,
    project_dir: Option<PathBuf>,
}

impl Builder {
    /// Create a builder that runs MkDocs into `output_dir`.
    ///
    /// The public base URL is the config's `site_url`, or
    /// [`DEFAULT_BASE_URL`] when unset.
    #[must_use]
    pub fn new(config: Config, output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        let base_url = match config.site_url() {
            "" => DEFAULT_BASE_URL.to_string(),
            url => url.to_string(),
        };

        Self {
            generator: Some(GeneratorCommand::mkdocs(&output_dir)),
            config,
            output_dir,
            generator_timeout: DEFAULT_GENERATOR_TIMEOUT,
            base_url,
            minify: true,
            project_dir: None,
        }
    }

    /// Replace the site generator; `None` post-processes an existing tree.
    #[must_use]
    pub fn with_generator(mut self, generator: Option<GeneratorCommand>) -> Self {
        self.generator = generator;
        self
    }

    /// Bound the site generator run.
    #[must_use]
    pub fn with_generator_timeout(mut self, timeout: Duration) -> Self {
        self.generator_timeout = timeout;
        self
    }

    /// Override the public base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Read VCS metadata from `dir` instead of the current directory.
    #[must_use]
    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(dir.into());
        self
    }

    /// Enable or disable HTML minification (on by default).
    #[must_use]
    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    /// Execute the full build process.
    pub fn build(&self) -> Result<BuildReport> {
        let start = Instant::now();
        let mut report = BuildReport::default();

        info!(output = %self.output_dir.display(), "starting build");

        // 1. Output directory
        fs::create_dir_all(&self.output_dir).map_err(|source| BuildError::OutputDir {
            path: self.output_dir.clone(),
            source,
        })?;

        // 2. Site generator
        if let Some(ref generator) = self.generator {
            self.run_generator(generator)?;
        } else {
            debug!("no site generator configured, post-processing existing tree");
        }

        // 3. Build info
        let git = self
            .project_dir
            .as_deref()
            .map_or_else(GitInfo::new, GitInfo::at);
        BuildInfoEmitter::new()
            .with_git(git)
            .emit(&self.config, &self.output_dir)?;

        // 4. Asset hashes
        self.hash_assets(&mut report);

        // 5. Sitemap
        match SitemapGenerator::new(self.base_url.as_str()).emit(&self.output_dir) {
            Ok(sitemap) => {
                report.sitemap_entries = sitemap.urls.len();
                report
                    .step_failures
                    .extend(sitemap.errors.iter().map(|e| format!("sitemap: {e}")));
            }
            Err(e) => {
                warn!(error = %e, "failed to generate sitemap");
                report.step_failures.push(format!("sitemap: {e}"));
            }
        }

        // 6. Robots
        if let Err(e) = RobotsGenerator::new(self.base_url.as_str()).generate(&self.output_dir) {
            warn!(error = %e, "failed to generate robots.txt");
            report.step_failures.push(format!("robots.txt: {e}"));
        }

        // 7. HTML minification
        if self.minify {
            let minified = HtmlMinifier::new().minify_dir(&self.output_dir);
            report.pages_minified = minified.minified;
            for failure in &minified.failures {
                report.step_failures.push(format!(
                    "minify: {}: {}",
                    failure.path.display(),
                    failure.error
                ));
            }
        }

        // 8. Validation
        report.validation = BuildValidator::check(&self.output_dir);

        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            assets = report.assets_hashed,
            sitemap_entries = report.sitemap_entries,
            pages_minified = report.pages_minified,
            valid = report.is_ok(),
            duration_ms = report.duration_ms,
            "build complete"
        );

        Ok(report)
    }

    fn run_generator(&self, generator: &GeneratorCommand) -> Result<()> {
        info!(program = %generator.program, args = ?generator.args, "running site generator");

        let options = RunOptions {
            cwd: None,
            capture_stdout: false,
            capture_stderr: false,
            timeout: self.generator_timeout,
        };
        let output = run_with_timeout(&generator.program, &generator.args, options)?;

        if !output.success() {
            return Err(BuildError::GeneratorFailed {
                program: generator.program.clone(),
                code: output.status.code(),
            });
        }
        Ok(())
    }

    fn hash_assets(&self, report: &mut BuildReport) {
        let hasher = AssetHasher::new();
        let assets = match hasher.optimize(&self.output_dir) {
            Ok(assets) => assets,
            Err(e) => {
                warn!(error = %e, "asset hashing aborted");
                report.step_failures.push(format!("assets: {e}"));
                return;
            }
        };

        report.assets_hashed = assets.hashed();
        report.asset_failures = assets.failures.len();
        for failure in &assets.failures {
            report
                .step_failures
                .push(format!("assets: {}: {}", failure.path.display(), failure.error));
        }

        if assets.manifest.is_empty() {
            return;
        }
        if let Err(e) = hasher.write_manifest(&assets, &self.output_dir) {
            warn!(error = %e, "failed to write asset manifest");
            report.step_failures.push(format!("asset manifest: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{
        assets::{ASSET_MANIFEST, content_digest},
        build_info::BUILD_INFO_JSON,
    };

    fn test_config() -> Config {
        Config::from_yaml("site_name: Test Site\nsite_url: https://example.com\n").unwrap()
    }

    fn prebuilt(out: &Path) {
        fs::write(out.join("index.html"), "<html></html>").unwrap();
        fs::create_dir_all(out.join("assets/stylesheets")).unwrap();
        fs::write(out.join("assets/stylesheets/main.css"), "body {}").unwrap();
    }

    #[test]
    fn test_build_prebuilt_tree() {
        let out = TempDir::new().unwrap();
        prebuilt(out.path());

        let report = Builder::new(test_config(), out.path())
            .with_generator(None)
            .build()
            .unwrap();

        assert!(report.is_ok(), "missing: {:?}", report.validation.missing);
        // main.css plus the freshly written build-info.js
        assert_eq!(report.assets_hashed, 2);
        assert_eq!(report.sitemap_entries, 1);
        assert!(report.step_failures.is_empty());
        assert!(out.path().join(BUILD_INFO_JSON).exists());
        assert!(out.path().join(ASSET_MANIFEST).exists());
        assert!(
            out.path()
                .join(format!("assets/stylesheets/main.{}.css", content_digest(b"body {}")))
                .exists()
        );
    }

    #[test]
    fn test_missing_index_fails_validation() {
        let out = TempDir::new().unwrap();

        let report = Builder::new(test_config(), out.path())
            .with_generator(None)
            .build()
            .unwrap();

        assert!(!report.is_ok());
        assert_eq!(report.validation.missing, vec![out.path().join("index.html")]);
    }

    #[test]
    fn test_creates_output_dir() {
        let root = TempDir::new().unwrap();
        let out = root.path().join("dist");

        Builder::new(test_config(), &out)
            .with_generator(None)
            .build()
            .unwrap();

        assert!(out.is_dir());
    }

    #[test]
    fn test_uncreatable_output_dir_is_fatal() {
        let root = TempDir::new().unwrap();
        let blocker = root.path().join("file");
        fs::write(&blocker, "").unwrap();

        let err = Builder::new(test_config(), blocker.join("dist"))
            .with_generator(None)
            .build()
            .unwrap_err();

        assert!(matches!(err, BuildError::OutputDir { .. }));
    }

    #[test]
    fn test_missing_generator_is_fatal() {
        let out = TempDir::new().unwrap();

        let err = Builder::new(test_config(), out.path())
            .with_generator(Some(GeneratorCommand::new(
                "sitekit-no-such-generator",
                vec![],
            )))
            .build()
            .unwrap_err();

        assert!(matches!(err, BuildError::Process(ProcessError::Spawn { .. })));
        assert!(!out.path().join(BUILD_INFO_JSON).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_generator_is_fatal() {
        let out = TempDir::new().unwrap();

        let err = Builder::new(test_config(), out.path())
            .with_generator(Some(GeneratorCommand::new("false", vec![])))
            .build()
            .unwrap_err();

        assert!(matches!(err, BuildError::GeneratorFailed { code: Some(1), .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_generator_output_is_post_processed() {
        let out = TempDir::new().unwrap();
        let index = out.path().join("index.html");
        let script = format!("echo '<html></html>' > '{}'", index.display());

        let report = Builder::new(test_config(), out.path())
            .with_generator(Some(GeneratorCommand::new(
                "sh",
                vec!["-c".to_string(), script],
            )))
            .build()
            .unwrap();

        assert!(report.is_ok());
    }

    #[test]
    fn test_base_url_falls_back_to_default() {
        let out = TempDir::new().unwrap();
        fs::write(out.path().join("index.html"), "").unwrap();

        Builder::new(Config::default(), out.path())
            .with_generator(None)
            .build()
            .unwrap();

        let robots = fs::read_to_string(out.path().join("robots.txt")).unwrap();
        assert!(robots.contains(DEFAULT_BASE_URL));
    }

    #[test]
    fn test_pages_are_minified_after_sitemap() {
        let out = TempDir::new().unwrap();
        let page = "<html>\n  <body>\n    <!-- nav -->\n    <p>Hi</p>\n  </body>\n</html>\n";
        fs::write(out.path().join("index.html"), page).unwrap();

        let report = Builder::new(test_config(), out.path())
            .with_generator(None)
            .build()
            .unwrap();

        assert_eq!(report.pages_minified, 1);
        assert_eq!(report.sitemap_entries, 1);
        let index = fs::read_to_string(out.path().join("index.html")).unwrap();
        assert!(!index.contains("<!-- nav -->"));
        assert!(index.contains("<p>Hi</p>"));
    }

    #[test]
    fn test_minification_can_be_disabled() {
        let out = TempDir::new().unwrap();
        let page = "<html>\n  <!-- nav -->\n</html>\n";
        fs::write(out.path().join("index.html"), page).unwrap();

        let report = Builder::new(test_config(), out.path())
            .with_generator(None)
            .with_minify(false)
            .build()
            .unwrap();

        assert_eq!(report.pages_minified, 0);
        assert_eq!(
            fs::read_to_string(out.path().join("index.html")).unwrap(),
            page
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_a_step_failure() {
        use std::os::unix::fs::PermissionsExt;

        let out = TempDir::new().unwrap();
        prebuilt(out.path());
        let locked = out.path().join("private");
        fs::create_dir_all(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let result = Builder::new(test_config(), out.path())
            .with_generator(None)
            .build();
        let readable = fs::read_dir(&locked).is_ok();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let report = result.unwrap();
        assert!(report.is_ok(), "missing: {:?}", report.validation.missing);
        assert_eq!(report.sitemap_entries, 1);
        if !readable {
            assert!(report.step_failures.iter().any(|f| f.starts_with("sitemap:")));
            assert!(report.step_failures.iter().any(|f| f.starts_with("minify:")));
        }
    }

    #[test]
    fn test_mkdocs_command() {
        let cmd = GeneratorCommand::mkdocs(Path::new("dist"));
        assert_eq!(cmd.program, "mkdocs");
        assert_eq!(cmd.args, ["build", "--site-dir", "dist", "--strict"]);
    }

    #[test]
    fn test_mkdocs_command_with_config_file() {
        let cmd = GeneratorCommand::mkdocs(Path::new("dist"))
            .with_config_file(Path::new("site/mkdocs.yml"));
        assert_eq!(
            cmd.args,
            [
                "build",
                "--site-dir",
                "dist",
                "--strict",
                "--config-file",
                "site/mkdocs.yml"
            ]
        );
    }

    #[test]
    fn test_project_dir_outside_repository() {
        let out = TempDir::new().unwrap();
        fs::write(out.path().join("index.html"), "").unwrap();

        Builder::new(test_config(), out.path())
            .with_generator(None)
            .with_project_dir("/nonexistent/sitekit/project")
            .build()
            .unwrap();

        let json = fs::read_to_string(out.path().join(BUILD_INFO_JSON)).unwrap();
        assert!(json.contains("\"git_commit\": \"unknown\""));
        assert!(json.contains("\"git_branch\": \"unknown\""));
    }
}
