//! Sitekit Lint Library
//!
//! Heuristic checks for Markdown documentation sources.

pub mod markdown;

pub use markdown::{Diagnostic, DiagnosticKind, LintError, LintReport, MarkdownValidator};
