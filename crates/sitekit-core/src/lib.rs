//! Sitekit Core Library
//!
//! Configuration, error handling and the small process/file-system helpers
//! shared by every sitekit step.

pub mod config;
pub mod error;
pub mod fs;
pub mod git;
pub mod process;

pub use config::Config;
pub use error::{CoreError, Result};
pub use git::GitInfo;
pub use process::{CommandOutput, ProcessError, run_with_timeout};
