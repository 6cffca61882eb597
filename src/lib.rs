// democov - per-demo coverage collection for CMake demo suites
//
// This is the library crate containing the pipeline and its data structures.
// The binary crate (main.rs) provides the command-line entry point.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use error::{CoverageError, Step};
pub use models::{BuildConfig, CoverageSettings, DemoUnit, ExclusionRules};
pub use services::{CoveragePipeline, ProcessRunner, RunOptions};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
