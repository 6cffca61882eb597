//! Data models for democov.
//!
//! - [`CoverageSettings`]: run settings loaded from `democov.yaml`, including tool commands and
//!   platform exclusions ([`ExclusionRules`])
//! - [`PipelinePaths`]: the settings' paths resolved against a project directory
//! - [`BuildConfig`]: build settings read back from the CMake cache
//! - [`DemoUnit`], [`ArtifactDirectory`]: a demo and the directory its coverage files land in
//! - [`CoverageReport`]: what a finished run produced

pub mod build_config;
pub mod demo;
pub mod settings;

pub use build_config::{BuildConfig, DEFAULT_REQUIRED_SETTINGS};
pub use demo::{ArtifactDirectory, CoverageReport, DemoOutcome, DemoUnit};
pub use settings::{
    CoverageSettings, ExclusionRules, PipelinePaths, PlatformExclusions, ToolSettings,
};
