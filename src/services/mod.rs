//! Services module - the coverage pipeline and the pieces it is built from.
//!
//! Nothing in here knows about the CLI. Every path comes in as a parameter; no service
//! depends on the process's working directory.
//!
//! # Components
//!
//! - [`build_config`]: reads `NAME:TYPE=VALUE` settings back out of the CMake cache
//! - [`discovery`]: lists demo sources and applies platform exclusions
//! - [`runner`]: the [`CommandRunner`] seam and its tokio-backed [`ProcessRunner`]
//! - [`build`]: configure once, then clean + build-and-run per demo ([`BuildInvoker`])
//! - [`collector`]: drains coverage files from the build tree into per-demo directories
//! - [`report`]: aggregates, renders and opens the coverage report ([`Reporter`])
//! - [`pipeline`]: the full run in order ([`CoveragePipeline`])
//!
//! # Usage Example
//!
//! ```ignore
//! use democov::services::{CoveragePipeline, ProcessRunner, RunOptions};
//!
//! let runner = ProcessRunner::new(settings.command_timeout());
//! let pipeline = CoveragePipeline::new(runner, settings, &project_dir)?;
//! let report = pipeline.run(&RunOptions::default()).await?;
//! println!("{}", report.entry_point);
//! ```

pub mod build;
pub mod build_config;
pub mod collector;
pub mod discovery;
pub mod pipeline;
pub mod report;
pub mod runner;

pub use build::BuildInvoker;
pub use build_config::{resolve_build_config, BuildConfigResolver};
pub use collector::{ArtifactCollector, ArtifactRoot};
pub use discovery::{discover_demos, select_demos};
pub use pipeline::{CoveragePipeline, RunOptions};
pub use report::{Reporter, REPORT_ENTRY_POINT};
pub use runner::{run_checked, CommandRunner, Invocation, ProcessRunner};
