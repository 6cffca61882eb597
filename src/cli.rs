//! # CLI Argument Definitions
//!
//! Command-line surface of the `democov` binary, parsed with `clap`.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// The main CLI structure parsing command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "democov")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build, run and collect gcov coverage for every demo of a CMake project")]
pub struct Cli {
    /// Root of the C project (holds CMakeLists.txt and the demo directory)
    #[arg(short, long, global = true, default_value = ".")]
    pub project: Utf8PathBuf,

    /// Settings file to use instead of <project>/democov.yaml
    #[arg(short, long, global = true)]
    pub settings: Option<Utf8PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Enumeration of available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Configure, build and run every demo, then aggregate and render the report
    Run {
        /// Target platform passed to the configure step
        #[arg(long)]
        platform: Option<String>,
        /// Only run these demos (repeatable)
        #[arg(short, long = "demo", value_name = "NAME")]
        demos: Vec<String>,
        /// Do not open the rendered report
        #[arg(long)]
        no_open: bool,
    },
    /// List the demos a run would process
    Discover {
        /// Platform whose exclusions are applied
        #[arg(long)]
        platform: Option<String>,
    },
    /// Read settings back out of the build cache
    BuildConfig {
        /// Cache file to read instead of the configured one
        #[arg(long)]
        cache: Option<Utf8PathBuf>,
        /// Setting names to require (repeatable); defaults to the configured list
        #[arg(short, long = "require", value_name = "NAME")]
        require: Vec<String>,
    },
    /// Write a settings file with the default values
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
}

impl Commands {
    /// Platform override given on the command line, if any.
    pub fn platform(&self) -> Option<&str> {
        match self {
            Self::Run { platform, .. } | Self::Discover { platform } => platform.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "democov", "--project", "/work", "run", "--platform", "arm_linux", "-d", "demoA",
            "--demo", "demoB", "--no-open",
        ])
        .unwrap();

        assert_eq!(cli.project, "/work");
        assert_eq!(cli.command.platform(), Some("arm_linux"));
        match cli.command {
            Commands::Run { demos, no_open, .. } => {
                assert_eq!(demos, vec!["demoA", "demoB"]);
                assert!(no_open);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_build_config_defaults() {
        let cli = Cli::try_parse_from(["democov", "build-config"]).unwrap();
        assert_eq!(cli.project, ".");
        assert!(!cli.verbose);
        match cli.command {
            Commands::BuildConfig { cache, require } => {
                assert!(cache.is_none());
                assert!(require.is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["democov"]).is_err());
    }
}
