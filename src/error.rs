use camino::Utf8PathBuf;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A step of the coverage pipeline that runs an external command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Configure,
    Clean,
    BuildAndRun,
    Aggregate,
    Render,
    Present,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Configure => "configure",
            Step::Clean => "clean",
            Step::BuildAndRun => "build-and-run",
            Step::Aggregate => "aggregate",
            Step::Render => "render",
            Step::Present => "present",
        };
        f.write_str(name)
    }
}

/// Errors that can abort a coverage run
///
/// Every variant is fatal. There is no resume: a failed run starts over from the
/// beginning, and the artifact root is wiped again when it does.
#[derive(Error, Debug)]
pub enum CoverageError {
    #[error("Couldn't find the build config in {path}: missing {}", missing.join(", "))]
    ConfigurationNotFound {
        path: Utf8PathBuf,
        missing: Vec<String>,
    },

    #[error("{step} step failed: `{command}` exited with {}", exit_label(*code))]
    CommandFailed {
        step: Step,
        command: String,
        code: i32,
    },

    #[error("{step} step failed: could not run `{command}`: {source}")]
    Spawn {
        step: Step,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} step failed: `{command}` timed out after {after:?}")]
    Timeout {
        step: Step,
        command: String,
        after: Duration,
    },

    #[error("Failed to {action} {path}: {source}")]
    Filesystem {
        action: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact {0} already collected for this demo")]
    ArtifactCollision(Utf8PathBuf),

    #[error("Artifact directory {0} does not exist")]
    MissingArtifactDir(Utf8PathBuf),

    #[error("Rendered report has no entry point at {0}")]
    ReportMissing(Utf8PathBuf),

    #[error("No demos to run in {0}")]
    NoDemos(Utf8PathBuf),

    #[error("Demo {0} was not discovered for this platform")]
    UnknownDemo(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

fn exit_label(code: i32) -> String {
    if code < 0 {
        "no exit code (terminated by signal)".to_string()
    } else {
        format!("exit code {}", code)
    }
}

impl CoverageError {
    /// Wrap an I/O error with the filesystem action that produced it.
    pub fn fs(action: &'static str, path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        CoverageError::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoverageError>;
