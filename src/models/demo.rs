use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::time::Duration;

/// One self-contained demo program, identified by its source file's base name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DemoUnit {
    name: String,
}

impl DemoUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build-system target that builds and runs this demo, e.g. `run_yielding`.
    pub fn target_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.name)
    }

    /// Name of this demo's directory under the artifact root.
    pub fn artifact_dir_name(&self) -> String {
        format!("{}_cov", self.name)
    }
}

impl fmt::Display for DemoUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Directory holding the coverage files of exactly one demo cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDirectory {
    pub demo: DemoUnit,
    pub path: Utf8PathBuf,
}

impl ArtifactDirectory {
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// What one demo cycle produced
#[derive(Debug, Clone)]
pub struct DemoOutcome {
    pub artifacts: ArtifactDirectory,
    pub files_collected: usize,
    pub duration: Duration,
}

/// Result of a complete coverage run
#[derive(Debug, Clone)]
pub struct CoverageReport {
    pub demos: Vec<DemoOutcome>,

    /// Merged coverage dataset
    pub merged_file: Utf8PathBuf,

    /// Rendered report directory
    pub report_dir: Utf8PathBuf,

    /// Page opened in the viewer
    pub entry_point: Utf8PathBuf,
}

impl CoverageReport {
    pub fn files_collected(&self) -> usize {
        self.demos.iter().map(|d| d.files_collected).sum()
    }
}
