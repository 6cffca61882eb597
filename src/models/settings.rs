use crate::error::{CoverageError, Result};
use crate::models::build_config::DEFAULT_REQUIRED_SETTINGS;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Settings for a coverage run, loaded from `democov.yaml`
///
/// Every field has a default matching a classic in-source CMake build of a `demos/`
/// directory, so an empty (or absent) settings file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageSettings {
    /// Directory holding the demo sources (non-recursive)
    pub demo_dir: Utf8PathBuf,

    /// Build tree where the native build system is configured and run
    pub build_dir: Utf8PathBuf,

    /// Directory walked for coverage files after each demo, relative to `build_dir`
    pub artifact_search_dir: Utf8PathBuf,

    /// Artifact root; wiped at the start of every run
    pub output_dir: Utf8PathBuf,

    /// Merged coverage dataset written by the aggregation tool
    pub merged_file: Utf8PathBuf,

    /// Rendered report directory
    pub report_dir: Utf8PathBuf,

    /// Persisted build settings, relative to `build_dir`
    pub cache_file: Utf8PathBuf,

    pub log_dir: Utf8PathBuf,

    pub platform: String,
    pub opt_level: String,

    /// Demo source suffix without the dot
    pub source_suffix: String,

    /// Coverage file extensions without the dot
    pub coverage_extensions: Vec<String>,

    pub run_target_prefix: String,

    /// Extra arguments appended to the configure command
    pub configure_args: Vec<String>,

    /// Setting names the build-config resolver must find
    pub required_settings: Vec<String>,

    pub open_report: bool,

    /// Per-command timeout; absent means wait for the command indefinitely
    pub command_timeout_secs: Option<u64>,

    pub tools: ToolSettings,

    pub exclusions: ExclusionRules,
}

impl Default for CoverageSettings {
    fn default() -> Self {
        Self {
            demo_dir: Utf8PathBuf::from("demos"),
            build_dir: Utf8PathBuf::from("."),
            artifact_search_dir: Utf8PathBuf::from("CMakeFiles"),
            output_dir: Utf8PathBuf::from("cov"),
            merged_file: Utf8PathBuf::from("overall_coverage.info"),
            report_dir: Utf8PathBuf::from("out"),
            cache_file: Utf8PathBuf::from("CMakeCache.txt"),
            log_dir: Utf8PathBuf::from("logs"),
            platform: "linux".to_string(),
            opt_level: "0".to_string(),
            source_suffix: "c".to_string(),
            coverage_extensions: vec!["gcda".to_string(), "gcno".to_string()],
            run_target_prefix: "run_".to_string(),
            configure_args: Vec::new(),
            required_settings: DEFAULT_REQUIRED_SETTINGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            open_report: true,
            command_timeout_secs: None,
            tools: ToolSettings::default(),
            exclusions: ExclusionRules::default(),
        }
    }
}

impl CoverageSettings {
    /// Resolve every configured path against the project directory.
    ///
    /// The build dir is relative to the project; the artifact search dir and the cache
    /// file are relative to the build dir. Absolute settings are kept as-is.
    pub fn resolve_paths(&self, project_dir: &Utf8Path) -> PipelinePaths {
        let build_dir = join(project_dir, &self.build_dir);

        PipelinePaths {
            project_dir: project_dir.to_path_buf(),
            demo_dir: join(project_dir, &self.demo_dir),
            artifact_search_dir: join(&build_dir, &self.artifact_search_dir),
            cache_file: join(&build_dir, &self.cache_file),
            output_dir: join(project_dir, &self.output_dir),
            merged_file: join(project_dir, &self.merged_file),
            report_dir: join(project_dir, &self.report_dir),
            log_dir: join(project_dir, &self.log_dir),
            build_dir,
        }
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    /// Check the settings that would otherwise fail late in a run.
    pub fn validate(&self) -> Result<()> {
        for (name, tool) in self.tools.named() {
            if tool.first().is_none_or(|program| program.trim().is_empty()) {
                return Err(CoverageError::InvalidSettings(format!(
                    "tool `{}` has no program",
                    name
                )));
            }
        }

        if self.coverage_extensions.is_empty() {
            return Err(CoverageError::InvalidSettings(
                "coverage_extensions is empty".to_string(),
            ));
        }

        if self.source_suffix.is_empty() {
            return Err(CoverageError::InvalidSettings(
                "source_suffix is empty".to_string(),
            ));
        }

        if self.platform.is_empty() {
            return Err(CoverageError::InvalidSettings("platform is empty".to_string()));
        }

        // Surfaces `extends` cycles before anything is built
        self.exclusions.exclusion_set(&self.platform)?;

        Ok(())
    }
}

fn join(base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.as_str().is_empty() || path.as_str() == "." {
        base.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Absolute locations used by one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePaths {
    pub project_dir: Utf8PathBuf,
    pub demo_dir: Utf8PathBuf,
    pub build_dir: Utf8PathBuf,
    pub artifact_search_dir: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,
    pub merged_file: Utf8PathBuf,
    pub report_dir: Utf8PathBuf,
    pub cache_file: Utf8PathBuf,
    pub log_dir: Utf8PathBuf,
}

impl PipelinePaths {
    /// Check that the directories a run deletes cannot take project inputs with them.
    ///
    /// The artifact root and the report directory are wiped at the start of every run,
    /// so neither may equal or contain the project, demo, build or search directories,
    /// and they may not overlap each other.
    pub fn check_owned_dirs(&self) -> Result<()> {
        let protected = [
            ("project_dir", &self.project_dir),
            ("demo_dir", &self.demo_dir),
            ("build_dir", &self.build_dir),
            ("artifact_search_dir", &self.artifact_search_dir),
        ];
        let owned = [("output_dir", &self.output_dir), ("report_dir", &self.report_dir)];

        for (owned_name, owned_dir) in owned {
            let owned_dir = normalize(owned_dir);
            for (name, dir) in protected {
                if normalize(dir).starts_with(&owned_dir) {
                    return Err(CoverageError::InvalidSettings(format!(
                        "{} ({}) would delete {} ({})",
                        owned_name, owned_dir, name, dir
                    )));
                }
            }
        }

        let output_dir = normalize(&self.output_dir);
        let report_dir = normalize(&self.report_dir);
        if output_dir.starts_with(&report_dir) || report_dir.starts_with(&output_dir) {
            return Err(CoverageError::InvalidSettings(format!(
                "output_dir ({}) and report_dir ({}) overlap",
                output_dir, report_dir
            )));
        }

        Ok(())
    }
}

/// Lexically resolve `.` and `..` so containment checks see through them.
fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut normalized = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_str()),
        }
    }
    normalized
}

/// External tools, each a program followed by leading arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub configure: Vec<String>,
    pub build: Vec<String>,
    pub aggregate: Vec<String>,
    pub render: Vec<String>,

    /// Report viewer; the platform opener is used when unset
    pub viewer: Option<Vec<String>>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            configure: vec!["cmake".to_string()],
            build: vec!["make".to_string()],
            aggregate: vec!["lcov".to_string()],
            render: vec!["genhtml".to_string()],
            viewer: None,
        }
    }
}

impl ToolSettings {
    fn named(&self) -> impl Iterator<Item = (&'static str, &[String])> {
        let viewer = self.viewer.as_deref().map(|v| ("viewer", v));
        [
            ("configure", self.configure.as_slice()),
            ("build", self.build.as_slice()),
            ("aggregate", self.aggregate.as_slice()),
            ("render", self.render.as_slice()),
        ]
        .into_iter()
        .chain(viewer)
    }
}

/// Exclusions for a single platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformExclusions {
    /// Platform whose exclusions are included before this entry's own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    #[serde(default)]
    pub excludes: Vec<String>,
}

/// Platform-keyed demo exclusions
///
/// Entries compose additively through `extends`: a platform gets the full set of the
/// platform it extends plus its own names. A platform without an entry excludes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionRules(IndexMap<String, PlatformExclusions>);

impl Default for ExclusionRules {
    fn default() -> Self {
        Self::empty()
            .with_platform("linux", ["stackcheck", "selfyield", "alloc"])
            .with_platform("arm_linux", ["stackcheck", "threadlocalstorage", "timer"])
            .with_platform("aarch64", ["threadlocalstorage"])
    }
}

impl ExclusionRules {
    pub fn empty() -> Self {
        Self(IndexMap::new())
    }

    pub fn with_platform<I, S>(mut self, platform: &str, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.insert(
            platform.to_string(),
            PlatformExclusions {
                extends: None,
                excludes: excludes.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    pub fn extending<I, S>(mut self, platform: &str, base: &str, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.insert(
            platform.to_string(),
            PlatformExclusions {
                extends: Some(base.to_string()),
                excludes: excludes.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    pub fn get(&self, platform: &str) -> Option<&PlatformExclusions> {
        self.0
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(platform))
            .map(|(_, entry)| entry)
    }

    /// The full set of demo names excluded on `platform`.
    pub fn exclusion_set(&self, platform: &str) -> Result<BTreeSet<String>> {
        let mut excluded = BTreeSet::new();
        let mut chain: Vec<String> = Vec::new();
        let mut current = Some(platform.to_string());

        while let Some(name) = current.take() {
            let key = name.to_ascii_lowercase();
            if chain.contains(&key) {
                chain.push(key);
                return Err(CoverageError::InvalidSettings(format!(
                    "exclusion cycle: {}",
                    chain.join(" -> ")
                )));
            }
            chain.push(key);

            if let Some(entry) = self.get(&name) {
                excluded.extend(entry.excludes.iter().cloned());
                current = entry.extends.clone();
            }
        }

        Ok(excluded)
    }
}
