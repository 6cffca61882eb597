use crate::models::CoverageSettings;
use anyhow::{bail, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Settings file looked up in the project directory
pub const SETTINGS_FILE: &str = "democov.yaml";

/// Prefix for environment overrides, e.g. `DEMOCOV_PLATFORM=arm_linux`
pub const ENV_PREFIX: &str = "DEMOCOV";

/// Settings keys an environment variable fills as a space-separated list,
/// e.g. `DEMOCOV_TOOLS__BUILD="make -j8"`
const ENV_LIST_KEYS: [&str; 8] = [
    "tools.configure",
    "tools.build",
    "tools.aggregate",
    "tools.render",
    "tools.viewer",
    "coverage_extensions",
    "configure_args",
    "required_settings",
];

/// Configuration manager for loading and saving the run settings.
///
/// Settings are layered: built-in defaults, then `democov.yaml` (optional), then
/// `DEMOCOV_*` environment variables. Nested keys use `__` and list values are split
/// on spaces, e.g. `DEMOCOV_TOOLS__VIEWER="firefox --new-tab"`.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    project_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager for the project at `project_dir`.
    ///
    /// # Arguments
    /// * `project_dir` - Root of the C project (holds `CMakeLists.txt` and `demos/`)
    ///
    /// # Errors
    /// Returns an error if the project directory does not exist.
    pub fn new<P: AsRef<Utf8Path>>(project_dir: P) -> Result<Self> {
        let project_dir = project_dir.as_ref().to_path_buf();

        if !project_dir.is_dir() {
            bail!("Project directory not found: {}", project_dir);
        }

        Ok(Self {
            settings_path: project_dir.join(SETTINGS_FILE),
            project_dir,
        })
    }

    /// Use `path` instead of `<project>/democov.yaml`; relative paths are taken from the
    /// project directory.
    pub fn with_settings_path<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.settings_path = self.project_dir.join(path.as_ref());
        self
    }

    /// Load the run settings.
    ///
    /// # Returns
    /// The layered settings; defaults if neither the file nor any override exists
    pub fn load_settings(&self) -> Result<CoverageSettings> {
        let mut builder = config::Config::builder();

        if self.settings_path.exists() {
            builder = builder.add_source(config::File::new(
                self.settings_path.as_str(),
                config::FileFormat::Yaml,
            ));
        } else {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let environment = ENV_LIST_KEYS.iter().fold(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(" "),
            |env, key| env.with_list_parse_key(key),
        );

        let layered = builder
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let settings: CoverageSettings = layered
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!(
            "Loaded settings (platform={}, demos={})",
            settings.platform,
            settings.demo_dir
        );
        Ok(settings)
    }

    /// Save `settings` to the settings file.
    pub fn save_settings(&self, settings: &CoverageSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Write the default settings file.
    ///
    /// # Errors
    /// Refuses to replace an existing file unless `force` is set.
    pub fn write_default_settings(&self, force: bool) -> Result<()> {
        if self.settings_path.exists() && !force {
            bail!(
                "Settings file already exists: {} (use --force to overwrite)",
                self.settings_path
            );
        }
        self.save_settings(&CoverageSettings::default())
    }

    /// Where the settings come from, for logging once a subscriber is installed.
    pub fn settings_source(&self) -> String {
        if self.settings_path.exists() {
            format!("{} (+ {}_* environment)", self.settings_path, ENV_PREFIX)
        } else {
            format!(
                "defaults, no file at {} (+ {}_* environment)",
                self.settings_path, ENV_PREFIX
            )
        }
    }

    pub fn project_dir(&self) -> &Utf8Path {
        &self.project_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}
