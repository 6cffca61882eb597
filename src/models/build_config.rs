use indexmap::IndexMap;

pub const BUILD_PLATFORM: &str = "BUILD_PLATFORM";
pub const OPT_LEVEL: &str = "OPT_LEVEL";
pub const UBSAN: &str = "UBSAN";
pub const LTO: &str = "LTO";

/// Build settings the test runner needs from the CMake cache, in suite-name order
pub const DEFAULT_REQUIRED_SETTINGS: [&str; 4] = [BUILD_PLATFORM, OPT_LEVEL, UBSAN, LTO];

/// Build settings resolved from a persisted build-configuration cache
///
/// Entries are kept in the order the caller asked for them, which is independent of
/// the order they appear in the cache file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    entries: IndexMap<String, String>,
}

impl BuildConfig {
    pub(crate) fn from_entries(entries: IndexMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> Vec<&str> {
        self.entries.values().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn platform(&self) -> Option<&str> {
        self.get(BUILD_PLATFORM)
    }

    /// Name of the test suite for this build, e.g. `linux_O0_UBSAN_OFF_LTO_OFF`.
    ///
    /// Returns `None` unless all four standard settings were resolved.
    pub fn suite_name(&self) -> Option<String> {
        Some(format!(
            "{}_O{}_UBSAN_{}_LTO_{}",
            self.get(BUILD_PLATFORM)?,
            self.get(OPT_LEVEL)?,
            self.get(UBSAN)?,
            self.get(LTO)?
        ))
    }
}
