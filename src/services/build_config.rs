//! Reads build settings back out of a persisted CMake cache (`CMakeCache.txt`).
//!
//! Cache lines look like `NAME:TYPE=VALUE`. Only the names the caller asks for are kept,
//! and they come back in the caller's order.

use crate::error::{CoverageError, Result};
use crate::models::BuildConfig;
use camino::Utf8Path;
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use std::fs;

/// Resolver for `NAME:TYPE=VALUE` build-configuration caches
pub struct BuildConfigResolver {
    /// `NAME:TYPE=VALUE`; the type annotation is ignored
    var_pattern: Regex,
}

impl BuildConfigResolver {
    pub fn new() -> Self {
        Self {
            var_pattern: Regex::new(r"^(?P<var>.+):.+=(?P<value>.+)")
                .expect("Invalid cache line regex"),
        }
    }

    /// Split one cache line into its name and value.
    pub fn parse_line<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        let caps = self.var_pattern.captures(line)?;
        let var = caps.name("var")?.as_str();
        let value = caps.name("value")?.as_str();
        Some((var, value))
    }

    /// Resolve `required` from cache file contents.
    ///
    /// `source` only names the cache in the error when a setting is missing.
    pub fn resolve_str<S: AsRef<str>>(
        &self,
        contents: &str,
        source: &Utf8Path,
        required: &[S],
    ) -> Result<BuildConfig> {
        // Repeated names collapse into one lookup, kept in first-request order
        let mut outstanding: IndexSet<&str> = required.iter().map(AsRef::as_ref).collect();
        let mut found: IndexMap<&str, &str> = IndexMap::with_capacity(outstanding.len());

        for line in contents.lines() {
            if outstanding.is_empty() {
                break;
            }

            let Some((var, value)) = self.parse_line(line) else {
                continue;
            };

            if outstanding.shift_remove(var) {
                found.insert(var, value);
            }
        }

        if !outstanding.is_empty() {
            let missing: Vec<String> = outstanding.iter().map(|name| name.to_string()).collect();
            tracing::warn!("Build config in {} is missing {:?}", source, missing);
            return Err(CoverageError::ConfigurationNotFound {
                path: source.to_path_buf(),
                missing,
            });
        }

        let entries = required
            .iter()
            .map(AsRef::as_ref)
            .filter_map(|name| {
                found
                    .get(name)
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect();

        Ok(BuildConfig::from_entries(entries))
    }

    /// Read `cache_file` and resolve `required` from it.
    pub fn resolve_file<S: AsRef<str>>(
        &self,
        cache_file: &Utf8Path,
        required: &[S],
    ) -> Result<BuildConfig> {
        let contents = fs::read_to_string(cache_file)
            .map_err(|e| CoverageError::fs("read build cache", cache_file, e))?;

        let config = self.resolve_str(&contents, cache_file, required)?;
        tracing::debug!("Resolved {} build settings from {}", config.len(), cache_file);
        Ok(config)
    }
}

impl Default for BuildConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve `required` from the cache file at `cache_file`.
pub fn resolve_build_config<S: AsRef<str>>(
    cache_file: &Utf8Path,
    required: &[S],
) -> Result<BuildConfig> {
    BuildConfigResolver::new().resolve_file(cache_file, required)
}
