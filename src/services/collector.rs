//! Moves coverage files out of the build tree after each demo cycle.
//!
//! gcov writes `.gcno` at compile time and `.gcda` when the instrumented program exits,
//! all inside the build tree. Because files are moved rather than copied, the tree is
//! empty of coverage files once a demo has been collected, so the next demo's cycle
//! starts clean.

use crate::error::{CoverageError, Result};
use crate::models::{ArtifactDirectory, DemoUnit};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use walkdir::WalkDir;

/// Locates and drains coverage artifacts from the build tree
#[derive(Debug, Clone)]
pub struct ArtifactCollector {
    search_root: Utf8PathBuf,
    /// Suffixes including the dot, e.g. `.gcda`
    suffixes: Vec<String>,
    /// Never searched, so collected artifacts are not picked up again
    skip_dir: Option<Utf8PathBuf>,
}

impl ArtifactCollector {
    /// # Arguments
    /// * `search_root` - Build-tree directory walked for coverage files
    /// * `extensions` - Coverage file extensions without the dot (e.g. `gcda`, `gcno`)
    pub fn new<S: AsRef<str>>(search_root: &Utf8Path, extensions: &[S]) -> Self {
        Self {
            search_root: search_root.to_path_buf(),
            suffixes: extensions
                .iter()
                .map(|ext| format!(".{}", ext.as_ref()))
                .collect(),
            skip_dir: None,
        }
    }

    /// Exclude `dir` (normally the artifact root) from the search.
    pub fn skipping(mut self, dir: &Utf8Path) -> Self {
        self.skip_dir = Some(dir.to_path_buf());
        self
    }

    pub fn is_artifact(&self, file_name: &str) -> bool {
        self.suffixes.iter().any(|suffix| file_name.ends_with(suffix.as_str()))
    }

    /// Every coverage file currently in the build tree.
    pub fn find_artifacts(&self) -> Result<Vec<Utf8PathBuf>> {
        if !self.search_root.exists() {
            tracing::debug!("Artifact search root {} does not exist yet", self.search_root);
            return Ok(Vec::new());
        }

        let skip_dir = self.skip_dir.as_deref();
        let mut found = Vec::new();

        let walker = WalkDir::new(&self.search_root)
            .into_iter()
            .filter_entry(|entry| {
                skip_dir.is_none_or(|skip| entry.path() != skip.as_std_path())
            });

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .and_then(Utf8Path::from_path)
                    .unwrap_or(&self.search_root)
                    .to_path_buf();
                CoverageError::fs("walk", path, e.into())
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(path) = Utf8Path::from_path(entry.path()) else {
                tracing::warn!("Skipping non UTF-8 path {:?}", entry.path());
                continue;
            };

            if path.file_name().is_some_and(|name| self.is_artifact(name)) {
                found.push(path.to_path_buf());
            }
        }

        found.sort();
        Ok(found)
    }

    /// Move every coverage file in the build tree into `target`.
    ///
    /// Files keep their own names. Two files with the same name would make one demo's
    /// data overwrite another's, so a name collision is an error.
    ///
    /// # Returns
    /// The number of files moved
    pub fn collect(&self, target: &ArtifactDirectory) -> Result<usize> {
        let target_dir = target.path();
        if !target_dir.is_dir() {
            return Err(CoverageError::MissingArtifactDir(target_dir.to_path_buf()));
        }

        let artifacts = self.find_artifacts()?;

        for source in &artifacts {
            let Some(file_name) = source.file_name() else {
                continue;
            };
            let destination = target_dir.join(file_name);

            if destination.exists() {
                return Err(CoverageError::ArtifactCollision(destination));
            }

            move_file(source, &destination)?;
            tracing::debug!("Moved {} -> {}", source, destination);
        }

        tracing::info!(
            "Collected {} coverage files for {} into {}",
            artifacts.len(),
            target.demo,
            target_dir
        );

        Ok(artifacts.len())
    }

    /// Delete coverage files left behind by earlier builds.
    ///
    /// # Returns
    /// The number of files removed
    pub fn purge_stale(&self) -> Result<usize> {
        let stale = self.find_artifacts()?;

        for path in &stale {
            fs::remove_file(path).map_err(|e| CoverageError::fs("remove stale artifact", path, e))?;
        }

        if !stale.is_empty() {
            tracing::warn!(
                "Removed {} stale coverage files from {}",
                stale.len(),
                self.search_root
            );
        }

        Ok(stale.len())
    }
}

/// Rename, falling back to copy + remove when the rename crosses filesystems.
fn move_file(source: &Utf8Path, destination: &Utf8Path) -> Result<()> {
    if fs::rename(source, destination).is_ok() {
        return Ok(());
    }

    fs::copy(source, destination).map_err(|e| CoverageError::fs("copy artifact", source, e))?;
    fs::remove_file(source).map_err(|e| CoverageError::fs("remove artifact", source, e))?;
    Ok(())
}

/// The per-run artifact root with one directory per demo
#[derive(Debug, Clone)]
pub struct ArtifactRoot {
    root: Utf8PathBuf,
}

impl ArtifactRoot {
    pub fn new(root: &Utf8Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.root
    }

    pub fn directory_for(&self, demo: &DemoUnit) -> ArtifactDirectory {
        ArtifactDirectory {
            demo: demo.clone(),
            path: self.root.join(demo.artifact_dir_name()),
        }
    }

    /// Destroy the root (and anything a previous run left in it), then recreate it with
    /// an empty directory for each demo.
    pub fn prepare(&self, demos: &[DemoUnit]) -> Result<Vec<ArtifactDirectory>> {
        if self.root.exists() {
            tracing::info!("Removing previous coverage output {}", self.root);
            fs::remove_dir_all(&self.root)
                .map_err(|e| CoverageError::fs("remove artifact root", &self.root, e))?;
        }

        fs::create_dir_all(&self.root)
            .map_err(|e| CoverageError::fs("create artifact root", &self.root, e))?;

        demos
            .iter()
            .map(|demo| {
                let dir = self.directory_for(demo);
                fs::create_dir(dir.path())
                    .map_err(|e| CoverageError::fs("create artifact directory", dir.path(), e))?;
                Ok(dir)
            })
            .collect()
    }
}
