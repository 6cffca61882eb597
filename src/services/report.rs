use crate::error::{CoverageError, Result, Step};
use crate::models::{ArtifactDirectory, CoverageSettings, PipelinePaths};
use crate::services::runner::{run_checked, CommandRunner, Invocation};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Page the renderer writes at the top of the report directory
pub const REPORT_ENTRY_POINT: &str = "index.html";

/// Merges per-demo coverage into one dataset, renders it, and opens the result
pub struct Reporter<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    settings: &'a CoverageSettings,
    project_dir: Utf8PathBuf,
    merged_file: Utf8PathBuf,
    report_dir: Utf8PathBuf,
}

impl<'a, R: CommandRunner + ?Sized> Reporter<'a, R> {
    pub fn new(runner: &'a R, settings: &'a CoverageSettings, paths: &PipelinePaths) -> Self {
        Self {
            runner,
            settings,
            project_dir: paths.project_dir.clone(),
            merged_file: paths.merged_file.clone(),
            report_dir: paths.report_dir.clone(),
        }
    }

    pub fn entry_point(&self) -> Utf8PathBuf {
        self.report_dir.join(REPORT_ENTRY_POINT)
    }

    /// `lcov -c -d <dir>... --output-file <merged>`
    pub fn aggregate_command(&self, dirs: &[ArtifactDirectory]) -> Result<Invocation> {
        let mut cmd =
            Invocation::from_tool(Step::Aggregate, &self.settings.tools.aggregate, &self.project_dir)?
                .arg("-c");
        for dir in dirs {
            cmd = cmd.arg("-d").arg(dir.path().as_str());
        }
        Ok(cmd.arg("--output-file").arg(self.merged_file.as_str()))
    }

    /// `genhtml <merged> --output-directory <report>`
    pub fn render_command(&self) -> Result<Invocation> {
        Ok(
            Invocation::from_tool(Step::Render, &self.settings.tools.render, &self.project_dir)?
                .arg(self.merged_file.as_str())
                .arg("--output-directory")
                .arg(self.report_dir.as_str()),
        )
    }

    /// Viewer command for `entry`; falls back to the platform's default opener.
    pub fn present_command(&self, entry: &Utf8Path) -> Result<Invocation> {
        let cmd = match &self.settings.tools.viewer {
            Some(viewer) => Invocation::from_tool(Step::Present, viewer, &self.project_dir)?,
            None => Invocation::from_tool(Step::Present, &default_opener(), &self.project_dir)?,
        };
        Ok(cmd.arg(entry.as_str()))
    }

    /// Remove the merged dataset and rendered report of a previous run, so a failed run
    /// never leaves an older report looking current.
    pub fn clear_previous(&self) -> Result<()> {
        if self.merged_file.is_file() {
            fs::remove_file(&self.merged_file)
                .map_err(|e| CoverageError::fs("remove merged coverage", &self.merged_file, e))?;
        }
        if self.report_dir.exists() {
            fs::remove_dir_all(&self.report_dir)
                .map_err(|e| CoverageError::fs("remove report", &self.report_dir, e))?;
        }
        Ok(())
    }

    /// Merge every artifact directory into the single coverage dataset.
    pub async fn aggregate(&self, dirs: &[ArtifactDirectory]) -> Result<Utf8PathBuf> {
        tracing::info!(
            "Aggregating coverage from {} demos into {}",
            dirs.len(),
            self.merged_file
        );
        run_checked(self.runner, &self.aggregate_command(dirs)?).await?;
        Ok(self.merged_file.clone())
    }

    /// Render the merged dataset; returns the report's entry point.
    pub async fn render(&self) -> Result<Utf8PathBuf> {
        tracing::info!("Rendering coverage report into {}", self.report_dir);
        run_checked(self.runner, &self.render_command()?).await?;

        let entry = self.entry_point();
        if !entry.is_file() {
            return Err(CoverageError::ReportMissing(entry));
        }
        Ok(entry)
    }

    /// Open `entry` in the viewer.
    ///
    /// The report is complete at this point, so a viewer that fails to start is
    /// logged rather than failing the run.
    pub fn present(&self, entry: &Utf8Path) -> Result<()> {
        let cmd = self.present_command(entry)?;
        if let Err(e) = self.runner.spawn_detached(&cmd) {
            tracing::warn!("Could not open the coverage report: {}", e);
        }
        Ok(())
    }
}

fn default_opener() -> Vec<String> {
    let parts: &[&str] = if cfg!(target_os = "windows") {
        &["cmd", "/C", "start", ""]
    } else if cfg!(target_os = "macos") {
        &["open"]
    } else {
        &["xdg-open"]
    };
    parts.iter().map(|s| s.to_string()).collect()
}
