//! The coverage run, start to finish.
//!
//! Discover → prepare artifact root → configure → purge stale artifacts →
//! (clean → build/run → collect) per demo → aggregate → render → present.
//!
//! Every step waits for the previous one. Demo cycles never overlap: coverage files from
//! all targets land in the same build tree, and only draining it between demos keeps
//! each demo's files attributable to that demo.

use crate::error::{CoverageError, Result};
use crate::metrics::RunMetrics;
use crate::models::{CoverageReport, CoverageSettings, DemoOutcome, DemoUnit, PipelinePaths};
use crate::services::build::BuildInvoker;
use crate::services::collector::{ArtifactCollector, ArtifactRoot};
use crate::services::discovery::{discover_demos, select_demos};
use crate::services::report::Reporter;
use crate::services::runner::CommandRunner;
use camino::Utf8Path;
use std::collections::BTreeSet;
use std::time::Instant;

/// Per-invocation choices that are not part of the settings file
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Restrict the run to these demos; empty runs every discovered demo
    pub only: Vec<String>,

    /// Skip opening the report even if the settings ask for it
    pub no_open: bool,
}

/// The coverage pipeline over a [`CommandRunner`]
pub struct CoveragePipeline<R: CommandRunner> {
    runner: R,
    settings: CoverageSettings,
    paths: PipelinePaths,
    metrics: RunMetrics,
}

impl<R: CommandRunner> CoveragePipeline<R> {
    /// # Errors
    /// Returns [`CoverageError::InvalidSettings`] if the settings cannot describe a run,
    /// or if a directory the run wipes would overlap the project's inputs.
    pub fn new(runner: R, settings: CoverageSettings, project_dir: &Utf8Path) -> Result<Self> {
        settings.validate()?;
        let paths = settings.resolve_paths(project_dir);
        paths.check_owned_dirs()?;

        Ok(Self {
            runner,
            settings,
            paths,
            metrics: RunMetrics::new(),
        })
    }

    pub fn settings(&self) -> &CoverageSettings {
        &self.settings
    }

    pub fn paths(&self) -> &PipelinePaths {
        &self.paths
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// Demo names excluded on the configured platform.
    pub fn exclusion_set(&self) -> Result<BTreeSet<String>> {
        self.settings.exclusions.exclusion_set(&self.settings.platform)
    }

    /// Demos the configured platform would run.
    pub fn discover(&self) -> Result<Vec<DemoUnit>> {
        discover_demos(
            &self.paths.demo_dir,
            &self.settings.source_suffix,
            &self.exclusion_set()?,
        )
    }

    fn collector(&self) -> ArtifactCollector {
        ArtifactCollector::new(
            &self.paths.artifact_search_dir,
            &self.settings.coverage_extensions,
        )
        .skipping(&self.paths.output_dir)
    }

    /// Run the whole pipeline.
    ///
    /// Stops at the first failure. Whatever was collected before the failure stays in the
    /// artifact root until the next run wipes it; no merged dataset or report is written.
    pub async fn run(&self, options: &RunOptions) -> Result<CoverageReport> {
        tracing::info!(
            "Starting coverage run for platform {} in {}",
            self.settings.platform,
            self.paths.project_dir
        );

        let demos = select_demos(self.discover()?, &options.only)?;
        if demos.is_empty() {
            return Err(CoverageError::NoDemos(self.paths.demo_dir.clone()));
        }

        let reporter = Reporter::new(&self.runner, &self.settings, &self.paths);
        reporter.clear_previous()?;

        let artifact_dirs = ArtifactRoot::new(&self.paths.output_dir).prepare(&demos)?;

        let invoker = BuildInvoker::new(&self.runner, &self.settings, &self.paths);
        invoker.configure().await?;
        self.metrics.record_commands(1);

        let collector = self.collector();
        self.metrics.record_purged(collector.purge_stale()?);

        let mut outcomes = Vec::with_capacity(artifact_dirs.len());

        for (index, dir) in artifact_dirs.iter().enumerate() {
            tracing::info!("[{}/{}] Demo {}", index + 1, artifact_dirs.len(), dir.demo);
            let start = Instant::now();

            invoker.cycle(&dir.demo).await?;
            self.metrics.record_commands(2);

            let files_collected = collector.collect(dir)?;
            if files_collected == 0 {
                tracing::warn!("Demo {} produced no coverage files", dir.demo);
            }

            let duration = start.elapsed();
            self.metrics.record_demo(files_collected, duration);

            outcomes.push(DemoOutcome {
                artifacts: dir.clone(),
                files_collected,
                duration,
            });
        }

        let merged_file = reporter.aggregate(&artifact_dirs).await?;
        self.metrics.record_commands(1);

        let entry_point = reporter.render().await?;
        self.metrics.record_commands(1);

        if self.settings.open_report && !options.no_open {
            reporter.present(&entry_point)?;
        } else {
            tracing::info!("Coverage report written to {}", entry_point);
        }

        self.metrics.log_summary();

        Ok(CoverageReport {
            demos: outcomes,
            merged_file,
            report_dir: self.paths.report_dir.clone(),
            entry_point,
        })
    }
}
