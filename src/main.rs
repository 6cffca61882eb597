//! democov - per-demo coverage collection for CMake demo suites
//!
//! Main entry point for the command-line application.
//!
//! # Execution Flow
//!
//! 1. Parse arguments and resolve the project directory
//! 2. Load settings (defaults → `democov.yaml` → `DEMOCOV_*` environment)
//! 3. Initialize logging → `<log_dir>/democov.<date>`
//! 4. Create a current-thread tokio runtime (every step runs one after another)
//! 5. Dispatch the subcommand
//!
//! Any error is reported with its context chain and the process exits non-zero.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use democov::cli::{Cli, Commands};
use democov::services::resolve_build_config;
use democov::{
    APP_NAME, ConfigManager, CoveragePipeline, CoverageSettings, ProcessRunner, RunOptions,
    VERSION,
};
use std::fs;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_dir = resolve_project_dir(&cli.project)?;

    let mut config_manager = ConfigManager::new(&project_dir)?;
    if let Some(path) = &cli.settings {
        config_manager = config_manager.with_settings_path(path);
    }

    if let Commands::Init { force } = cli.command {
        config_manager.write_default_settings(force)?;
        println!("Wrote default settings to {}", config_manager.settings_path());
        return Ok(());
    }

    let mut settings = config_manager.load_settings()?;
    if let Some(platform) = cli.command.platform() {
        settings.platform = platform.to_string();
    }

    let paths = settings.resolve_paths(&project_dir);
    let _guard = democov::logging::setup_logging(&paths.log_dir, APP_NAME, cli.verbose, true)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    // Settings were loaded before the subscriber was installed
    tracing::info!(
        "Settings: {} (platform={}, project={})",
        config_manager.settings_source(),
        settings.platform,
        project_dir
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let result = match cli.command {
        Commands::Run { demos, no_open, .. } => {
            let options = RunOptions {
                only: demos,
                no_open,
            };
            runtime.block_on(run(settings, &project_dir, &options))
        }
        Commands::Discover { .. } => discover(settings, &project_dir),
        Commands::BuildConfig { cache, require } => {
            let cache_file = match cache {
                Some(cache) => project_dir.join(cache),
                None => paths.cache_file.clone(),
            };
            build_config(&settings, &cache_file, &require)
        }
        Commands::Init { .. } => Ok(()),
    };

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }
    result
}

fn resolve_project_dir(project: &Utf8Path) -> Result<Utf8PathBuf> {
    let absolute = fs::canonicalize(project)
        .with_context(|| format!("Project directory not found: {}", project))?;
    Utf8PathBuf::try_from(absolute).context("Project directory is not valid UTF-8")
}

async fn run(settings: CoverageSettings, project_dir: &Utf8Path, options: &RunOptions) -> Result<()> {
    let runner = ProcessRunner::new(settings.command_timeout());
    let pipeline = CoveragePipeline::new(runner, settings, project_dir)?;

    let report = pipeline.run(options).await?;

    for outcome in &report.demos {
        println!(
            "{:<24} {:>4} files  {:>8.1}s  {}",
            outcome.artifacts.demo.name(),
            outcome.files_collected,
            outcome.duration.as_secs_f64(),
            outcome.artifacts.path()
        );
    }
    println!("Merged coverage: {}", report.merged_file);
    println!("Report: {}", report.entry_point);
    Ok(())
}

fn discover(settings: CoverageSettings, project_dir: &Utf8Path) -> Result<()> {
    let platform = settings.platform.clone();
    let pipeline = CoveragePipeline::new(ProcessRunner::default(), settings, project_dir)?;

    let excluded = pipeline.exclusion_set()?;
    let demos = pipeline.discover()?;

    println!("Platform: {}", platform);
    println!("Excluded: {}", join_names(excluded.iter()));
    for demo in &demos {
        println!("  {}", demo);
    }
    println!("{} demo(s) in {}", demos.len(), pipeline.paths().demo_dir);
    Ok(())
}

fn build_config(settings: &CoverageSettings, cache_file: &Utf8Path, require: &[String]) -> Result<()> {
    let required = if require.is_empty() {
        settings.required_settings.as_slice()
    } else {
        require
    };

    let config = resolve_build_config(cache_file, required)?;
    for (name, value) in config.iter() {
        println!("{}={}", name, value);
    }

    if let Some(suite) = config.suite_name() {
        println!("Suite: {}", suite);
    }

    // Exclusions follow the platform the tree was configured for, not the settings file
    if let Some(platform) = config.platform() {
        let excluded = settings.exclusions.exclusion_set(platform)?;
        println!("Excluded on {}: {}", platform, join_names(excluded.iter()));
    }
    Ok(())
}

fn join_names<'a>(names: impl Iterator<Item = &'a String>) -> String {
    let joined = names.map(String::as_str).collect::<Vec<_>>().join(", ");
    if joined.is_empty() { "(none)".to_string() } else { joined }
}
