use crate::error::{Result, Step};
use crate::models::{CoverageSettings, DemoUnit, PipelinePaths};
use crate::services::runner::{run_checked, CommandRunner, Invocation};
use camino::Utf8PathBuf;

/// Drives the native build system: one configure per run, then clean + build-and-run per demo
///
/// Every command runs in the build directory. A non-zero exit from any of them ends the
/// run; nothing is retried.
pub struct BuildInvoker<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    settings: &'a CoverageSettings,
    project_dir: Utf8PathBuf,
    build_dir: Utf8PathBuf,
}

impl<'a, R: CommandRunner + ?Sized> BuildInvoker<'a, R> {
    pub fn new(runner: &'a R, settings: &'a CoverageSettings, paths: &PipelinePaths) -> Self {
        Self {
            runner,
            settings,
            project_dir: paths.project_dir.clone(),
            build_dir: paths.build_dir.clone(),
        }
    }

    /// `cmake <project> -DBUILD_PLATFORM=.. -DOPT_LEVEL=.. -DCOVERAGE=ON [extra]`
    pub fn configure_command(&self) -> Result<Invocation> {
        Ok(
            Invocation::from_tool(Step::Configure, &self.settings.tools.configure, &self.build_dir)?
                .arg(self.project_dir.as_str())
                .arg(format!("-DBUILD_PLATFORM={}", self.settings.platform))
                .arg(format!("-DOPT_LEVEL={}", self.settings.opt_level))
                .arg("-DCOVERAGE=ON")
                .args(self.settings.configure_args.iter().cloned()),
        )
    }

    pub fn clean_command(&self) -> Result<Invocation> {
        Ok(
            Invocation::from_tool(Step::Clean, &self.settings.tools.build, &self.build_dir)?
                .arg("clean"),
        )
    }

    pub fn build_and_run_command(&self, demo: &DemoUnit) -> Result<Invocation> {
        Ok(
            Invocation::from_tool(Step::BuildAndRun, &self.settings.tools.build, &self.build_dir)?
                .arg(demo.target_name(&self.settings.run_target_prefix)),
        )
    }

    /// Configure the build tree for an instrumented build of the configured platform.
    pub async fn configure(&self) -> Result<()> {
        tracing::info!(
            "Configuring {} build (platform={}, opt={}, coverage=ON)",
            self.build_dir,
            self.settings.platform,
            self.settings.opt_level
        );
        run_checked(self.runner, &self.configure_command()?).await
    }

    pub async fn clean(&self) -> Result<()> {
        run_checked(self.runner, &self.clean_command()?).await
    }

    /// Build the demo's run target, which also executes the demo.
    pub async fn build_and_run(&self, demo: &DemoUnit) -> Result<()> {
        tracing::info!("Building and running demo {}", demo);
        run_checked(self.runner, &self.build_and_run_command(demo)?).await
    }

    /// Clean, then build and run `demo`.
    pub async fn cycle(&self, demo: &DemoUnit) -> Result<()> {
        self.clean().await?;
        self.build_and_run(demo).await
    }
}
