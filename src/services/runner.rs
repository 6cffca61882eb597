use crate::error::{CoverageError, Result, Step};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

/// A fully specified external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub step: Step,
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; commands never rely on the process's own cwd
    pub cwd: Utf8PathBuf,
}

impl Invocation {
    /// Build an invocation from a configured tool (program plus leading args).
    pub fn from_tool(step: Step, tool: &[String], cwd: &Utf8Path) -> Result<Self> {
        let (program, leading) = tool.split_first().ok_or_else(|| {
            CoverageError::InvalidSettings(format!("no program configured for the {} step", step))
        })?;

        Ok(Self {
            step,
            program: program.clone(),
            args: leading.to_vec(),
            cwd: cwd.to_path_buf(),
        })
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Whether any argument equals `arg`
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// The argument following `flag`, if any
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Runs external commands for the pipeline
///
/// `run` must not return before the child has exited; the pipeline relies on every
/// step being finished before the next one starts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` to completion and return its exit code (-1 if killed by a signal).
    async fn run(&self, invocation: &Invocation) -> Result<i32>;

    /// Start `invocation` without waiting for it.
    fn spawn_detached(&self, invocation: &Invocation) -> Result<()>;
}

/// Run `invocation` and turn a non-zero exit into [`CoverageError::CommandFailed`].
pub async fn run_checked<R: CommandRunner + ?Sized>(runner: &R, invocation: &Invocation) -> Result<()> {
    let code = runner.run(invocation).await?;
    if code != 0 {
        tracing::error!("{} step failed: `{}` exited with {}", invocation.step, invocation, code);
        return Err(CoverageError::CommandFailed {
            step: invocation.step,
            command: invocation.to_string(),
            code,
        });
    }
    Ok(())
}

/// [`CommandRunner`] backed by `tokio::process`
///
/// Child stdout/stderr are inherited so build and test output stays visible.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn command(invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(invocation.cwd.as_std_path());
        cmd
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<i32> {
        tracing::info!("Executing: {} (in {})", invocation, invocation.cwd);

        let start = Instant::now();

        let mut cmd = Self::command(invocation);
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| CoverageError::Spawn {
            step: invocation.step,
            command: invocation.to_string(),
            source,
        })?;

        let waited = match self.timeout {
            Some(limit) => timeout(limit, child.wait()).await.map_err(|_| {
                tracing::warn!("`{}` timed out after {:?}", invocation, limit);
                CoverageError::Timeout {
                    step: invocation.step,
                    command: invocation.to_string(),
                    after: limit,
                }
            })?,
            None => child.wait().await,
        };

        let status = waited.map_err(|source| CoverageError::Spawn {
            step: invocation.step,
            command: invocation.to_string(),
            source,
        })?;

        let exit_code = status.code().unwrap_or(-1);

        tracing::info!(
            "{} completed in {:.2}s with exit code {}",
            invocation.step,
            start.elapsed().as_secs_f32(),
            exit_code
        );

        Ok(exit_code)
    }

    fn spawn_detached(&self, invocation: &Invocation) -> Result<()> {
        tracing::info!("Launching: {}", invocation);

        Self::command(invocation)
            .spawn()
            .map(|_child| ())
            .map_err(|source| CoverageError::Spawn {
                step: invocation.step,
                command: invocation.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_invocation_from_tool() {
        let inv = Invocation::from_tool(Step::Clean, &tool(&["make", "-j4"]), Utf8Path::new("/b"))
            .unwrap()
            .arg("clean");

        assert_eq!(inv.program, "make");
        assert_eq!(inv.args, vec!["-j4", "clean"]);
        assert_eq!(inv.cwd, Utf8PathBuf::from("/b"));
        assert_eq!(inv.to_string(), "make -j4 clean");
    }

    #[test]
    fn test_invocation_from_empty_tool() {
        let err = Invocation::from_tool(Step::Render, &[], Utf8Path::new("/b")).unwrap_err();
        assert!(matches!(err, CoverageError::InvalidSettings(_)));
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let inv = Invocation::from_tool(Step::Aggregate, &tool(&["lcov"]), Utf8Path::new("/"))
            .unwrap()
            .args(["-d", "/my dir"]);
        assert_eq!(inv.to_string(), "lcov -d \"/my dir\"");
        assert_eq!(inv.arg_after("-d"), Some("/my dir"));
        assert!(inv.has_arg("-d"));
        assert!(!inv.has_arg("-c"));
    }

    #[tokio::test]
    async fn test_run_checked_maps_nonzero_exit() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_| Ok(2));

        let inv = Invocation::from_tool(Step::Clean, &tool(&["make"]), Utf8Path::new("/b"))
            .unwrap()
            .arg("clean");
        let err = run_checked(&runner, &inv).await.unwrap_err();

        match err {
            CoverageError::CommandFailed { step, command, code } => {
                assert_eq!(step, Step::Clean);
                assert_eq!(command, "make clean");
                assert_eq!(code, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_exit_codes() {
        let runner = ProcessRunner::new(None);
        let cwd = Utf8PathBuf::try_from(std::env::temp_dir()).unwrap();

        let ok = Invocation::from_tool(Step::Clean, &tool(&["sh", "-c", "exit 0"]), &cwd).unwrap();
        assert_eq!(runner.run(&ok).await.unwrap(), 0);

        let failing =
            Invocation::from_tool(Step::Clean, &tool(&["sh", "-c", "exit 3"]), &cwd).unwrap();
        assert_eq!(runner.run(&failing).await.unwrap(), 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_timeout() {
        let runner = ProcessRunner::new(Some(Duration::from_millis(100)));
        let cwd = Utf8PathBuf::try_from(std::env::temp_dir()).unwrap();

        let slow = Invocation::from_tool(Step::BuildAndRun, &tool(&["sleep", "5"]), &cwd).unwrap();
        let err = runner.run(&slow).await.unwrap_err();
        assert!(matches!(err, CoverageError::Timeout { step: Step::BuildAndRun, .. }));
    }

    #[tokio::test]
    async fn test_process_runner_missing_program() {
        let runner = ProcessRunner::default();
        let cwd = Utf8PathBuf::try_from(std::env::temp_dir()).unwrap();

        let missing = Invocation::from_tool(
            Step::Configure,
            &tool(&["democov-definitely-not-a-real-program"]),
            &cwd,
        )
        .unwrap();
        let err = runner.run(&missing).await.unwrap_err();
        assert!(matches!(err, CoverageError::Spawn { step: Step::Configure, .. }));
    }
}
