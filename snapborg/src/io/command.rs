//! Structured external commands and the runner that executes them.
//!
//! Every external call in a backup goes through [`CommandRunner`]. Commands
//! are built as program plus argument list, never as shell strings. Tests use
//! a recording runner that returns scripted outcomes without spawning.

use std::fmt;
use std::process::Command;
use std::time::Duration;

use anyhow::Result;
use thiserror::Error;
use tracing::{error, info};

use crate::io::config::Config;
use crate::io::passphrase::Passphrase;
use crate::io::process::run_process;

/// One external command: program, ordered arguments, secret environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Variables added to the child's environment only. Values are not logged.
    pub secret_env: Vec<(String, Passphrase)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            secret_env: Vec::new(),
        }
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

    pub fn secret_env(mut self, key: impl Into<String>, value: Passphrase) -> Self {
        self.secret_env.push((key.into(), value));
        self
    }

    /// Space-joined command line for logs and assertions.
    pub fn command_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Per-call error policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Return an error on non-zero exit instead of continuing.
    pub check: bool,
    /// Log exit code and output at info level even on success.
    pub log_output: bool,
}

impl RunOptions {
    pub const CHECKED: Self = Self {
        check: true,
        log_output: false,
    };
    /// Failures are logged and execution continues. Teardown only.
    pub const BEST_EFFORT: Self = Self {
        check: false,
        log_output: false,
    };
    /// Output is logged even on success; failures do not stop the run.
    pub const REPORT: Self = Self {
        check: false,
        log_output: true,
    };
}

/// What happened to one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// False when dry-run skipped execution.
    pub executed: bool,
    pub success: bool,
    pub code: Option<i32>,
    pub output: String,
}

impl CommandOutcome {
    pub fn skipped() -> Self {
        Self {
            executed: false,
            success: true,
            code: None,
            output: String::new(),
        }
    }

    pub fn exited(code: Option<i32>, output: String) -> Self {
        Self {
            executed: true,
            success: code == Some(0),
            code,
            output,
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("`{command}` exited with status {}", display_code(.code))]
    Failed {
        command: String,
        code: Option<i32>,
        output: String,
    },
    #[error("`{command}` timed out after {}s", .after.as_secs())]
    TimedOut { command: String, after: Duration },
    #[error("`{command}` could not be started: {reason}")]
    Spawn { command: String, reason: String },
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none (killed by signal)".to_string(), |c| c.to_string())
}

/// Executes command specs synchronously.
pub trait CommandRunner {
    fn run(&self, spec: &CommandSpec, options: RunOptions) -> Result<CommandOutcome>;
}

/// Apply the error policy to a finished command.
///
/// Non-zero exits are always logged at error level. With `check` the failure
/// becomes a [`CommandError::Failed`]; otherwise the outcome is returned so the
/// caller can carry on.
pub fn settle(
    spec: &CommandSpec,
    options: RunOptions,
    outcome: CommandOutcome,
) -> Result<CommandOutcome> {
    if !outcome.success {
        error!(command = %spec, "command failed");
        error!(exit_code = %display_code(&outcome.code), "command exit code");
        error!(output = %outcome.output, "command output");
        if options.check {
            return Err(CommandError::Failed {
                command: spec.command_line(),
                code: outcome.code,
                output: outcome.output,
            }
            .into());
        }
    }
    if options.log_output {
        info!(
            exit_code = %display_code(&outcome.code),
            "command output:\n{}",
            outcome.output
        );
    }
    Ok(outcome)
}

/// Runner backed by real child processes.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    pub dry_run: bool,
    pub timeout: Option<Duration>,
    pub output_limit_bytes: usize,
}

impl SystemRunner {
    pub fn from_config(config: &Config) -> Self {
        Self {
            dry_run: config.dry_run,
            timeout: config.command_timeout(),
            output_limit_bytes: config.output_limit_bytes,
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec, options: RunOptions) -> Result<CommandOutcome> {
        info!(command = %spec, "running command");
        if self.dry_run {
            info!("dry run, command not executed");
            return Ok(CommandOutcome::skipped());
        }

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        for (key, value) in &spec.secret_env {
            cmd.env(key, value.expose());
        }

        let output = match run_process(cmd, self.timeout, self.output_limit_bytes) {
            Ok(output) => output,
            Err(err) => {
                let reason = format!("{err:#}");
                error!(command = %spec, reason = %reason, "command could not be started");
                if options.check {
                    return Err(CommandError::Spawn {
                        command: spec.command_line(),
                        reason,
                    }
                    .into());
                }
                return Ok(CommandOutcome::exited(None, reason));
            }
        };

        if output.timed_out {
            let after = self.timeout.unwrap_or_default();
            error!(command = %spec, timeout_secs = after.as_secs(), "command timed out");
            if options.check {
                return Err(CommandError::TimedOut {
                    command: spec.command_line(),
                    after,
                }
                .into());
            }
            return Ok(CommandOutcome::exited(None, output.output_lossy()));
        }

        let outcome = CommandOutcome::exited(output.status.code(), output.output_lossy());
        settle(spec, options, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> SystemRunner {
        SystemRunner {
            dry_run: false,
            timeout: None,
            output_limit_bytes: 10_000,
        }
    }

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let spec = CommandSpec::new("borg").args(["info", "--last", "2", "/var/borg/my repo"]);
        assert_eq!(spec.to_string(), "borg info --last 2 \"/var/borg/my repo\"");
    }

    #[test]
    fn display_omits_secret_env() {
        let spec =
            CommandSpec::new("borg").secret_env("BORG_PASSPHRASE", Passphrase::new("s3cret"));
        assert!(!spec.to_string().contains("s3cret"));
        assert!(!format!("{spec:?}").contains("s3cret"));
    }

    #[test]
    fn checked_failure_is_error() {
        let err = runner()
            .run(&sh("echo boom; exit 4"), RunOptions::CHECKED)
            .expect_err("should fail");
        match err.downcast_ref::<CommandError>() {
            Some(CommandError::Failed { code, output, .. }) => {
                assert_eq!(*code, Some(4));
                assert!(output.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn best_effort_failure_continues() {
        let outcome = runner()
            .run(&sh("exit 2"), RunOptions::BEST_EFFORT)
            .expect("best effort");
        assert!(outcome.executed);
        assert!(!outcome.success);
        assert_eq!(outcome.code, Some(2));
    }

    #[test]
    fn best_effort_spawn_failure_continues() {
        let spec = CommandSpec::new("/nonexistent/snapborg-umount");
        let outcome = runner().run(&spec, RunOptions::BEST_EFFORT).expect("best effort");
        assert!(!outcome.success);
        assert!(runner().run(&spec, RunOptions::CHECKED).is_err());
    }

    #[test]
    fn dry_run_does_not_execute() {
        let temp = tempfile::tempdir().expect("tempdir");
        let marker = temp.path().join("marker");
        let dry = SystemRunner {
            dry_run: true,
            ..runner()
        };
        let outcome = dry
            .run(
                &CommandSpec::new("touch").arg(marker.to_string_lossy()),
                RunOptions::CHECKED,
            )
            .expect("dry run");
        assert!(!outcome.executed);
        assert!(outcome.success);
        assert!(!marker.exists());
    }

    #[test]
    fn secret_env_reaches_child() {
        let spec = sh("test \"$BORG_PASSPHRASE\" = open-sesame")
            .secret_env("BORG_PASSPHRASE", Passphrase::new("open-sesame"));
        let outcome = runner().run(&spec, RunOptions::CHECKED).expect("env visible");
        assert!(outcome.success);
    }

    #[test]
    fn timeout_is_reported() {
        let slow = SystemRunner {
            timeout: Some(Duration::from_millis(100)),
            ..runner()
        };
        let err = slow.run(&sh("sleep 2"), RunOptions::CHECKED).expect_err("timeout");
        assert!(matches!(
            err.downcast_ref::<CommandError>(),
            Some(CommandError::TimedOut { .. })
        ));
    }
}
