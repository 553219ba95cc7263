//! Test-only helpers: a recording command runner and scratch configs.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::volume::Volume;
use crate::io::borg::Borg;
use crate::io::command::{CommandOutcome, CommandRunner, CommandSpec, RunOptions, settle};
use crate::io::config::{Config, LogConfig};
use crate::io::passphrase::Passphrase;

/// One call seen by [`RecordingRunner`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub spec: CommandSpec,
    pub options: RunOptions,
}

/// Predicate for commands that should exit non-zero.
struct FailRule {
    program: String,
    arg_contains: Option<String>,
}

impl FailRule {
    fn matches(&self, spec: &CommandSpec) -> bool {
        if spec.program != self.program {
            return false;
        }
        match &self.arg_contains {
            Some(needle) => spec.args.iter().any(|arg| arg.contains(needle.as_str())),
            None => true,
        }
    }
}

/// Records every command instead of spawning it.
///
/// Commands succeed unless a fail rule matches, in which case they exit 1 and
/// go through the same error policy as the real runner.
#[derive(Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<RecordedCall>>,
    rules: Vec<FailRule>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every invocation of `program`.
    pub fn fail_program(mut self, program: &str) -> Self {
        self.rules.push(FailRule {
            program: program.to_string(),
            arg_contains: None,
        });
        self
    }

    /// Fail invocations of `program` with an argument containing `needle`.
    pub fn fail_when(mut self, program: &str, needle: &str) -> Self {
        self.rules.push(FailRule {
            program: program.to_string(),
            arg_contains: Some(needle.to_string()),
        });
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    /// Command lines in call order.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|call| call.spec.command_line())
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, spec: &CommandSpec, options: RunOptions) -> Result<CommandOutcome> {
        self.calls.borrow_mut().push(RecordedCall {
            spec: spec.clone(),
            options,
        });
        let outcome = if self.rules.iter().any(|rule| rule.matches(spec)) {
            CommandOutcome::exited(Some(1), format!("{} failed (scripted)", spec.program))
        } else {
            CommandOutcome::exited(Some(0), String::new())
        };
        settle(spec, options, outcome)
    }
}

/// Config with the given volumes, stdout-only logging and default tools.
pub fn config_with_volumes(devices: &[&str]) -> Config {
    Config {
        volumes: devices.iter().map(|device| Volume::new(*device, "ext4")).collect(),
        log: LogConfig {
            file: None,
            ..LogConfig::default()
        },
        ..Config::default()
    }
}

pub fn test_borg(config: &Config) -> Borg {
    Borg::new(config, Passphrase::new("test-passphrase"))
}

/// Scratch directory holding a config file and its passphrase file.
pub struct TestConfigDir {
    dir: TempDir,
    pub config_path: PathBuf,
}

impl TestConfigDir {
    /// Write `body` as `snapborg.toml` plus a `.borg-passphrase` beside it.
    pub fn new(body: &str) -> Result<Self> {
        let dir = tempfile::tempdir().context("create tempdir")?;
        let config_path = dir.path().join("snapborg.toml");
        fs::write(&config_path, body).context("write config")?;
        fs::write(dir.path().join(".borg-passphrase"), "test-passphrase\n")
            .context("write passphrase")?;
        Ok(Self { dir, config_path })
    }

    /// Replace the config body, e.g. once paths inside the dir are known.
    pub fn write_config(&self, body: &str) -> Result<()> {
        fs::write(&self.config_path, body).context("write config")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
