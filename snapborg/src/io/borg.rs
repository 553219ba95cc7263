//! Borg adapter: base invocations carrying the repository passphrase.

use std::path::{Path, PathBuf};

use crate::io::command::CommandSpec;
use crate::io::config::Config;
use crate::io::passphrase::Passphrase;

pub const PASSPHRASE_ENV: &str = "BORG_PASSPHRASE";

/// Builds `borg <subcommand>` specs for one repository.
#[derive(Debug, Clone)]
pub struct Borg {
    program: String,
    repository: PathBuf,
    passphrase: Passphrase,
}

impl Borg {
    pub fn new(config: &Config, passphrase: Passphrase) -> Self {
        Self {
            program: config.tools.borg.clone(),
            repository: config.repository.clone(),
            passphrase,
        }
    }

    pub fn repository(&self) -> &Path {
        &self.repository
    }

    /// `borg <subcommand>` with the passphrase in the child environment.
    pub fn command(&self, subcommand: &str) -> CommandSpec {
        CommandSpec::new(&self.program)
            .arg(subcommand)
            .secret_env(PASSPHRASE_ENV, self.passphrase.clone())
    }

    pub fn repository_arg(&self) -> String {
        self.repository.to_string_lossy().into_owned()
    }
}
