//! Backup configuration loaded from TOML at startup.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

use crate::core::invariants::validate_volumes;
use crate::core::naming::{ArchiveNaming, has_timestamp_placeholder};
use crate::core::retention::RetentionPolicy;
use crate::core::volume::{SnapshotHandle, Volume};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/snapborg/snapborg.toml";

/// Backup configuration (TOML).
///
/// Built once, validated, then passed by reference to every component.
/// Missing fields take the defaults below; `volumes` has no default and must
/// list at least one logical volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Borg repository path (or URL).
    pub repository: PathBuf,

    /// File holding only the repository passphrase. Relative paths resolve
    /// against the directory of the config file.
    pub passphrase_file: PathBuf,

    /// Directory under which snapshots are mounted.
    pub mount_base: PathBuf,

    /// Appended to the LV name to name its snapshot.
    pub snapshot_suffix: String,

    pub archive_prefix: String,

    /// Must contain a borg timestamp placeholder such as `{now}`.
    pub archive_postfix: String,

    /// Exclusion patterns; absolute ones are rooted at the snapshot mount.
    pub exclude: Vec<String>,

    /// Log command lines without executing anything.
    pub dry_run: bool,

    /// Kill an external command after this many seconds. 0 waits forever.
    pub command_timeout_secs: u64,

    /// Keep at most this many bytes of each command's output.
    pub output_limit_bytes: usize,

    pub volumes: Vec<Volume>,
    pub retention: RetentionPolicy,
    pub tools: ToolsConfig,
    pub log: LogConfig,
}

/// Program names for the external commands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub borg: String,
    pub lvcreate: String,
    pub lvremove: String,
    pub mount: String,
    pub umount: String,
    pub mkdir: String,
    pub rmdir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Level filter (`error`..`trace`); `RUST_LOG` takes precedence.
    pub level: String,
    /// Size-rotated log file. Omit to log to stdout only.
    pub file: Option<PathBuf>,
    /// Rotate once the file would grow past this many bytes.
    pub max_bytes: u64,
    /// Rotated files kept (`<file>.1` .. `<file>.N`). 0 disables rotation.
    pub max_files: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            borg: "borg".to_string(),
            lvcreate: "lvcreate".to_string(),
            lvremove: "lvremove".to_string(),
            mount: "mount".to_string(),
            umount: "umount".to_string(),
            mkdir: "mkdir".to_string(),
            rmdir: "rmdir".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some(PathBuf::from("/var/log/snapborg.log")),
            max_bytes: 5 * 1024 * 1024,
            max_files: 2,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repository: PathBuf::from("/var/borg/repo.borg"),
            passphrase_file: PathBuf::from(".borg-passphrase"),
            mount_base: PathBuf::from("/"),
            snapshot_suffix: "-jxy".to_string(),
            archive_prefix: "{hostname}-".to_string(),
            archive_postfix: "-{now}".to_string(),
            exclude: [
                "/tmp",
                "/var/cache",
                "/var/tmp",
                "/swap.img",
                "/root/.cache",
                "/home/*/.cache",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            dry_run: false,
            command_timeout_secs: 0,
            output_limit_bytes: 1_000_000,
            volumes: Vec::new(),
            retention: RetentionPolicy::default(),
            tools: ToolsConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Check every field, reporting all violations at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors = validate_volumes(&self.volumes);

        if self.repository.as_os_str().is_empty() {
            errors.push("repository must not be empty".to_string());
        }
        if self.passphrase_file.as_os_str().is_empty() {
            errors.push("passphrase_file must not be empty".to_string());
        }
        if !self.mount_base.is_absolute() {
            errors.push(format!(
                "mount_base {} must be absolute",
                self.mount_base.display()
            ));
        }
        if self.snapshot_suffix.is_empty() {
            errors.push("snapshot_suffix must not be empty".to_string());
        }
        if !has_timestamp_placeholder(&self.archive_postfix) {
            errors.push(format!(
                "archive_postfix '{}' must contain a timestamp placeholder such as {{now}}",
                self.archive_postfix
            ));
        }
        if self.output_limit_bytes == 0 {
            errors.push("output_limit_bytes must be > 0".to_string());
        }
        if self.log.level.parse::<LevelFilter>().is_err() {
            errors.push(format!("log.level '{}' is not a valid level", self.log.level));
        }
        if self.log.max_bytes == 0 {
            errors.push("log.max_bytes must be > 0".to_string());
        }
        for (name, program) in self.tools.entries() {
            if program.trim().is_empty() {
                errors.push(format!("tools.{name} must not be empty"));
            }
        }

        if !errors.is_empty() {
            return Err(anyhow!("invalid configuration:\n- {}", errors.join("\n- ")));
        }
        Ok(())
    }

    pub fn naming(&self) -> ArchiveNaming<'_> {
        ArchiveNaming {
            prefix: &self.archive_prefix,
            postfix: &self.archive_postfix,
        }
    }

    pub fn snapshot_handle(&self, volume: &Volume) -> Result<SnapshotHandle> {
        SnapshotHandle::derive(volume, &self.snapshot_suffix, &self.mount_base)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_secs > 0).then(|| Duration::from_secs(self.command_timeout_secs))
    }
}

impl ToolsConfig {
    fn entries(&self) -> [(&'static str, &str); 7] {
        [
            ("borg", &self.borg),
            ("lvcreate", &self.lvcreate),
            ("lvremove", &self.lvremove),
            ("mount", &self.mount),
            ("umount", &self.umount),
            ("mkdir", &self.mkdir),
            ("rmdir", &self.rmdir),
        ]
    }
}

/// Load and validate config from a TOML file.
///
/// A relative `passphrase_file` is resolved against the config file's directory.
pub fn load_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut cfg: Config =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    if cfg.passphrase_file.is_relative() {
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        cfg.passphrase_file = base.join(&cfg.passphrase_file);
    }
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
