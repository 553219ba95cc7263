//! Archiver: `borg create` of a mounted snapshot.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::exclude::resolve_patterns;
use crate::core::naming::ArchiveNaming;
use crate::io::borg::Borg;
use crate::io::command::{CommandRunner, CommandSpec, RunOptions};

/// Flags passed to every `borg create`.
pub const CREATE_FLAGS: [&str; 10] = [
    "--verbose",
    "--filter",
    "AME",
    "--list",
    "--stats",
    "--show-rc",
    "--compression",
    "lz4",
    "--one-file-system",
    "--exclude-caches",
];

/// Build the `borg create` invocation for `base_name` mounted at `mount_dir`.
pub fn create_command(
    borg: &Borg,
    naming: ArchiveNaming<'_>,
    exclude: &[String],
    base_name: &str,
    mount_dir: &Path,
) -> CommandSpec {
    let mut spec = borg.command("create").args(CREATE_FLAGS);
    for pattern in resolve_patterns(exclude, mount_dir) {
        spec = spec.arg("--exclude").arg(pattern);
    }
    spec.arg(naming.target(borg.repository(), base_name))
        .arg(mount_dir.to_string_lossy())
}

/// Archive the snapshot of `base_name` mounted at `mount_dir`.
///
/// Returns the archive name as configured (placeholders unresolved).
#[instrument(skip_all, fields(volume = base_name))]
pub fn create_archive<R: CommandRunner>(
    runner: &R,
    borg: &Borg,
    naming: ArchiveNaming<'_>,
    exclude: &[String],
    base_name: &str,
    mount_dir: &Path,
) -> Result<String> {
    let spec = create_command(borg, naming, exclude, base_name, mount_dir);
    runner
        .run(&spec, RunOptions::CHECKED)
        .with_context(|| format!("archive {base_name}"))?;
    let archive = naming.archive_name(base_name);
    info!(archive = %archive, "archive created");
    Ok(archive)
}
