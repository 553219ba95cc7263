//! Retention pruner: `borg prune` restricted to one volume's archives.

use anyhow::{Context, Result};
use tracing::instrument;

use crate::core::naming::ArchiveNaming;
use crate::core::retention::RetentionPolicy;
use crate::io::borg::Borg;
use crate::io::command::{CommandRunner, CommandSpec, RunOptions};

pub fn prune_command(
    borg: &Borg,
    naming: ArchiveNaming<'_>,
    retention: &RetentionPolicy,
    base_name: &str,
) -> CommandSpec {
    borg.command("prune")
        .args(["--list", "--show-rc"])
        .args(retention.prune_args())
        .arg("--prefix")
        .arg(naming.prune_prefix(base_name))
        .arg(borg.repository_arg())
}

/// Prune archives of `base_name` down to the retention policy.
#[instrument(skip_all, fields(volume = base_name))]
pub fn prune_archives<R: CommandRunner>(
    runner: &R,
    borg: &Borg,
    naming: ArchiveNaming<'_>,
    retention: &RetentionPolicy,
    base_name: &str,
) -> Result<()> {
    let spec = prune_command(borg, naming, retention, base_name);
    runner
        .run(&spec, RunOptions::CHECKED)
        .with_context(|| format!("prune {base_name}"))?;
    Ok(())
}
