//! Orchestration for a full backup run.
//!
//! Per volume: snapshot, archive, teardown. Then prune every volume and report
//! the newest archives. Any error up to and including pruning stops the
//! sequence, triggers a teardown pass over every configured volume, and is
//! returned unchanged. The report is best effort and only recorded.

use anyhow::Result;
use tracing::{debug, error, info, instrument, warn};

use crate::archive::create_archive;
use crate::core::volume::Volume;
use crate::io::borg::Borg;
use crate::io::command::CommandRunner;
use crate::io::config::Config;
use crate::prune::prune_archives;
use crate::report::log_last_archives;
use crate::snapshot::mount_snapshot;
use crate::teardown::{TeardownReport, tear_down};

/// Outcome of a successful `snapborg backup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSummary {
    /// Archive names as configured, one per volume, in volume order.
    pub archives: Vec<String>,
    pub pruned_volumes: usize,
    pub teardown: TeardownReport,
    /// `borg info` for the new archives failed. The archives themselves exist.
    pub report_failed: bool,
}

/// Run the whole backup sequence, tearing everything down on failure.
#[instrument(skip_all, fields(volumes = config.volumes.len(), dry_run = config.dry_run))]
pub fn run_backup<R: CommandRunner>(
    runner: &R,
    config: &Config,
    borg: &Borg,
) -> Result<BackupSummary> {
    info!("backup started");
    match backup_sequence(runner, config, borg) {
        Ok(summary) => {
            info!(archives = summary.archives.len(), "backup finished");
            Ok(summary)
        }
        Err(err) => {
            error!(err = %format!("{err:#}"), "backup failed, tearing down all volumes");
            let report = teardown_all(runner, config);
            warn!(
                attempted = report.attempted,
                failed = report.failed,
                "teardown after failure finished"
            );
            Err(err)
        }
    }
}

fn backup_sequence<R: CommandRunner>(
    runner: &R,
    config: &Config,
    borg: &Borg,
) -> Result<BackupSummary> {
    let mut archives = Vec::with_capacity(config.volumes.len());
    let mut teardown = TeardownReport::default();
    for volume in &config.volumes {
        let (archive, report) = backup_volume(runner, config, borg, volume)?;
        archives.push(archive);
        teardown.merge(report);
    }

    let naming = config.naming();
    for volume in &config.volumes {
        prune_archives(runner, borg, naming, &config.retention, volume.base_name()?)?;
    }

    let report_failed = !log_last_archives(runner, borg, config.volumes.len());

    Ok(BackupSummary {
        archives,
        pruned_volumes: config.volumes.len(),
        teardown,
        report_failed,
    })
}

/// Snapshot, archive and tear down one volume.
///
/// Setup and archive errors return before teardown; the caller's global
/// teardown pass covers this volume.
#[instrument(skip_all, fields(volume = %volume.device.display()))]
fn backup_volume<R: CommandRunner>(
    runner: &R,
    config: &Config,
    borg: &Borg,
    volume: &Volume,
) -> Result<(String, TeardownReport)> {
    let base_name = volume.base_name()?;
    let handle = config.snapshot_handle(volume)?;
    debug!(
        snapshot = %handle.device.display(),
        mount_dir = %handle.mount_dir.display(),
        "volume cycle"
    );

    mount_snapshot(runner, &config.tools, volume, &handle)?;
    let archive = create_archive(
        runner,
        borg,
        config.naming(),
        &config.exclude,
        base_name,
        &handle.mount_dir,
    )?;
    let report = tear_down(runner, &config.tools, &handle);
    Ok((archive, report))
}

/// Tear down the snapshot of every configured volume, best effort.
///
/// Used after a failed run and by `snapborg teardown` to clear snapshots a
/// previous run left behind.
#[instrument(skip_all, fields(volumes = config.volumes.len()))]
pub fn teardown_all<R: CommandRunner>(runner: &R, config: &Config) -> TeardownReport {
    let mut total = TeardownReport::default();
    for volume in &config.volumes {
        match config.snapshot_handle(volume) {
            Ok(handle) => total.merge(tear_down(runner, &config.tools, &handle)),
            Err(err) => {
                warn!(
                    volume = %volume.device.display(),
                    err = %format!("{err:#}"),
                    "cannot derive snapshot, skipping"
                );
            }
        }
    }
    total
}
