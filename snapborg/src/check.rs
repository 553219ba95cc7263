//! `snapborg check`: show what a backup would touch without running anything.

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;

use crate::io::config::Config;

/// Derived names for one volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub volume: PathBuf,
    pub snapshot_device: PathBuf,
    pub mount_dir: PathBuf,
    pub archive_target: String,
    pub prune_prefix: String,
}

impl fmt::Display for PlanEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "volume={} snapshot={} mount={} archive={} prune_prefix={}",
            self.volume.display(),
            self.snapshot_device.display(),
            self.mount_dir.display(),
            self.archive_target,
            self.prune_prefix
        )
    }
}

pub fn plan(config: &Config) -> Result<Vec<PlanEntry>> {
    let naming = config.naming();
    config
        .volumes
        .iter()
        .map(|volume| {
            let base_name = volume.base_name()?;
            let handle = config.snapshot_handle(volume)?;
            Ok(PlanEntry {
                volume: volume.device.clone(),
                snapshot_device: handle.device,
                mount_dir: handle.mount_dir,
                archive_target: naming.target(&config.repository, base_name),
                prune_prefix: naming.prune_prefix(base_name),
            })
        })
        .collect()
}
