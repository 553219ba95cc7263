//! Teardown: release a snapshot whatever state setup left it in.

use tracing::{instrument, warn};

use crate::core::volume::SnapshotHandle;
use crate::io::command::{CommandRunner, CommandSpec, RunOptions};
use crate::io::config::ToolsConfig;

/// Counts of teardown sub-steps. Failures are informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub attempted: usize,
    pub failed: usize,
}

impl TeardownReport {
    pub fn merge(&mut self, other: TeardownReport) {
        self.attempted += other.attempted;
        self.failed += other.failed;
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

pub fn teardown_commands(tools: &ToolsConfig, handle: &SnapshotHandle) -> [CommandSpec; 3] {
    let device = handle.device.to_string_lossy();
    [
        CommandSpec::new(&tools.umount).arg("-f").arg(&*device),
        CommandSpec::new(&tools.lvremove).arg("-f").arg(&*device),
        CommandSpec::new(&tools.rmdir).arg(handle.mount_dir.to_string_lossy()),
    ]
}

/// Force-unmount, force-remove the snapshot, then remove its mount directory.
///
/// Every sub-step runs even when an earlier one fails; failures are logged by
/// the runner and counted here, never returned.
#[instrument(skip_all, fields(snapshot = %handle.name))]
pub fn tear_down<R: CommandRunner>(
    runner: &R,
    tools: &ToolsConfig,
    handle: &SnapshotHandle,
) -> TeardownReport {
    let mut report = TeardownReport::default();
    for spec in teardown_commands(tools, handle) {
        report.attempted += 1;
        match runner.run(&spec, RunOptions::BEST_EFFORT) {
            Ok(outcome) if outcome.success => {}
            Ok(_) => report.failed += 1,
            Err(err) => {
                warn!(command = %spec, err = %format!("{err:#}"), "teardown step failed");
                report.failed += 1;
            }
        }
    }
    if !report.is_clean() {
        warn!(failed = report.failed, "teardown incomplete");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::volume::Volume;
    use std::path::Path;

    #[test]
    fn unmount_uses_snapshot_device() {
        let volume = Volume::new("/dev/ubuntu-vg/ubuntu-lv", "ext4");
        let handle = SnapshotHandle::derive(&volume, "-jxy", Path::new("/")).expect("derive");
        let lines: Vec<String> = teardown_commands(&ToolsConfig::default(), &handle)
            .iter()
            .map(CommandSpec::command_line)
            .collect();
        assert_eq!(
            lines,
            vec![
                "umount -f /dev/ubuntu-vg/ubuntu-lv-jxy",
                "lvremove -f /dev/ubuntu-vg/ubuntu-lv-jxy",
                "rmdir /ubuntu-lv-jxy",
            ]
        );
    }

    #[test]
    fn merge_sums_counts() {
        let mut total = TeardownReport::default();
        total.merge(TeardownReport {
            attempted: 3,
            failed: 1,
        });
        total.merge(TeardownReport {
            attempted: 3,
            failed: 0,
        });
        assert_eq!(
            total,
            TeardownReport {
                attempted: 6,
                failed: 1
            }
        );
        assert!(!total.is_clean());
    }
}
