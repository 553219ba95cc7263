//! Snapshot manager: create an LVM snapshot and mount it read-only.

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::core::volume::{SnapshotHandle, Volume};
use crate::io::command::{CommandRunner, CommandSpec, RunOptions};
use crate::io::config::ToolsConfig;

/// The three setup commands, in execution order.
pub fn mount_commands(
    tools: &ToolsConfig,
    volume: &Volume,
    handle: &SnapshotHandle,
) -> [CommandSpec; 3] {
    let mount_dir = handle.mount_dir.to_string_lossy();
    [
        CommandSpec::new(&tools.mkdir).arg("-p").arg(&*mount_dir),
        CommandSpec::new(&tools.lvcreate)
            .args(["-s", "-l", "100%FREE", "-n"])
            .arg(&handle.name)
            .arg(volume.device.to_string_lossy()),
        CommandSpec::new(&tools.mount)
            .args(["-r", "-t"])
            .arg(&volume.fs_type)
            .arg(handle.device.to_string_lossy())
            .arg(&*mount_dir),
    ]
}

/// Create the mount directory, snapshot `volume` using all free space in its
/// volume group, and mount the snapshot read-only.
///
/// The first failing command aborts the rest. Nothing is cleaned up here;
/// teardown owns that.
#[instrument(skip_all, fields(volume = %volume.device.display(), snapshot = %handle.name))]
pub fn mount_snapshot<R: CommandRunner>(
    runner: &R,
    tools: &ToolsConfig,
    volume: &Volume,
    handle: &SnapshotHandle,
) -> Result<()> {
    for spec in mount_commands(tools, volume, handle) {
        runner
            .run(&spec, RunOptions::CHECKED)
            .with_context(|| format!("snapshot {}", handle.name))?;
    }
    debug!(mount_dir = %handle.mount_dir.display(), "snapshot mounted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn commands_match_lvm_and_mount_syntax() {
        let volume = Volume::new("/dev/ubuntu-vg/archive", "ext4");
        let handle = SnapshotHandle::derive(&volume, "-jxy", Path::new("/")).expect("derive");
        let lines: Vec<String> = mount_commands(&ToolsConfig::default(), &volume, &handle)
            .iter()
            .map(CommandSpec::command_line)
            .collect();
        assert_eq!(
            lines,
            vec![
                "mkdir -p /archive-jxy",
                "lvcreate -s -l 100%FREE -n archive-jxy /dev/ubuntu-vg/archive",
                "mount -r -t ext4 /dev/ubuntu-vg/archive-jxy /archive-jxy",
            ]
        );
    }
}
