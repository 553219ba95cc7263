//! Volume descriptors and the snapshot names derived from them.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// A logical volume to protect, as listed in the configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Volume {
    /// LV path, e.g. `/dev/ubuntu-vg/archive`.
    pub device: PathBuf,
    /// Filesystem type passed to `mount -t`.
    pub fs_type: String,
}

impl Volume {
    pub fn new(device: impl Into<PathBuf>, fs_type: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            fs_type: fs_type.into(),
        }
    }

    /// Final component of the device path (the LV name).
    pub fn base_name(&self) -> Result<&str> {
        self.device
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow!("volume device {} has no name", self.device.display()))
    }

    /// Directory holding the device node (the volume group path).
    pub fn group_dir(&self) -> Result<&Path> {
        self.device
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .ok_or_else(|| anyhow!("volume device {} has no parent", self.device.display()))
    }
}

/// Per-cycle snapshot of one volume. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHandle {
    /// LV name of the snapshot (`<base name><suffix>`).
    pub name: String,
    /// Device path of the snapshot, a sibling of the source device.
    pub device: PathBuf,
    /// Where the snapshot is mounted read-only.
    pub mount_dir: PathBuf,
}

impl SnapshotHandle {
    pub fn derive(volume: &Volume, suffix: &str, mount_base: &Path) -> Result<Self> {
        let name = format!("{}{}", volume.base_name()?, suffix);
        let device = volume.group_dir()?.join(&name);
        let mount_dir = mount_base.join(&name);
        Ok(Self {
            name,
            device,
            mount_dir,
        })
    }
}
