//! Volume-list invariants that keep prune filters from overlapping.

use std::collections::HashMap;

use crate::core::volume::Volume;

/// Check the volume list for naming hazards:
/// - every device has a usable base name and parent directory
/// - no two volumes share a base name
/// - no base name is a prefix of another (prune would match both)
pub fn validate_volumes(volumes: &[Volume]) -> Vec<String> {
    let mut errors = Vec::new();
    if volumes.is_empty() {
        errors.push("volumes: at least one volume is required".to_string());
        return errors;
    }

    let mut names: Vec<(&str, &Volume)> = Vec::new();
    for volume in volumes {
        let device = volume.device.display();
        if !volume.device.is_absolute() {
            errors.push(format!("volume {device}: device path must be absolute"));
        }
        if volume.fs_type.trim().is_empty() {
            errors.push(format!("volume {device}: fs_type must not be empty"));
        }
        if volume.group_dir().is_err() {
            errors.push(format!("volume {device}: device path has no parent directory"));
        }
        match volume.base_name() {
            Ok(name) => names.push((name, volume)),
            Err(err) => errors.push(err.to_string()),
        }
    }

    let mut seen: HashMap<&str, &Volume> = HashMap::new();
    for &(name, volume) in &names {
        if let Some(first) = seen.insert(name, volume) {
            errors.push(format!(
                "volumes {} and {} share base name '{}'",
                first.device.display(),
                volume.device.display(),
                name
            ));
        }
    }

    for &(left, left_volume) in &names {
        for &(right, right_volume) in &names {
            if left != right && right.starts_with(left) {
                errors.push(format!(
                    "volume {} base name '{}' is a prefix of '{}' ({}); \
                     prune filters would overlap",
                    left_volume.device.display(),
                    left,
                    right,
                    right_volume.device.display()
                ));
            }
        }
    }

    errors
}
