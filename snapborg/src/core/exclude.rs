//! Exclusion patterns rooted at a snapshot mount.

use std::path::Path;

/// Rewrite `pattern` for an archive of `mount_dir`.
///
/// Absolute patterns describe paths on the live volume, so they are moved
/// under the mount directory. Relative and glob-only patterns are left as-is.
pub fn resolve_pattern(pattern: &str, mount_dir: &Path) -> String {
    match pattern.strip_prefix('/') {
        Some(rest) => {
            let mount = mount_dir.to_string_lossy();
            format!("{}/{}", mount.trim_end_matches('/'), rest)
        }
        None => pattern.to_string(),
    }
}

/// Resolve every pattern, preserving order.
pub fn resolve_patterns(patterns: &[String], mount_dir: &Path) -> Vec<String> {
    patterns
        .iter()
        .map(|pattern| resolve_pattern(pattern, mount_dir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_pattern_moves_under_mount() {
        assert_eq!(resolve_pattern("/tmp", Path::new("/mnt/snap")), "/mnt/snap/tmp");
    }

    #[test]
    fn glob_keeps_wildcards() {
        assert_eq!(
            resolve_pattern("/home/*/.cache", Path::new("/ubuntu-lv-jxy")),
            "/ubuntu-lv-jxy/home/*/.cache"
        );
    }

    #[test]
    fn trailing_slash_on_mount_is_not_doubled() {
        assert_eq!(resolve_pattern("/var/tmp", Path::new("/mnt/snap/")), "/mnt/snap/var/tmp");
    }

    #[test]
    fn relative_patterns_pass_through() {
        assert_eq!(resolve_pattern("*.pyc", Path::new("/mnt/snap")), "*.pyc");
        assert_eq!(
            resolve_pattern("sh:**/node_modules", Path::new("/mnt/snap")),
            "sh:**/node_modules"
        );
    }

    #[test]
    fn order_is_preserved() {
        let patterns = vec!["/b".to_string(), "a".to_string(), "/c".to_string()];
        assert_eq!(
            resolve_patterns(&patterns, Path::new("/m")),
            vec!["/m/b", "a", "/m/c"]
        );
    }
}
