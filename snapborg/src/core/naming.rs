//! Archive naming shared by create, prune and check.
//!
//! An archive is named `<prefix><base name><postfix>`. The prefix plus base
//! name doubles as the prune filter, so it must be unique per volume.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Borg placeholders that resolve to the invocation time.
static TIMESTAMP_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(?:now|utcnow)(?::[^}]*)?\}").expect("static placeholder regex")
});

/// True if `postfix` contains a borg timestamp placeholder such as `{now}`.
pub fn has_timestamp_placeholder(postfix: &str) -> bool {
    TIMESTAMP_PLACEHOLDER.is_match(postfix)
}

#[derive(Debug, Clone, Copy)]
pub struct ArchiveNaming<'a> {
    pub prefix: &'a str,
    pub postfix: &'a str,
}

impl ArchiveNaming<'_> {
    /// Name filter used by `borg prune --prefix`.
    pub fn prune_prefix(&self, base_name: &str) -> String {
        format!("{}{}", self.prefix, base_name)
    }

    pub fn archive_name(&self, base_name: &str) -> String {
        format!("{}{}{}", self.prefix, base_name, self.postfix)
    }

    /// `<repository>::<archive name>`
    pub fn target(&self, repository: &Path, base_name: &str) -> String {
        format!(
            "{}::{}",
            repository.display(),
            self.archive_name(base_name)
        )
    }
}
