//! Repository passphrase loaded once at startup.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Secret value injected into borg's environment. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

/// Read the passphrase file, dropping a single trailing line ending.
pub fn read_passphrase(path: &Path) -> Result<Passphrase> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read passphrase file {}", path.display()))?;
    let value = raw
        .strip_suffix("\r\n")
        .or_else(|| raw.strip_suffix('\n'))
        .unwrap_or(&raw);
    if value.is_empty() {
        warn!(path = %path.display(), "passphrase file is empty");
    }
    debug!(path = %path.display(), "passphrase loaded");
    Ok(Passphrase::new(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_one_trailing_newline() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".borg-passphrase");
        fs::write(&path, "correct horse\n\n").expect("write");
        let secret = read_passphrase(&path).expect("read");
        assert_eq!(secret.expose(), "correct horse\n");
    }

    #[test]
    fn strips_crlf() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".borg-passphrase");
        fs::write(&path, "battery staple\r\n").expect("write");
        assert_eq!(read_passphrase(&path).expect("read").expose(), "battery staple");
    }

    #[test]
    fn debug_is_redacted() {
        let secret = Passphrase::new("hunter2");
        assert!(!format!("{secret:?}").contains("hunter2"));
    }

    #[test]
    fn missing_file_names_path() {
        let err = read_passphrase(Path::new("/nonexistent/.borg-passphrase")).expect_err("missing");
        assert!(format!("{err:#}").contains("/nonexistent/.borg-passphrase"));
    }
}
