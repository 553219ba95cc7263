//! Stable exit codes for snapborg commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// A backup sequence failed; teardown of all volumes was attempted.
pub const FAILED: i32 = 1;
/// Configuration, passphrase or logging setup was unusable; nothing ran.
pub const INVALID: i32 = 2;
