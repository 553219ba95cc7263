//! Crash-consistent backups of LVM logical volumes with borg.
//!
//! Each configured volume is snapshotted, mounted read-only, archived with
//! `borg create` and torn down again; afterwards every volume's archives are
//! pruned and the newest ones reported. The crate is split the same way:
//!
//! - **[`core`]**: Pure derivations (snapshot names, archive names, exclusion
//!   rewriting, retention flags, volume-list invariants). No I/O.
//! - **[`io`]**: Side-effecting adapters (config, passphrase, child processes).
//!   Every external command goes through [`io::command::CommandRunner`] so
//!   tests can record and script them.
//!
//! Component modules ([`snapshot`], [`archive`], [`teardown`], [`prune`],
//! [`report`]) each own one step; [`backup`] sequences them and performs the
//! teardown pass on failure.

pub mod archive;
pub mod backup;
pub mod check;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod prune;
pub mod report;
pub mod snapshot;
pub mod teardown;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
