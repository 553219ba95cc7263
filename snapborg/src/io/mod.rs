//! Side-effecting adapters: configuration, secrets, child processes.

pub mod borg;
pub mod command;
pub mod config;
pub mod passphrase;
pub mod process;
