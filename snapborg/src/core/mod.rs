//! Deterministic, pure logic shared by the backup components.
//!
//! Core modules must be free of I/O side effects. They derive names, paths and
//! argument lists from configuration values and are tested in isolation.

pub mod exclude;
pub mod invariants;
pub mod naming;
pub mod retention;
pub mod volume;
