//! Savekeep - A save-profile backup and restore manager
//!
//! Savekeep archives application data folders into timestamped ZIP files
//! and restores them with a mandatory safety snapshot, so a restore can
//! never silently destroy prior data. Save locations are stored in a
//! portable "contracted" form (environment-variable tokens) and installed
//! games are discovered through a plugin registry.

pub mod domain;
pub mod storage;
pub mod plugin;
pub mod engine;
pub mod cli;

pub use domain::{Archive, ArchiveKind, Profile, ProfileId, ProfileRegistry};
