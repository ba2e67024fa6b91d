//! # Storage Layer
//!
//! Filesystem persistence for Savekeep.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Config (profiles, storage root) | JSON | `<config-dir>/savekeep.json` |
//! | Regular archives | ZIP | `<root>/<game>/<game>_<timestamp>.zip` |
//! | Safety archives | ZIP | `<root>/<game>/Safety/SAFETY_<timestamp>.zip` |
//!
//! ## Safety properties
//!
//! - Config writes are atomic (temp file + rename); a corrupted config is
//!   rotated aside (`.corrupted`) instead of aborting startup.
//! - Archives are never overwritten; same-second collisions get an `_N`
//!   suffix.
//! - Extraction stages into a temp directory and only touches the target
//!   after the whole archive has unpacked cleanly.

mod archive_store;
mod config;

pub use archive_store::{ArchiveStore, ArchiveStoreError};
pub use config::{AppConfig, ConfigStore, LoadedConfig, StorageRootMode, CONFIG_FILE};
