//! Per-profile serialization
//!
//! An exclusive advisory lock file under the profile's archive folder.
//! Backups and restores for the same profile serialize on it (across
//! processes too); different profiles use disjoint folders and need no
//! coordination.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use fs2::FileExt;

const LOCK_FILE: &str = ".lock";

/// Held for the duration of one backup or restore invocation
pub struct ProfileLock {
    file: File,
}

impl ProfileLock {
    /// Blocks until the lock for `game_name` under `storage_root` is held
    pub fn acquire(storage_root: &Path, game_name: &str) -> io::Result<Self> {
        let folder = storage_root.join(game_name);
        fs::create_dir_all(&folder)?;

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(folder.join(LOCK_FILE))?;
        file.lock_exclusive()?;

        Ok(Self { file })
    }
}

impl Drop for ProfileLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}
