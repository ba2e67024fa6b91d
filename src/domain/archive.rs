//! Archive naming and layout contract
//!
//! Layout under a storage root:
//!
//! ```text
//! <root>/
//! ├── <game_name>/
//! │   ├── <game_name>_<YYYY-MM-DD_hh-mm-ss>.zip     # regular backups
//! │   └── Safety/
//! │       └── SAFETY_<YYYY-MM-DD_hh-mm-ss>.zip      # pre-restore snapshots
//! ```
//!
//! Archives are immutable once written and never overwritten. Two archives
//! within the same wall-clock second get an incrementing `_N` suffix before
//! `.zip`, so names stay unique and lexically ordered.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Timestamp format embedded in archive file names
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

const SAFETY_PREFIX: &str = "SAFETY";
const SAFETY_DIR: &str = "Safety";
const ZIP_EXT: &str = ".zip";

/// Whether an archive is a user-requested backup or an automatic
/// pre-restore snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveKind {
    Regular,
    Safety,
}

impl ArchiveKind {
    pub fn label(&self) -> &'static str {
        match self {
            ArchiveKind::Regular => "regular",
            ArchiveKind::Safety => "safety",
        }
    }
}

/// A written archive file under a storage root
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Archive {
    pub storage_root: PathBuf,
    pub game_name: String,
    pub kind: ArchiveKind,
    pub timestamp: NaiveDateTime,
    pub file_path: PathBuf,
}

impl Archive {
    /// Returns the folder that holds archives of `kind` for a game
    pub fn folder(storage_root: &Path, game_name: &str, kind: ArchiveKind) -> PathBuf {
        match kind {
            ArchiveKind::Regular => storage_root.join(game_name),
            ArchiveKind::Safety => storage_root.join(game_name).join(SAFETY_DIR),
        }
    }

    /// Formats the archive file name for a timestamp, with an optional
    /// same-second collision suffix
    pub fn file_name(
        game_name: &str,
        kind: ArchiveKind,
        timestamp: NaiveDateTime,
        suffix: Option<u32>,
    ) -> String {
        let prefix = match kind {
            ArchiveKind::Regular => game_name,
            ArchiveKind::Safety => SAFETY_PREFIX,
        };
        let stamp = timestamp.format(TIMESTAMP_FORMAT);
        match suffix {
            None => format!("{}_{}{}", prefix, stamp, ZIP_EXT),
            Some(n) => format!("{}_{}_{}{}", prefix, stamp, n, ZIP_EXT),
        }
    }

    /// Parses an archive file name back into its timestamp.
    ///
    /// Returns `None` for names that do not follow the contract for the
    /// given game and kind (foreign files in the storage tree are ignored
    /// rather than treated as errors).
    pub fn parse_file_name(
        name: &str,
        game_name: &str,
        kind: ArchiveKind,
    ) -> Option<NaiveDateTime> {
        let prefix = match kind {
            ArchiveKind::Regular => game_name,
            ArchiveKind::Safety => SAFETY_PREFIX,
        };
        let stem = name
            .strip_prefix(prefix)?
            .strip_prefix('_')?
            .strip_suffix(ZIP_EXT)?;

        // Timestamp is a fixed-width 19 characters; anything after it must
        // be a collision suffix.
        if stem.len() < 19 {
            return None;
        }
        let (stamp, rest) = stem.split_at(19);
        if !rest.is_empty() {
            let suffix = rest.strip_prefix('_')?;
            if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
        }

        NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn regular_file_name() {
        let name = Archive::file_name("Game", ArchiveKind::Regular, ts(), None);
        assert_eq!(name, "Game_2024-01-01_12-00-00.zip");
    }

    #[test]
    fn safety_file_name() {
        let name = Archive::file_name("Game", ArchiveKind::Safety, ts(), None);
        assert_eq!(name, "SAFETY_2024-01-01_12-00-00.zip");
    }

    #[test]
    fn collision_suffix() {
        let name = Archive::file_name("Game", ArchiveKind::Regular, ts(), Some(2));
        assert_eq!(name, "Game_2024-01-01_12-00-00_2.zip");
    }

    #[test]
    fn folders_per_kind() {
        let root = Path::new("/backups");
        assert_eq!(
            Archive::folder(root, "Game", ArchiveKind::Regular),
            PathBuf::from("/backups/Game")
        );
        assert_eq!(
            Archive::folder(root, "Game", ArchiveKind::Safety),
            PathBuf::from("/backups/Game/Safety")
        );
    }

    #[test]
    fn parse_round_trip() {
        for suffix in [None, Some(1), Some(12)] {
            let name = Archive::file_name("Game", ArchiveKind::Regular, ts(), suffix);
            let parsed = Archive::parse_file_name(&name, "Game", ArchiveKind::Regular);
            assert_eq!(parsed, Some(ts()), "name {name}");
        }
    }

    #[test]
    fn parse_safety_round_trip() {
        let name = Archive::file_name("Game", ArchiveKind::Safety, ts(), None);
        let parsed = Archive::parse_file_name(&name, "Game", ArchiveKind::Safety);
        assert_eq!(parsed, Some(ts()));
    }

    #[test]
    fn parse_rejects_foreign_names() {
        assert_eq!(
            Archive::parse_file_name("notes.txt", "Game", ArchiveKind::Regular),
            None
        );
        assert_eq!(
            Archive::parse_file_name("Other_2024-01-01_12-00-00.zip", "Game", ArchiveKind::Regular),
            None
        );
        assert_eq!(
            Archive::parse_file_name("Game_2024-01-01.zip", "Game", ArchiveKind::Regular),
            None
        );
        assert_eq!(
            Archive::parse_file_name("Game_2024-01-01_12-00-00_x.zip", "Game", ArchiveKind::Regular),
            None
        );
    }

    #[test]
    fn game_names_with_underscores_parse() {
        let name = Archive::file_name("My_Game", ArchiveKind::Regular, ts(), None);
        let parsed = Archive::parse_file_name(&name, "My_Game", ArchiveKind::Regular);
        assert_eq!(parsed, Some(ts()));
    }
}
