//! Archive store: ZIP packing, extraction and listing
//!
//! Extraction is the highest-risk operation: a malformed archive must
//! never leave the target folder worse than before. Entries are unpacked
//! into a staging directory next to the target and only moved into place
//! once the whole archive has extracted cleanly.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use thiserror::Error;
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::domain::{Archive, ArchiveKind};

#[derive(Debug, Error)]
pub enum ArchiveStoreError {
    #[error("Source folder not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Source folder is empty: {0}")]
    EmptySource(PathBuf),

    #[error("Storage root not writable: {path}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt archive {path}: {message}")]
    CorruptArchive { path: PathBuf, message: String },

    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ArchiveStoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Splits a zip error into the I/O and structural cases
    fn from_zip(path: &Path, err: ZipError) -> Self {
        match err {
            ZipError::Io(source) => Self::io(path, source),
            other => Self::CorruptArchive {
                path: path.to_path_buf(),
                message: other.to_string(),
            },
        }
    }
}

/// Creates, lists and extracts archives under one storage root
pub struct ArchiveStore {
    root: PathBuf,
}

impl ArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Packs `source` recursively into a new archive for `game_name`.
    ///
    /// The archive lands at the contract path for its kind, never
    /// overwriting an existing file, and is flushed to disk before this
    /// returns. Internal paths are relative to `source`.
    pub fn write_archive(
        &self,
        source: &Path,
        kind: ArchiveKind,
        game_name: &str,
        compress: bool,
    ) -> Result<Archive, ArchiveStoreError> {
        self.write_archive_at(source, kind, game_name, compress, Local::now().naive_local())
    }

    /// [`write_archive`](Self::write_archive) with an explicit timestamp;
    /// separated so the collision policy is testable
    pub(crate) fn write_archive_at(
        &self,
        source: &Path,
        kind: ArchiveKind,
        game_name: &str,
        compress: bool,
        timestamp: NaiveDateTime,
    ) -> Result<Archive, ArchiveStoreError> {
        if !source.is_dir() {
            return Err(ArchiveStoreError::SourceMissing(source.to_path_buf()));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(source) {
            let entry = entry.map_err(|e| ArchiveStoreError::io(source, e.into()))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        if files.is_empty() {
            return Err(ArchiveStoreError::EmptySource(source.to_path_buf()));
        }

        let folder = Archive::folder(&self.root, game_name, kind);
        fs::create_dir_all(&folder).map_err(|e| ArchiveStoreError::Storage {
            path: folder.clone(),
            source: e,
        })?;

        let (file, file_path) = create_unique(&folder, game_name, kind, timestamp)?;

        let method = if compress {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };
        let options = SimpleFileOptions::default().compression_method(method);

        let mut writer = ZipWriter::new(file);
        for path in &files {
            let rel = path.strip_prefix(source).expect("walked under source");
            let name: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            writer
                .start_file(name.join("/"), options)
                .map_err(|e| ArchiveStoreError::from_zip(&file_path, e))?;

            let mut src = File::open(path).map_err(|e| ArchiveStoreError::io(path, e))?;
            io::copy(&mut src, &mut writer).map_err(|e| ArchiveStoreError::io(&file_path, e))?;
        }

        // Safety archives gate destructive restore steps, so make sure the
        // bytes are on disk before reporting success.
        let file = writer
            .finish()
            .map_err(|e| ArchiveStoreError::from_zip(&file_path, e))?;
        file.sync_all()
            .map_err(|e| ArchiveStoreError::io(&file_path, e))?;

        Ok(Archive {
            storage_root: self.root.clone(),
            game_name: game_name.to_string(),
            kind,
            timestamp,
            file_path,
        })
    }

    /// Unpacks `archive_path` into `target`, creating it if absent.
    ///
    /// The whole archive is extracted to a staging directory first; the
    /// target is only touched after every entry unpacked cleanly, so a
    /// corrupt archive leaves the target exactly as it was.
    pub fn extract_archive(
        &self,
        archive_path: &Path,
        target: &Path,
    ) -> Result<(), ArchiveStoreError> {
        let file =
            File::open(archive_path).map_err(|e| ArchiveStoreError::io(archive_path, e))?;
        let mut archive =
            ZipArchive::new(file).map_err(|e| ArchiveStoreError::from_zip(archive_path, e))?;

        // Stage next to the target so the final moves stay on one filesystem
        let staging_parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);
        fs::create_dir_all(&staging_parent)
            .map_err(|e| ArchiveStoreError::io(&staging_parent, e))?;
        let staging = tempfile::Builder::new()
            .prefix(".savekeep-restore-")
            .tempdir_in(&staging_parent)
            .map_err(|e| ArchiveStoreError::io(&staging_parent, e))?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| ArchiveStoreError::from_zip(archive_path, e))?;

            let Some(rel) = entry.enclosed_name() else {
                return Err(ArchiveStoreError::CorruptArchive {
                    path: archive_path.to_path_buf(),
                    message: format!("entry '{}' escapes the target folder", entry.name()),
                });
            };

            let dest = staging.path().join(rel);
            if entry.is_dir() {
                fs::create_dir_all(&dest).map_err(|e| ArchiveStoreError::io(&dest, e))?;
            } else {
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent).map_err(|e| ArchiveStoreError::io(parent, e))?;
                }
                let mut out = File::create(&dest).map_err(|e| ArchiveStoreError::io(&dest, e))?;
                io::copy(&mut entry, &mut out)
                    .map_err(|e| ArchiveStoreError::from_zip(archive_path, ZipError::Io(e)))?;
            }
        }

        fs::create_dir_all(target).map_err(|e| ArchiveStoreError::io(target, e))?;
        move_tree(staging.path(), target)
    }

    /// Lists all archives for a game, newest first. Safety archives come
    /// from the `Safety/` subfolder; files that do not follow the naming
    /// contract are ignored.
    pub fn list_archives(&self, game_name: &str) -> Result<Vec<Archive>, ArchiveStoreError> {
        let mut archives = Vec::new();

        for kind in [ArchiveKind::Regular, ArchiveKind::Safety] {
            let folder = Archive::folder(&self.root, game_name, kind);
            let entries = match fs::read_dir(&folder) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(ArchiveStoreError::io(&folder, e)),
            };

            for entry in entries.flatten() {
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                if let Some(timestamp) = Archive::parse_file_name(name, game_name, kind) {
                    archives.push(Archive {
                        storage_root: self.root.clone(),
                        game_name: game_name.to_string(),
                        kind,
                        timestamp,
                        file_path: entry.path(),
                    });
                }
            }
        }

        // Newest first; the collision suffix breaks ties within a second
        archives.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.file_path.cmp(&a.file_path))
        });
        Ok(archives)
    }
}

/// Creates the archive file, appending `_1`, `_2`, ... when another
/// archive already claimed the timestamp. `create_new` makes the claim
/// atomic against concurrent writers.
fn create_unique(
    folder: &Path,
    game_name: &str,
    kind: ArchiveKind,
    timestamp: NaiveDateTime,
) -> Result<(File, PathBuf), ArchiveStoreError> {
    let mut attempt: u32 = 0;
    loop {
        let suffix = (attempt > 0).then_some(attempt);
        let path = folder.join(Archive::file_name(game_name, kind, timestamp, suffix));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((file, path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => {
                return Err(ArchiveStoreError::Storage {
                    path,
                    source: e,
                })
            }
        }
    }
}

/// Moves every entry of `from` into `to`, overwriting files that already
/// exist. Falls back to copy + remove when rename crosses a filesystem.
fn move_tree(from: &Path, to: &Path) -> Result<(), ArchiveStoreError> {
    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry.map_err(|e| ArchiveStoreError::io(from, e.into()))?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .expect("walked under staging");
        let dest = to.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(|e| ArchiveStoreError::io(&dest, e))?;
        } else {
            if dest.exists() {
                fs::remove_file(&dest).map_err(|e| ArchiveStoreError::io(&dest, e))?;
            }
            if fs::rename(entry.path(), &dest).is_err() {
                fs::copy(entry.path(), &dest).map_err(|e| ArchiveStoreError::io(&dest, e))?;
                fs::remove_file(entry.path())
                    .map_err(|e| ArchiveStoreError::io(entry.path(), e))?;
            }
        }
    }
    Ok(())
}
