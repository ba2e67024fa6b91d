//! Backup pipeline
//!
//! expand path -> pre-hook -> pack archive -> post-hook
//!
//! The pre-hook may rewrite the effective source path (e.g. to staged
//! files); the post-hook may attach metadata, which is persisted as a
//! sidecar next to the archive. A hook failure fails the whole backup,
//! never silently.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::domain::{Archive, ArchiveKind, EnvSnapshot, Profile};
use crate::plugin::{HookPayload, HookPoint, RegistrySnapshot};
use crate::storage::{ArchiveStore, ArchiveStoreError};

use super::locks::ProfileLock;
use super::{hook_failed, plugin_for, profile_payload, EngineError};

/// Outcome of a successful backup
#[derive(Debug)]
pub struct BackupResult {
    pub archive: Archive,

    /// Extra keys returned by the post-backup hook
    pub metadata: HookPayload,

    pub duration: Duration,
}

/// Runs backups for profiles against one storage root
pub struct BackupEngine<'a> {
    store: ArchiveStore,
    env: &'a EnvSnapshot,
    plugins: Arc<RegistrySnapshot>,
}

impl<'a> BackupEngine<'a> {
    pub fn new(
        storage_root: impl Into<PathBuf>,
        env: &'a EnvSnapshot,
        plugins: Arc<RegistrySnapshot>,
    ) -> Self {
        Self {
            store: ArchiveStore::new(storage_root),
            env,
            plugins,
        }
    }

    /// Archives the profile's save folder. No automatic retry on failure.
    pub fn run_backup(&self, profile: &Profile) -> Result<BackupResult, EngineError> {
        let started = Instant::now();
        let _lock = ProfileLock::acquire(self.store.root(), &profile.name).map_err(|e| {
            EngineError::Lock {
                profile: profile.name.clone(),
                source: e,
            }
        })?;

        let source = self.env.expand(&profile.contracted_path);
        if !source.exists() {
            return Err(EngineError::PathNotFound(source));
        }

        let plugin = plugin_for(&self.plugins, profile);

        let mut effective = source;
        if let Some(plugin) = plugin {
            let payload = plugin
                .preprocess_backup(profile_payload(profile))
                .map_err(|e| hook_failed(plugin, HookPoint::PreBackup, e))?;
            match payload.get("source_path") {
                Some(Value::String(path)) => effective = self.env.expand(path),
                Some(_) => {
                    return Err(EngineError::InvalidHookPayload {
                        plugin: plugin.game_id().to_string(),
                        hook: HookPoint::PreBackup.label(),
                        key: "source_path",
                    })
                }
                None => {}
            }
        }

        let archive = self.store.write_archive(
            &effective,
            ArchiveKind::Regular,
            &profile.name,
            profile.compression_enabled,
        )?;

        let mut metadata = HookPayload::new();
        if let Some(plugin) = plugin {
            let mut payload = HookPayload::new();
            payload.insert(
                "backup_path".to_string(),
                Value::from(archive.file_path.to_string_lossy().into_owned()),
            );
            let returned = plugin
                .postprocess_backup(payload)
                .map_err(|e| hook_failed(plugin, HookPoint::PostBackup, e))?;

            // Keys the engine models stay out of the metadata; everything
            // else passes through opaquely.
            for (key, value) in returned {
                if key != "backup_path" {
                    metadata.insert(key, value);
                }
            }
        }

        if !metadata.is_empty() {
            self.persist_metadata(&archive, &metadata)?;
        }

        Ok(BackupResult {
            archive,
            metadata,
            duration: started.elapsed(),
        })
    }

    /// Writes hook metadata as a sidecar next to the archive
    fn persist_metadata(
        &self,
        archive: &Archive,
        metadata: &HookPayload,
    ) -> Result<(), EngineError> {
        let sidecar = archive.file_path.with_extension("zip.meta.json");
        let content = serde_json::to_string_pretty(metadata)
            .expect("hook payloads are valid JSON by construction");
        fs::write(&sidecar, content).map_err(|e| {
            EngineError::Store(ArchiveStoreError::Io {
                path: sidecar,
                source: e,
            })
        })
    }
}
