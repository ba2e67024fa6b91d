//! Restore pipeline
//!
//! State machine: `Start -> PreHook -> SafetyArchive -> Clear? -> Extract
//! -> PostHook -> Done`, aborting to `Failed{step, cause}` on the first
//! error.
//!
//! The safety archive is the non-negotiable invariant: whenever the
//! target folder holds data, a snapshot of it is written and flushed
//! before anything destructive runs. If that snapshot cannot be written,
//! the restore stops with the target unmodified.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Archive, ArchiveKind, EnvSnapshot, Profile};
use crate::plugin::{HookPayload, HookPoint, RegistrySnapshot};
use crate::storage::{ArchiveStore, ArchiveStoreError};

use super::locks::ProfileLock;
use super::{hook_failed, plugin_for, profile_payload, EngineError};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreStep {
    Start,
    PreHook,
    SafetyArchive,
    Clear,
    Extract,
    PostHook,
}

impl RestoreStep {
    pub fn label(&self) -> &'static str {
        match self {
            RestoreStep::Start => "start",
            RestoreStep::PreHook => "pre-hook",
            RestoreStep::SafetyArchive => "safety-archive",
            RestoreStep::Clear => "clear",
            RestoreStep::Extract => "extract",
            RestoreStep::PostHook => "post-hook",
        }
    }
}

/// A restore failure, identifying the step that aborted the pipeline
#[derive(Debug, Error)]
#[error("Restore failed at {} step: {cause}", step.label())]
pub struct RestoreError {
    pub step: RestoreStep,
    #[source]
    pub cause: EngineError,
}

/// Outcome of a successful restore
#[derive(Debug)]
pub struct RestoreResult {
    /// The archive that was restored
    pub restored: Archive,

    /// The pre-restore snapshot, when the target held data
    pub safety_archive: Option<Archive>,

    /// Extra keys returned by the post-restore hook
    pub metadata: HookPayload,

    pub duration: Duration,
}

/// Runs restores for profiles against one storage root
pub struct RestoreEngine<'a> {
    store: ArchiveStore,
    env: &'a EnvSnapshot,
    plugins: Arc<RegistrySnapshot>,
}

impl<'a> RestoreEngine<'a> {
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

    /// Restores `archive` into the profile's save folder
    pub fn run_restore(
        &self,
        profile: &Profile,
        archive: &Archive,
    ) -> Result<RestoreResult, RestoreError> {
        let started = Instant::now();
        let fail = |step: RestoreStep, cause: EngineError| RestoreError { step, cause };

        let _lock = ProfileLock::acquire(self.store.root(), &profile.name).map_err(|e| {
            fail(
                RestoreStep::Start,
                EngineError::Lock {
                    profile: profile.name.clone(),
                    source: e,
                },
            )
        })?;

        let target = self.env.expand(&profile.contracted_path);
        let plugin = plugin_for(&self.plugins, profile);

        // PreHook: runs before anything destructive, so its failure
        // leaves the target pristine
        if let Some(plugin) = plugin {
            plugin
                .preprocess_restore(profile_payload(profile))
                .map_err(|e| fail(RestoreStep::PreHook, hook_failed(plugin, HookPoint::PreRestore, e)))?;
        }

        // SafetyArchive: always attempted when the target holds anything
        let safety_archive = if folder_has_entries(&target) {
            match self
                .store
                .write_archive(&target, ArchiveKind::Safety, &profile.name, true)
            {
                Ok(archive) => Some(archive),
                // Only empty subfolders inside: nothing to protect
                Err(ArchiveStoreError::EmptySource(_)) => None,
                Err(e) => return Err(fail(RestoreStep::SafetyArchive, e.into())),
            }
        } else {
            None
        };

        // Clear: only once the safety archive is durably on disk
        if profile.clear_folder_on_restore && target.exists() {
            fs::remove_dir_all(&target)
                .and_then(|_| fs::create_dir_all(&target))
                .map_err(|e| {
                    fail(
                        RestoreStep::Clear,
                        EngineError::Clear {
                            path: target.clone(),
                            source: e,
                        },
                    )
                })?;
        }

        self.store
            .extract_archive(&archive.file_path, &target)
            .map_err(|e| fail(RestoreStep::Extract, e.into()))?;

        let mut metadata = HookPayload::new();
        if let Some(plugin) = plugin {
            let mut payload = HookPayload::new();
            payload.insert(
                "restore_path".to_string(),
                Value::from(target.to_string_lossy().into_owned()),
            );
            if let Some(safety) = &safety_archive {
                payload.insert(
                    "safety_archive_path".to_string(),
                    Value::from(safety.file_path.to_string_lossy().into_owned()),
                );
            }
            let returned = plugin
                .postprocess_restore(payload)
                .map_err(|e| fail(RestoreStep::PostHook, hook_failed(plugin, HookPoint::PostRestore, e)))?;

            for (key, value) in returned {
                if key != "restore_path" && key != "safety_archive_path" {
                    metadata.insert(key, value);
                }
            }
        }

        Ok(RestoreResult {
            restored: archive.clone(),
            safety_archive,
            metadata,
            duration: started.elapsed(),
        })
    }
}

/// True when the path is a folder with at least one entry
fn folder_has_entries(path: &Path) -> bool {
    path.is_dir()
        && fs::read_dir(path)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
}
