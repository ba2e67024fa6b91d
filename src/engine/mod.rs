//! # Backup/Restore Engine
//!
//! Orchestrates the two pipelines over the archive store, the path
//! contractor and the plugin registry:
//!
//! ```text
//! backup:  expand path -> pre-hook -> pack archive -> post-hook
//! restore: pre-hook -> safety archive -> clear? -> extract -> post-hook
//! ```
//!
//! Failures abort the current invocation only and always name what went
//! wrong; restore failures additionally name the step that aborted. Both
//! pipelines hold a per-profile lock for their whole run, so concurrent
//! operations on the same profile serialize while different profiles
//! proceed independently.

mod backup;
mod locks;
mod restore;

pub use backup::{BackupEngine, BackupResult};
pub use locks::ProfileLock;
pub use restore::{RestoreEngine, RestoreError, RestoreResult, RestoreStep};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::domain::Profile;
use crate::plugin::{HookError, HookPayload, HookPoint, RegistrySnapshot, SavePlugin};
use crate::storage::ArchiveStoreError;

/// Failures shared by both pipelines
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Save folder not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Plugin '{plugin}' {hook} hook failed: {source}")]
    PluginHook {
        plugin: String,
        hook: &'static str,
        #[source]
        source: HookError,
    },

    #[error("Plugin '{plugin}' {hook} hook returned a non-string '{key}'")]
    InvalidHookPayload {
        plugin: String,
        hook: &'static str,
        key: &'static str,
    },

    #[error("Could not lock profile '{profile}' for exclusive access")]
    Lock {
        profile: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to clear save folder {path}")]
    Clear {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Store(#[from] ArchiveStoreError),
}

/// Resolves the plugin whose hooks run for this profile, if it links one
/// and the plugin is loaded
fn plugin_for<'s>(
    plugins: &'s RegistrySnapshot,
    profile: &Profile,
) -> Option<&'s Arc<dyn SavePlugin>> {
    profile.plugin_id.as_deref().and_then(|id| plugins.get(id))
}

/// Seeds the pre-hook payload from the profile. `source_path` is the key
/// the engine models; hooks may rewrite it to redirect the pipeline.
fn profile_payload(profile: &Profile) -> HookPayload {
    let mut payload = HookPayload::new();
    payload.insert("profile_id".to_string(), Value::from(profile.id.as_str()));
    payload.insert("name".to_string(), Value::from(profile.name.as_str()));
    payload.insert(
        "source_path".to_string(),
        Value::from(profile.contracted_path.as_str()),
    );
    payload.insert(
        "compression_enabled".to_string(),
        Value::from(profile.compression_enabled),
    );
    payload.insert(
        "clear_folder_on_restore".to_string(),
        Value::from(profile.clear_folder_on_restore),
    );
    payload
}

fn hook_failed(plugin: &Arc<dyn SavePlugin>, point: HookPoint, source: HookError) -> EngineError {
    EngineError::PluginHook {
        plugin: plugin.game_id().to_string(),
        hook: point.label(),
        source,
    }
}
