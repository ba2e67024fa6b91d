//! Plugin capability trait and hook contracts
//!
//! Hooks receive and return a flat JSON object. The engine validates only
//! the keys it models (`source_path`, `backup_path`, `restore_path`,
//! `safety_archive_path`); everything else passes through opaquely so
//! plugins can attach their own data (checksums, notes) without engine
//! changes.

use serde_json::{Map, Value};
use serde::Serialize;
use thiserror::Error;

use super::descriptor::{PluginDescriptor, RegistryLookup};

/// Structured mapping passed through hooks
pub type HookPayload = Map<String, Value>;

/// The fixed pipeline stages a plugin can hook into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPoint {
    PreBackup,
    PostBackup,
    PreRestore,
    PostRestore,
}

impl HookPoint {
    pub fn label(&self) -> &'static str {
        match self {
            HookPoint::PreBackup => "preprocess_backup",
            HookPoint::PostBackup => "postprocess_backup",
            HookPoint::PreRestore => "preprocess_restore",
            HookPoint::PostRestore => "postprocess_restore",
        }
    }
}

/// Failure raised inside a hook implementation. The engine wraps it with
/// the owning plugin and hook point before reporting.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Capability interface every plugin unit exposes: identity, detection
/// data, and optional lifecycle hooks.
///
/// Hooks default to identity transforms, so a descriptor-only unit and a
/// code unit look the same to the engine. Implementations that do hook in
/// should also override [`provided_hooks`](Self::provided_hooks) so the
/// capability shows up in the descriptor.
pub trait SavePlugin: Send + Sync {
    /// Stable unique identifier for the game
    fn game_id(&self) -> &str;

    /// Display name for the game
    fn game_name(&self) -> &str;

    /// Candidate save folders in contracted form, in preference order
    fn save_paths(&self) -> Vec<String>;

    fn file_patterns(&self) -> Vec<String> {
        vec!["*".to_string()]
    }

    fn registry_lookups(&self) -> Vec<RegistryLookup> {
        Vec::new()
    }

    /// Hook points this unit implements (capability advertisement only;
    /// unlisted hooks still run as identity transforms)
    fn provided_hooks(&self) -> Vec<HookPoint> {
        Vec::new()
    }

    /// Runs before a backup; may rewrite `source_path` or stage files
    fn preprocess_backup(&self, payload: HookPayload) -> Result<HookPayload, HookError> {
        Ok(payload)
    }

    /// Runs after a successful backup; returned extra keys become result
    /// metadata
    fn postprocess_backup(&self, payload: HookPayload) -> Result<HookPayload, HookError> {
        Ok(payload)
    }

    /// Runs before any destructive restore step
    fn preprocess_restore(&self, payload: HookPayload) -> Result<HookPayload, HookError> {
        Ok(payload)
    }

    /// Runs after extraction; returned extra keys become result metadata
    fn postprocess_restore(&self, payload: HookPayload) -> Result<HookPayload, HookError> {
        Ok(payload)
    }

    /// Normal form consumed by the registry, detection and the CLI
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            game_id: self.game_id().to_string(),
            game_name: self.game_name().to_string(),
            save_paths: self.save_paths(),
            file_patterns: self.file_patterns(),
            registry_lookups: self.registry_lookups(),
            hooks: self.provided_hooks(),
        }
    }
}
