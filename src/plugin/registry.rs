//! Plugin registry with atomic snapshot swap
//!
//! The registry is an owned object, not ambient global state: consumers
//! hold an `Arc` snapshot taken at the start of an operation. `reload`
//! builds a complete new snapshot and swaps it in one move, so a reader
//! never observes a mix of old and new descriptors.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use thiserror::Error;

use super::descriptor::PluginDescriptor;
use super::hooks::SavePlugin;
use super::loader::{build_snapshot, PluginSources};

/// Per-unit load failure; collected into the report, never fatal for the
/// registry as a whole
#[derive(Debug, Error, PartialEq)]
pub enum PluginLoadError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("no save paths declared")]
    NoSavePaths,

    #[error("duplicate game_id '{0}' (first-loaded unit kept)")]
    DuplicateIdentity(String),

    #[error("malformed descriptor: {0}")]
    Malformed(String),

    #[error("descriptor list unreadable: {0}")]
    Unreadable(String),
}

/// Outcome of loading one plugin unit
#[derive(Debug, Clone, Serialize)]
pub struct UnitOutcome {
    /// Where the unit came from (e.g. `code:grim_dawn`, `games.jsonc[2]`)
    pub unit: String,

    /// The `game_id` that was registered, when loading succeeded
    pub game_id: Option<String>,

    /// The rejection reason, when loading failed
    pub error: Option<String>,
}

impl UnitOutcome {
    pub fn loaded(unit: impl Into<String>, game_id: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            game_id: Some(game_id.into()),
            error: None,
        }
    }

    pub fn rejected(unit: impl Into<String>, error: &PluginLoadError) -> Self {
        Self {
            unit: unit.into(),
            game_id: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-unit outcomes of one registry build
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub outcomes: Vec<UnitOutcome>,
}

impl LoadReport {
    pub fn loaded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_loaded()).count()
    }

    pub fn rejected(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| !o.is_loaded())
    }
}

/// An immutable view of the loaded plugins
pub struct RegistrySnapshot {
    plugins: BTreeMap<String, Arc<dyn SavePlugin>>,
    report: LoadReport,
}

impl RegistrySnapshot {
    pub(super) fn new(
        plugins: BTreeMap<String, Arc<dyn SavePlugin>>,
        report: LoadReport,
    ) -> Self {
        Self { plugins, report }
    }

    pub fn get(&self, game_id: &str) -> Option<&Arc<dyn SavePlugin>> {
        self.plugins.get(game_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SavePlugin>> {
        self.plugins.values()
    }

    pub fn descriptors(&self) -> Vec<PluginDescriptor> {
        self.plugins.values().map(|p| p.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }
}

/// Owned plugin registry; cheap to share, atomically reloadable
pub struct PluginRegistry {
    snapshot: RwLock<Arc<RegistrySnapshot>>,
    sources: PluginSources,
}

impl PluginRegistry {
    /// Loads all units from the given sources. Unit failures are recorded
    /// in the snapshot's report; this constructor itself never fails.
    pub fn load(sources: PluginSources) -> Self {
        let snapshot = Arc::new(build_snapshot(&sources));
        Self {
            snapshot: RwLock::new(snapshot),
            sources,
        }
    }

    /// Returns the current snapshot. The snapshot stays valid (and
    /// unchanged) for as long as the caller holds it, even across reloads.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot
            .read()
            .expect("plugin registry lock poisoned")
            .clone()
    }

    /// Rebuilds from the sources and swaps the snapshot in one step
    pub fn reload(&self) -> Arc<RegistrySnapshot> {
        let next = Arc::new(build_snapshot(&self.sources));
        let mut guard = self
            .snapshot
            .write()
            .expect("plugin registry lock poisoned");
        *guard = next.clone();
        next
    }
}
