//! Plugin discovery and loading
//!
//! Units come from two places:
//! 1. Code factories compiled into the binary (each returns zero or more
//!    plugin instances)
//! 2. A declarative descriptor list, `plugins/games.jsonc`, tolerant of
//!    `//` comment lines
//!
//! Loading is best-effort per unit: a bad entry is recorded in the report
//! and skipped, and a `game_id` collision keeps the first-loaded unit.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use super::descriptor::{PluginDescriptor, RegistryLookup};
use super::hooks::SavePlugin;
use super::registry::{LoadReport, PluginLoadError, RegistrySnapshot, UnitOutcome};

/// Default descriptor list file name (searched under the config
/// directory's `plugins/` folder)
pub const DESCRIPTOR_FILE: &str = "games.jsonc";

/// A code-defined plugin unit: a factory returning plugin instances
pub type PluginFactory = fn() -> Vec<Arc<dyn SavePlugin>>;

/// Where the registry discovers its units
pub struct PluginSources {
    factories: Vec<PluginFactory>,
    descriptor_file: Option<PathBuf>,
}

impl PluginSources {
    pub fn new(factories: Vec<PluginFactory>, descriptor_file: Option<PathBuf>) -> Self {
        Self {
            factories,
            descriptor_file,
        }
    }

    /// Code units only (mostly used by tests)
    pub fn with_factories(factories: Vec<PluginFactory>) -> Self {
        Self::new(factories, None)
    }

    /// The bundled factories plus an optional descriptor list
    pub fn bundled(descriptor_file: Option<PathBuf>) -> Self {
        Self::new(super::builtin::bundled_factories(), descriptor_file)
    }
}

/// Strips `//` comment lines so the descriptor list can be annotated
pub fn jsonc_to_json(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One entry of the declarative descriptor list
#[derive(Debug, Deserialize)]
struct DescriptorEntry {
    id: String,
    name: String,
    save_paths: Vec<String>,
    #[serde(default)]
    file_patterns: Vec<String>,
    #[serde(default)]
    registry_keys: Vec<RegistryLookup>,
}

/// Declarative unit normalized behind the capability trait; hooks are the
/// identity defaults
struct DescriptorPlugin {
    descriptor: PluginDescriptor,
}

impl DescriptorPlugin {
    fn from_entry(entry: DescriptorEntry) -> Self {
        let file_patterns = if entry.file_patterns.is_empty() {
            vec!["*".to_string()]
        } else {
            entry.file_patterns
        };
        Self {
            descriptor: PluginDescriptor {
                game_id: entry.id,
                game_name: entry.name,
                save_paths: entry.save_paths,
                file_patterns,
                registry_lookups: entry.registry_keys,
                hooks: vec![],
            },
        }
    }
}

impl SavePlugin for DescriptorPlugin {
    fn game_id(&self) -> &str {
        &self.descriptor.game_id
    }

    fn game_name(&self) -> &str {
        &self.descriptor.game_name
    }

    fn save_paths(&self) -> Vec<String> {
        self.descriptor.save_paths.clone()
    }

    fn file_patterns(&self) -> Vec<String> {
        self.descriptor.file_patterns.clone()
    }

    fn registry_lookups(&self) -> Vec<RegistryLookup> {
        self.descriptor.registry_lookups.clone()
    }

    fn descriptor(&self) -> PluginDescriptor {
        self.descriptor.clone()
    }
}

/// Builds a complete snapshot from the sources. Never fails; per-unit
/// problems land in the report.
pub(super) fn build_snapshot(sources: &PluginSources) -> RegistrySnapshot {
    let mut plugins: BTreeMap<String, Arc<dyn SavePlugin>> = BTreeMap::new();
    let mut outcomes = Vec::new();

    // Code units load first, matching their precedence on id collisions
    for factory in &sources.factories {
        for plugin in factory() {
            let id = plugin.game_id().to_string();
            let unit = if id.is_empty() {
                format!("code:'{}'", plugin.game_name())
            } else {
                format!("code:{}", id)
            };
            register(&mut plugins, &mut outcomes, unit, plugin);
        }
    }

    if let Some(path) = &sources.descriptor_file {
        load_descriptor_file(path, &mut plugins, &mut outcomes);
    }

    RegistrySnapshot::new(plugins, LoadReport { outcomes })
}

fn register(
    plugins: &mut BTreeMap<String, Arc<dyn SavePlugin>>,
    outcomes: &mut Vec<UnitOutcome>,
    unit: String,
    plugin: Arc<dyn SavePlugin>,
) {
    let descriptor = plugin.descriptor();
    if let Err(error) = validate(&descriptor) {
        outcomes.push(UnitOutcome::rejected(unit, &error));
        return;
    }

    if plugins.contains_key(&descriptor.game_id) {
        let error = PluginLoadError::DuplicateIdentity(descriptor.game_id.clone());
        outcomes.push(UnitOutcome::rejected(unit, &error));
        return;
    }

    outcomes.push(UnitOutcome::loaded(unit, descriptor.game_id.clone()));
    plugins.insert(descriptor.game_id, plugin);
}

fn validate(descriptor: &PluginDescriptor) -> Result<(), PluginLoadError> {
    if descriptor.game_id.trim().is_empty() {
        return Err(PluginLoadError::MissingField("id"));
    }
    if descriptor.game_name.trim().is_empty() {
        return Err(PluginLoadError::MissingField("name"));
    }
    if descriptor.save_paths.is_empty() {
        return Err(PluginLoadError::NoSavePaths);
    }
    Ok(())
}

fn load_descriptor_file(
    path: &std::path::Path,
    plugins: &mut BTreeMap<String, Arc<dyn SavePlugin>>,
    outcomes: &mut Vec<UnitOutcome>,
) {
    if !path.exists() {
        return;
    }
    let unit_base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            let error = PluginLoadError::Unreadable(e.to_string());
            outcomes.push(UnitOutcome::rejected(unit_base, &error));
            return;
        }
    };

    let entries = match serde_json::from_str::<Value>(&jsonc_to_json(&text)) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => {
            let error = PluginLoadError::Unreadable("expected a JSON array".to_string());
            outcomes.push(UnitOutcome::rejected(unit_base, &error));
            return;
        }
        Err(e) => {
            let error = PluginLoadError::Unreadable(e.to_string());
            outcomes.push(UnitOutcome::rejected(unit_base, &error));
            return;
        }
    };

    for (index, entry) in entries.into_iter().enumerate() {
        let unit = format!("{}[{}]", unit_base, index);
        match serde_json::from_value::<DescriptorEntry>(entry) {
            Ok(entry) => {
                let plugin: Arc<dyn SavePlugin> = Arc::new(DescriptorPlugin::from_entry(entry));
                register(plugins, outcomes, unit, plugin);
            }
            Err(e) => {
                let error = PluginLoadError::Malformed(e.to_string());
                outcomes.push(UnitOutcome::rejected(unit, &error));
            }
        }
    }
}
