//! Normalized plugin descriptor
//!
//! The common shape every plugin unit reduces to: identity, detection
//! data, and the hook points it provides. The engine only ever sees this
//! normal form (plus the hook methods on the trait object).

use serde::{Deserialize, Serialize};

use crate::domain::{EnvSnapshot, Profile, ProfileId};

use super::hooks::HookPoint;

/// A Windows registry probe: open `key_path`, read `value_name`, and
/// treat the game as installed when the value expands to an existing
/// folder. Serialized as a `[key_path, value_name]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct RegistryLookup {
    pub key_path: String,
    pub value_name: String,
}

impl From<(String, String)> for RegistryLookup {
    fn from((key_path, value_name): (String, String)) -> Self {
        Self {
            key_path,
            value_name,
        }
    }
}

impl From<RegistryLookup> for (String, String) {
    fn from(lookup: RegistryLookup) -> Self {
        (lookup.key_path, lookup.value_name)
    }
}

/// Identity and detection data for one pluggable game
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginDescriptor {
    /// Stable unique identifier; profiles link back to it
    pub game_id: String,

    pub game_name: String,

    /// Candidate save folders in contracted form, in preference order
    pub save_paths: Vec<String>,

    /// Informational glob patterns; not enforced on archive contents
    pub file_patterns: Vec<String>,

    pub registry_lookups: Vec<RegistryLookup>,

    /// Hook points this unit actually implements
    pub hooks: Vec<HookPoint>,
}

impl PluginDescriptor {
    /// Returns the first `save_paths` entry that exists after expansion
    /// (declaration order is the precedence order), still in contracted
    /// form so callers can store it portably
    pub fn detected_path(&self, env: &EnvSnapshot) -> Option<&str> {
        self.save_paths
            .iter()
            .map(String::as_str)
            .find(|path| env.expand(path).exists())
    }

    /// Builds a profile pre-filled from this descriptor, using the
    /// detected save path when one exists and the first candidate
    /// otherwise
    pub fn to_profile(&self, env: &EnvSnapshot) -> Profile {
        let contracted_path = self
            .detected_path(env)
            .unwrap_or_else(|| self.save_paths.first().map(String::as_str).unwrap_or(""))
            .to_string();

        Profile {
            id: ProfileId::for_plugin(&self.game_id),
            name: self.game_name.clone(),
            contracted_path,
            compression_enabled: true,
            clear_folder_on_restore: true,
            plugin_id: Some(self.game_id.clone()),
        }
    }
}
