//! Save profile model and in-memory registry
//!
//! A profile ties a display name to a save folder (stored in contracted
//! form) plus per-profile backup behavior. The registry is the in-memory
//! view; it loads from and serializes to an opaque JSON value, while file
//! I/O lives in the storage layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use super::path::{clean_input_path, EnvSnapshot};
use super::ProfileId;

#[derive(Debug, Error, PartialEq)]
pub enum ProfileError {
    #[error("A profile with ID '{0}' already exists")]
    DuplicateId(ProfileId),

    #[error("No profile matching '{0}'")]
    NotFound(String),
}

fn default_true() -> bool {
    true
}

/// A per-application save profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,

    /// Display name; also the archive folder name under the storage root
    pub name: String,

    /// Save folder in contracted (portable) form
    pub contracted_path: String,

    /// Deflate archives for this profile (stored uncompressed otherwise)
    #[serde(default = "default_true")]
    pub compression_enabled: bool,

    /// Wipe the save folder before extracting on restore
    #[serde(default = "default_true")]
    pub clear_folder_on_restore: bool,

    /// Plugin whose hooks run for this profile's backups and restores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
}

impl Profile {
    /// Creates a user-defined profile, cleaning and contracting the
    /// supplied save path
    pub fn new(name: impl Into<String>, raw_path: &str, env: &EnvSnapshot) -> Self {
        let name = name.into();
        let id = ProfileId::generate(&name, chrono::Utc::now());
        Self {
            id,
            name,
            contracted_path: env.contract(&clean_input_path(raw_path)),
            compression_enabled: true,
            clear_folder_on_restore: true,
            plugin_id: None,
        }
    }

    /// Parses a profile from a stored JSON object.
    ///
    /// Tolerant of paths saved in non-portable form: a literal absolute
    /// path is re-contracted, and an accidental absolute prefix glued in
    /// front of a variable token (e.g. `C:\...\%PUBLIC%\...`) is stripped
    /// so only the portable part remains. Returns `None` for entries
    /// missing required fields.
    pub fn from_value(value: &Value, env: &EnvSnapshot) -> Option<Self> {
        let mut profile: Profile = serde_json::from_value(value.clone()).ok()?;
        profile.contracted_path = repair_contracted_path(&profile.contracted_path, env);
        Some(profile)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("profile serialization cannot fail")
    }
}

fn repair_contracted_path(raw: &str, env: &EnvSnapshot) -> String {
    let raw = raw.trim();
    let raw = match raw.find(['%', '$']) {
        Some(i) if i > 0 => &raw[i..],
        _ => raw,
    };
    if raw.is_empty() || raw.starts_with(['%', '$']) {
        raw.to_string()
    } else {
        env.contract(&clean_input_path(raw))
    }
}

/// In-memory collection of profiles, keyed by ID
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<ProfileId, Profile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from an opaque config value (a JSON array of
    /// profile objects). Malformed entries are skipped, not fatal; the
    /// count of skipped entries is returned alongside.
    pub fn load(config: &Value, env: &EnvSnapshot) -> (Self, usize) {
        let mut registry = Self::new();
        let mut skipped = 0;

        if let Some(entries) = config.as_array() {
            for entry in entries {
                match Profile::from_value(entry, env) {
                    // Last one wins on (unexpected) duplicate IDs in a
                    // hand-edited file.
                    Some(profile) => {
                        registry.profiles.insert(profile.id.clone(), profile);
                    }
                    None => skipped += 1,
                }
            }
        }

        (registry, skipped)
    }

    /// Serializes all profiles back into the opaque config value
    pub fn serialize(&self) -> Value {
        Value::Array(self.profiles.values().map(Profile::to_value).collect())
    }

    pub fn insert(&mut self, profile: Profile) -> Result<(), ProfileError> {
        if self.profiles.contains_key(&profile.id) {
            return Err(ProfileError::DuplicateId(profile.id));
        }
        self.profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    pub fn get(&self, id: &ProfileId) -> Option<&Profile> {
        self.profiles.get(id)
    }

    pub fn get_mut(&mut self, id: &ProfileId) -> Option<&mut Profile> {
        self.profiles.get_mut(id)
    }

    /// Removes a profile. Existing archives are untouched; only the
    /// registry entry goes away.
    pub fn remove(&mut self, id: &ProfileId) -> Option<Profile> {
        self.profiles.remove(id)
    }

    /// Resolves a user-supplied key to a profile: exact ID first, then a
    /// case-insensitive unique name match
    pub fn find(&self, key: &str) -> Result<&Profile, ProfileError> {
        if let Ok(id) = key.parse::<ProfileId>() {
            if let Some(profile) = self.profiles.get(&id) {
                return Ok(profile);
            }
        }

        let matches: Vec<&Profile> = self
            .profiles
            .values()
            .filter(|p| p.name.eq_ignore_ascii_case(key))
            .collect();
        match matches.as_slice() {
            [one] => Ok(*one),
            _ => Err(ProfileError::NotFound(key.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn env() -> EnvSnapshot {
        EnvSnapshot::default()
    }

    #[test]
    fn new_profile_defaults() {
        let profile = Profile::new("Game", "/saves/game", &env());

        assert_eq!(profile.name, "Game");
        assert!(profile.compression_enabled);
        assert!(profile.clear_folder_on_restore);
        assert!(profile.plugin_id.is_none());
    }

    #[test]
    fn from_value_applies_flag_defaults() {
        let value = json!({
            "id": "p-1234567",
            "name": "Game",
            "contracted_path": "$HOME/saves"
        });

        let profile = Profile::from_value(&value, &env()).unwrap();
        assert!(profile.compression_enabled);
        assert!(profile.clear_folder_on_restore);
    }

    #[test]
    fn from_value_rejects_missing_id() {
        let value = json!({"name": "Game", "contracted_path": "$HOME/saves"});
        assert!(Profile::from_value(&value, &env()).is_none());
    }

    #[test]
    fn from_value_strips_absolute_prefix_before_token() {
        let value = json!({
            "id": "p-1234567",
            "name": "Game",
            "contracted_path": "C:\\Users\\old\\%PUBLIC%\\Documents\\Saves"
        });

        let profile = Profile::from_value(&value, &env()).unwrap();
        assert_eq!(profile.contracted_path, "%PUBLIC%\\Documents\\Saves");
    }

    #[test]
    fn from_value_recontracts_literal_path() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().to_str().unwrap().to_string();
        let env = EnvSnapshot::from_vars([("SAVEROOT".to_string(), base.clone())]);

        let literal = format!("{}{}Game", base, std::path::MAIN_SEPARATOR);
        let value = json!({
            "id": "p-1234567",
            "name": "Game",
            "contracted_path": literal
        });

        let profile = Profile::from_value(&value, &env).unwrap();
        assert!(
            profile.contracted_path.contains("SAVEROOT"),
            "got {}",
            profile.contracted_path
        );
    }

    #[test]
    fn registry_load_skips_malformed_entries() {
        let config = json!([
            {"id": "p-1234567", "name": "Good", "contracted_path": "$HOME/a"},
            {"name": "No id"},
            42
        ]);

        let (registry, skipped) = ProfileRegistry::load(&config, &env());
        assert_eq!(registry.len(), 1);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn registry_serialize_round_trip() {
        let mut registry = ProfileRegistry::new();
        registry
            .insert(Profile::new("Game", "/saves/game", &env()))
            .unwrap();

        let value = registry.serialize();
        let (reloaded, skipped) = ProfileRegistry::load(&value, &env());

        assert_eq!(skipped, 0);
        assert_eq!(reloaded.len(), 1);
        let original = registry.iter().next().unwrap();
        assert_eq!(reloaded.get(&original.id), Some(original));
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let mut registry = ProfileRegistry::new();
        let profile = Profile::new("Game", "/saves/game", &env());
        let dup = profile.clone();

        registry.insert(profile).unwrap();
        let err = registry.insert(dup).unwrap_err();
        assert!(matches!(err, ProfileError::DuplicateId(_)));
    }

    #[test]
    fn remove_returns_profile() {
        let mut registry = ProfileRegistry::new();
        let profile = Profile::new("Game", "/saves/game", &env());
        let id = profile.id.clone();
        registry.insert(profile).unwrap();

        assert!(registry.remove(&id).is_some());
        assert!(registry.is_empty());
        assert!(registry.remove(&id).is_none());
    }

    #[test]
    fn find_by_id_and_name() {
        let mut registry = ProfileRegistry::new();
        let profile = Profile::new("My Game", "/saves/game", &env());
        let id = profile.id.clone();
        registry.insert(profile).unwrap();

        assert!(registry.find(id.as_str()).is_ok());
        assert!(registry.find("my game").is_ok());
        assert!(registry.find("unknown").is_err());
    }

    #[test]
    fn find_rejects_ambiguous_name() {
        let mut registry = ProfileRegistry::new();
        let a = Profile::new("Game", "/saves/a", &env());
        let mut b = Profile::new("game", "/saves/b", &env());
        // Regenerate to guarantee distinct IDs even within one nanosecond
        b.id = ProfileId::for_plugin("other");
        registry.insert(a).unwrap();
        registry.insert(b).unwrap();

        assert!(registry.find("game").is_err());
    }
}
