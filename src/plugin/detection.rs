//! Installed-game detection
//!
//! Two read-only heuristics per descriptor:
//! (a) any candidate save path exists after expansion, or
//! (b) a registry lookup resolves to a value that expands to an existing
//!     folder (Windows only).
//!
//! Detection never creates profiles; adopting a detected game into a
//! profile is a separate, explicit action.

use serde::Serialize;

use crate::domain::EnvSnapshot;

use super::descriptor::PluginDescriptor;
use super::registry::RegistrySnapshot;

/// Evidence that a plugin's game is installed. A matched save path is the
/// stronger signal; registry-only detections still need the user to point
/// at the actual save folder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub descriptor: PluginDescriptor,

    /// The contracted save path that existed, when path evidence matched
    pub matched_path: Option<String>,

    /// Set when a registry lookup supplied the evidence instead
    pub via_registry: bool,
}

/// Runs both heuristics against every plugin in the snapshot. Read-only
/// and deterministic for an unchanged filesystem.
pub fn detect(snapshot: &RegistrySnapshot, env: &EnvSnapshot) -> Vec<Detection> {
    let mut detections = Vec::new();

    for plugin in snapshot.iter() {
        let descriptor = plugin.descriptor();
        let matched_path = descriptor.detected_path(env).map(str::to_string);
        let via_registry =
            matched_path.is_none() && registry_lookup_hits(&descriptor, env);

        if matched_path.is_some() || via_registry {
            detections.push(Detection {
                descriptor,
                matched_path,
                via_registry,
            });
        }
    }

    detections
}

#[cfg(windows)]
fn registry_lookup_hits(descriptor: &PluginDescriptor, env: &EnvSnapshot) -> bool {
    use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE};
    use winreg::RegKey;

    for lookup in &descriptor.registry_lookups {
        let (hive, subkey) = if let Some(rest) =
            lookup.key_path.strip_prefix("HKEY_LOCAL_MACHINE\\")
        {
            (RegKey::predef(HKEY_LOCAL_MACHINE), rest)
        } else if let Some(rest) = lookup.key_path.strip_prefix("HKEY_CURRENT_USER\\") {
            (RegKey::predef(HKEY_CURRENT_USER), rest)
        } else {
            continue;
        };

        let Ok(key) = hive.open_subkey(subkey) else {
            continue;
        };
        let Ok(value) = key.get_value::<String, _>(&lookup.value_name) else {
            continue;
        };
        if !value.is_empty() && env.expand(&value).exists() {
            return true;
        }
    }

    false
}

/// Registry lookups are a Windows-only signal; elsewhere they never match
#[cfg(not(windows))]
fn registry_lookup_hits(_descriptor: &PluginDescriptor, _env: &EnvSnapshot) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{PluginRegistry, PluginSources};
    use std::fs;
    use tempfile::TempDir;

    fn registry_with(descriptors: &str) -> (TempDir, PluginRegistry) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("games.jsonc");
        fs::write(&path, descriptors).unwrap();
        let registry = PluginRegistry::load(PluginSources::new(vec![], Some(path)));
        (dir, registry)
    }

    #[test]
    fn detects_game_with_existing_save_path() {
        let saves = TempDir::new().unwrap();
        let save_dir = saves.path().join("GameSaves");
        fs::create_dir_all(&save_dir).unwrap();

        let env = EnvSnapshot::from_vars([(
            "SAVEHOME".to_string(),
            saves.path().to_str().unwrap().to_string(),
        )]);

        let (_dir, registry) = registry_with(
            r#"[
                {"id": "found", "name": "Found", "save_paths": ["$SAVEHOME/GameSaves"]},
                {"id": "missing", "name": "Missing", "save_paths": ["$SAVEHOME/NotThere"]}
            ]"#,
        );

        let detections = detect(&registry.snapshot(), &env);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].descriptor.game_id, "found");
        assert_eq!(detections[0].matched_path.as_deref(), Some("$SAVEHOME/GameSaves"));
        assert!(!detections[0].via_registry);
    }

    #[test]
    fn first_existing_path_wins_in_declaration_order() {
        let saves = TempDir::new().unwrap();
        fs::create_dir_all(saves.path().join("first")).unwrap();
        fs::create_dir_all(saves.path().join("second")).unwrap();

        let env = EnvSnapshot::from_vars([(
            "SAVEHOME".to_string(),
            saves.path().to_str().unwrap().to_string(),
        )]);

        let (_dir, registry) = registry_with(
            r#"[{
                "id": "multi",
                "name": "Multi",
                "save_paths": ["$SAVEHOME/first", "$SAVEHOME/second"]
            }]"#,
        );

        let detections = detect(&registry.snapshot(), &env);
        assert_eq!(detections[0].matched_path.as_deref(), Some("$SAVEHOME/first"));
    }

    #[test]
    fn detection_is_idempotent() {
        let saves = TempDir::new().unwrap();
        fs::create_dir_all(saves.path().join("GameSaves")).unwrap();

        let env = EnvSnapshot::from_vars([(
            "SAVEHOME".to_string(),
            saves.path().to_str().unwrap().to_string(),
        )]);

        let (_dir, registry) = registry_with(
            r#"[{"id": "found", "name": "Found", "save_paths": ["$SAVEHOME/GameSaves"]}]"#,
        );

        let snapshot = registry.snapshot();
        let first = detect(&snapshot, &env);
        let second = detect(&snapshot, &env);
        assert_eq!(first, second);
    }

    #[test]
    fn nothing_installed_detects_nothing() {
        let env = EnvSnapshot::default();
        let (_dir, registry) = registry_with(
            r#"[{"id": "ghost", "name": "Ghost", "save_paths": ["/nowhere/at/all"]}]"#,
        );

        assert!(detect(&registry.snapshot(), &env).is_empty());
    }

    #[cfg(not(windows))]
    #[test]
    fn registry_lookups_never_match_off_windows() {
        let env = EnvSnapshot::default();
        let (_dir, registry) = registry_with(
            r#"[{
                "id": "reg_only",
                "name": "Registry Only",
                "save_paths": ["/nowhere/at/all"],
                "registry_keys": [["HKEY_LOCAL_MACHINE\\SOFTWARE\\Game", "InstallPath"]]
            }]"#,
        );

        assert!(detect(&registry.snapshot(), &env).is_empty());
    }
}
