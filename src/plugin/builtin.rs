//! Bundled code-defined plugins
//!
//! Each unit here is a small struct implementing [`SavePlugin`], exposed
//! through a `get_plugins`-style factory. Keep `game_id` stable once
//! shipped; profiles reference it.

use std::sync::Arc;

use serde_json::Value;

use super::descriptor::RegistryLookup;
use super::hooks::{HookError, HookPayload, HookPoint, SavePlugin};
use super::loader::PluginFactory;

/// All factories compiled into the binary
pub fn bundled_factories() -> Vec<PluginFactory> {
    vec![get_plugins]
}

/// Factory for the bundled game plugins
fn get_plugins() -> Vec<Arc<dyn SavePlugin>> {
    vec![Arc::new(AssassinsCreed3Remastered), Arc::new(StardewValley)]
}

/// Descriptor-only unit: save location and nothing else
struct AssassinsCreed3Remastered;

impl SavePlugin for AssassinsCreed3Remastered {
    fn game_id(&self) -> &str {
        "ac3_remastered"
    }

    fn game_name(&self) -> &str {
        "Assassin's Creed III Remastered"
    }

    fn save_paths(&self) -> Vec<String> {
        vec![
            "%PUBLIC%\\Documents\\uPlay\\CODEX\\Saves\\AssassinsCreedIIIRemastered".to_string(),
        ]
    }
}

/// Unit with a post-backup hook: records the archive size so the result
/// metadata carries a quick integrity reference
struct StardewValley;

impl SavePlugin for StardewValley {
    fn game_id(&self) -> &str {
        "stardew_valley"
    }

    fn game_name(&self) -> &str {
        "Stardew Valley"
    }

    fn save_paths(&self) -> Vec<String> {
        vec![
            "%APPDATA%\\StardewValley\\Saves".to_string(),
            "$HOME/.config/StardewValley/Saves".to_string(),
        ]
    }

    fn registry_lookups(&self) -> Vec<RegistryLookup> {
        vec![RegistryLookup {
            key_path: "HKEY_CURRENT_USER\\SOFTWARE\\StardewValley".to_string(),
            value_name: "InstallPath".to_string(),
        }]
    }

    fn provided_hooks(&self) -> Vec<HookPoint> {
        vec![HookPoint::PostBackup]
    }

    fn postprocess_backup(&self, mut payload: HookPayload) -> Result<HookPayload, HookError> {
        if let Some(Value::String(path)) = payload.get("backup_path") {
            let size = std::fs::metadata(path)
                .map_err(|e| HookError::new(format!("cannot stat backup archive: {e}")))?
                .len();
            payload.insert("archive_bytes".to_string(), Value::from(size));
        }
        Ok(payload)
    }
}
