//! Profile identifiers
//!
//! ID Format:
//! - User-created profiles: `p-{7-char-hash}` (e.g., `p-7f2b4c1`)
//! - Plugin-adopted profiles: `plugin-{game_id}` (e.g., `plugin-ac3_remastered`)
//!
//! The hash is derived from profile name + creation timestamp, so the same
//! name added at different times produces different IDs. An ID never changes
//! once a profile has produced an archive; archive history is keyed off it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid profile ID: '{0}' (must be non-empty, without whitespace)")]
    InvalidProfileId(String),
}

/// Generates a 7-character hash from name and timestamp
fn generate_hash(name: &str, timestamp: DateTime<Utc>) -> String {
    let input = format!("{}{}", name, timestamp.timestamp_nanos_opt().unwrap_or(0));
    let hash = blake3::hash(input.as_bytes());
    let hex = hash.to_hex();
    hex[..7].to_string()
}

/// Stable, unique identifier for a save profile
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProfileId(String);

impl ProfileId {
    /// Creates a new ID for a user-created profile from name and timestamp
    pub fn generate(name: &str, timestamp: DateTime<Utc>) -> Self {
        Self(format!("p-{}", generate_hash(name, timestamp)))
    }

    /// Creates the ID for a profile adopted from a plugin descriptor
    pub fn for_plugin(game_id: &str) -> Self {
        Self(format!("plugin-{}", game_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the plugin `game_id` this profile was adopted from, if any
    pub fn plugin_game_id(&self) -> Option<&str> {
        self.0.strip_prefix("plugin-")
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProfileId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(IdError::InvalidProfileId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ProfileId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProfileId> for String {
    fn from(id: ProfileId) -> Self {
        id.0
    }
}
