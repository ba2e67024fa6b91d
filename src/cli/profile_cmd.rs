//! Profile management commands

use anyhow::{anyhow, bail, Result};
use clap::Subcommand;
use serde_json::json;

use super::app::Session;
use super::output::Output;
use crate::domain::{clean_input_path, Profile};

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Add a profile for a save folder
    Add {
        /// Display name (also the archive folder name)
        name: String,

        /// Save folder path; contracted to a portable form automatically
        path: String,

        /// Store this profile's archives uncompressed
        #[arg(long)]
        no_compression: bool,

        /// Merge over existing files on restore instead of clearing first
        #[arg(long)]
        keep_files_on_restore: bool,
    },

    /// List profiles
    List,

    /// Show a profile's details
    Show {
        /// Profile ID or name
        profile: String,
    },

    /// Edit a profile
    Edit {
        /// Profile ID or name
        profile: String,

        /// New display name
        #[arg(long)]
        name: Option<String>,

        /// New save folder path
        #[arg(long)]
        path: Option<String>,

        /// Enable or disable compression
        #[arg(long)]
        compression: Option<bool>,

        /// Enable or disable clearing the save folder on restore
        #[arg(long)]
        clear_on_restore: Option<bool>,
    },

    /// Remove a profile (existing archives are kept)
    Remove {
        /// Profile ID or name
        profile: String,
    },

    /// Create a profile from a plugin's detection data
    Adopt {
        /// The plugin's game_id (see `savekeep detect`)
        game_id: String,
    },
}

pub fn run(cmd: ProfileCommands, output: &Output, session: &mut Session) -> Result<()> {
    match cmd {
        ProfileCommands::Add {
            name,
            path,
            no_compression,
            keep_files_on_restore,
        } => add(output, session, name, &path, no_compression, keep_files_on_restore),
        ProfileCommands::List => list(output, session),
        ProfileCommands::Show { profile } => show(output, session, &profile),
        ProfileCommands::Edit {
            profile,
            name,
            path,
            compression,
            clear_on_restore,
        } => edit(output, session, &profile, name, path, compression, clear_on_restore),
        ProfileCommands::Remove { profile } => remove(output, session, &profile),
        ProfileCommands::Adopt { game_id } => adopt(output, session, &game_id),
    }
}

fn add(
    output: &Output,
    session: &mut Session,
    name: String,
    path: &str,
    no_compression: bool,
    keep_files_on_restore: bool,
) -> Result<()> {
    let mut profile = Profile::new(name, path, &session.env);
    profile.compression_enabled = !no_compression;
    profile.clear_folder_on_restore = !keep_files_on_restore;

    if !session.env.expand(&profile.contracted_path).exists() {
        output.warn(&format!(
            "Save folder does not exist yet: {}",
            profile.contracted_path
        ));
    }

    let summary = json!({
        "id": profile.id,
        "name": profile.name,
        "contracted_path": profile.contracted_path,
    });
    let message = format!(
        "Added profile {} for '{}' ({})",
        profile.id, profile.name, profile.contracted_path
    );

    session.profiles.insert(profile)?;
    session.save()?;

    if output.is_json() {
        output.data(&summary);
    } else {
        output.success(&message);
    }
    Ok(())
}

fn list(output: &Output, session: &Session) -> Result<()> {
    let profiles: Vec<&Profile> = session.profiles.iter().collect();

    if output.is_json() {
        output.data(&profiles);
        return Ok(());
    }

    if profiles.is_empty() {
        println!("No profiles yet. Add one with 'savekeep profile add <name> <path>'.");
        return Ok(());
    }

    output.row(&["ID", "NAME", "SAVE PATH"]);
    for profile in profiles {
        output.row(&[profile.id.as_str(), &profile.name, &profile.contracted_path]);
    }
    Ok(())
}

fn show(output: &Output, session: &Session, key: &str) -> Result<()> {
    let profile = session.profiles.find(key)?;
    let expanded = session.env.expand(&profile.contracted_path);

    if output.is_json() {
        output.data(&json!({
            "profile": profile,
            "expanded_path": expanded,
            "path_exists": expanded.exists(),
        }));
        return Ok(());
    }

    output.row(&["ID:", profile.id.as_str()]);
    output.row(&["Name:", &profile.name]);
    output.row(&["Save path:", &profile.contracted_path]);
    output.row(&["Expands to:", &expanded.display().to_string()]);
    output.row(&["Exists:", if expanded.exists() { "yes" } else { "no" }]);
    output.row(&[
        "Compression:",
        if profile.compression_enabled { "on" } else { "off" },
    ]);
    output.row(&[
        "Clear on restore:",
        if profile.clear_folder_on_restore { "yes" } else { "no" },
    ]);
    if let Some(plugin_id) = &profile.plugin_id {
        output.row(&["Plugin:", plugin_id]);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn edit(
    output: &Output,
    session: &mut Session,
    key: &str,
    name: Option<String>,
    path: Option<String>,
    compression: Option<bool>,
    clear_on_restore: Option<bool>,
) -> Result<()> {
    let id = session.profiles.find(key)?.id.clone();
    let contracted = path.map(|p| session.env.contract(&clean_input_path(&p)));

    let profile = session
        .profiles
        .get_mut(&id)
        .expect("profile was just found");

    if let Some(name) = name {
        if name != profile.name {
            output.warn(&format!(
                "Archives made under '{}' stay in their old folder",
                profile.name
            ));
            profile.name = name;
        }
    }
    if let Some(contracted) = contracted {
        profile.contracted_path = contracted;
    }
    if let Some(compression) = compression {
        profile.compression_enabled = compression;
    }
    if let Some(clear) = clear_on_restore {
        profile.clear_folder_on_restore = clear;
    }

    let message = format!("Updated profile {}", id);
    session.save()?;
    output.success(&message);
    Ok(())
}

fn remove(output: &Output, session: &mut Session, key: &str) -> Result<()> {
    let id = session.profiles.find(key)?.id.clone();
    let profile = session
        .profiles
        .remove(&id)
        .expect("profile was just found");
    session.save()?;

    output.success(&format!(
        "Removed profile '{}' (existing archives are kept)",
        profile.name
    ));
    Ok(())
}

fn adopt(output: &Output, session: &mut Session, game_id: &str) -> Result<()> {
    let snapshot = session.plugins.snapshot();
    let plugin = snapshot
        .get(game_id)
        .ok_or_else(|| anyhow!("No plugin with game_id '{}'; see 'savekeep plugin list'", game_id))?;

    let descriptor = plugin.descriptor();
    let profile = descriptor.to_profile(&session.env);
    if descriptor.detected_path(&session.env).is_none() {
        output.warn(&format!(
            "'{}' was not detected on this machine; using its first candidate path",
            descriptor.game_name
        ));
    }

    let summary = json!({
        "id": profile.id,
        "name": profile.name,
        "contracted_path": profile.contracted_path,
    });
    let message = format!(
        "Adopted '{}' as profile {} ({})",
        profile.name, profile.id, profile.contracted_path
    );

    if session.profiles.insert(profile).is_err() {
        bail!("'{}' is already adopted", game_id);
    }
    session.save()?;

    if output.is_json() {
        output.data(&summary);
    } else {
        output.success(&message);
    }
    Ok(())
}
