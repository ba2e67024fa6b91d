//! Main CLI application structure

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{backup_cmd, plugin_cmd, profile_cmd, storage_cmd};
use crate::domain::{EnvSnapshot, ProfileRegistry};
use crate::plugin::{PluginRegistry, PluginSources, DESCRIPTOR_FILE};
use crate::storage::{AppConfig, ConfigStore};

#[derive(Parser)]
#[command(name = "savekeep")]
#[command(author, version, about = "Save-profile backup and restore manager")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Config directory (defaults to the platform config dir)
    #[arg(long, global = true, env = "SAVEKEEP_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage save profiles
    #[command(subcommand)]
    Profile(profile_cmd::ProfileCommands),

    /// Back up a profile's save folder
    Backup {
        /// Profile ID or name
        profile: String,
    },

    /// Restore an archive into a profile's save folder
    Restore {
        /// Profile ID or name
        profile: String,

        /// Archive number from `savekeep archives` (defaults to the newest)
        #[arg(long, short = 'a')]
        archive: Option<usize>,
    },

    /// List a profile's archives, newest first
    Archives {
        /// Profile ID or name
        profile: String,
    },

    /// Find installed games known to the plugin registry
    Detect,

    /// Inspect loaded plugins
    #[command(subcommand)]
    Plugin(plugin_cmd::PluginCommands),

    /// Configure where archives are stored
    #[command(subcommand)]
    Storage(storage_cmd::StorageCommands),
}

/// Everything a command needs: config, profiles, environment and plugins
pub struct Session {
    store: ConfigStore,
    pub config: AppConfig,
    pub profiles: ProfileRegistry,
    pub env: EnvSnapshot,
    pub plugins: PluginRegistry,
}

impl Session {
    /// Loads config, profiles and plugins from the config directory
    pub fn open(config_dir: Option<PathBuf>, output: &Output) -> Result<Self> {
        let dir = config_dir
            .or_else(ConfigStore::default_dir)
            .ok_or_else(|| anyhow!("Could not determine a config directory; pass --config-dir"))?;
        output.verbose_ctx("session", &format!("Config directory: {}", dir.display()));

        let store = ConfigStore::in_dir(&dir);
        let loaded = store.load().context("Failed to load configuration")?;
        if let Some(rotated) = &loaded.rotated_to {
            output.warn(&format!(
                "Config was corrupted and moved to {}; starting fresh",
                rotated.display()
            ));
        }

        let env = EnvSnapshot::capture();
        let (profiles, skipped) = ProfileRegistry::load(&loaded.config.profiles, &env);
        if skipped > 0 {
            output.warn(&format!("Skipped {} malformed profile entries", skipped));
        }

        let descriptor_file = dir.join("plugins").join(DESCRIPTOR_FILE);
        let plugins = PluginRegistry::load(PluginSources::bundled(Some(descriptor_file)));
        let snapshot = plugins.snapshot();
        output.verbose_ctx(
            "session",
            &format!(
                "Loaded {} plugins ({} units rejected)",
                snapshot.len(),
                snapshot.report().rejected().count()
            ),
        );

        Ok(Self {
            store,
            config: loaded.config,
            profiles,
            env,
            plugins,
        })
    }

    /// Serializes the profiles back into the config and writes it
    pub fn save(&mut self) -> Result<()> {
        self.config.profiles = self.profiles.serialize();
        self.store
            .save(&self.config)
            .context("Failed to save configuration")
    }

    /// The effective archive storage root
    pub fn storage_root(&self) -> PathBuf {
        self.config.storage_root(&self.env)
    }
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(cli.format, cli.verbose);

    let mut session = Session::open(cli.config_dir, &output)?;

    match cli.command {
        Commands::Profile(cmd) => profile_cmd::run(cmd, &output, &mut session)?,
        Commands::Backup { profile } => backup_cmd::backup(&output, &session, &profile)?,
        Commands::Restore { profile, archive } => {
            backup_cmd::restore(&output, &session, &profile, archive)?
        }
        Commands::Archives { profile } => backup_cmd::archives(&output, &session, &profile)?,
        Commands::Detect => plugin_cmd::detect(&output, &session)?,
        Commands::Plugin(cmd) => plugin_cmd::run(cmd, &output, &session)?,
        Commands::Storage(cmd) => storage_cmd::run(cmd, &output, &mut session)?,
    }

    Ok(())
}
