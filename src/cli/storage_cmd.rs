//! Storage root configuration commands

use anyhow::Result;
use clap::Subcommand;
use serde_json::json;

use super::app::Session;
use super::output::Output;
use crate::domain::clean_input_path;
use crate::storage::StorageRootMode;

#[derive(Subcommand)]
pub enum StorageCommands {
    /// Show the storage mode and the resolved archive root
    Show,

    /// Store archives under ./backups of the working directory
    UseCwd,

    /// Store archives under a fixed folder
    UseFixed {
        /// The folder; contracted to a portable form automatically
        path: String,
    },
}

pub fn run(cmd: StorageCommands, output: &Output, session: &mut Session) -> Result<()> {
    match cmd {
        StorageCommands::Show => {
            let mode = match session.config.storage_root_mode {
                StorageRootMode::Cwd => "cwd",
                StorageRootMode::Fixed => "fixed",
            };
            let root = session.storage_root();

            if output.is_json() {
                output.data(&json!({
                    "mode": mode,
                    "fixed_path": session.config.storage_fixed_path,
                    "resolved_root": root,
                }));
            } else {
                output.row(&["Mode:", mode]);
                if !session.config.storage_fixed_path.is_empty() {
                    output.row(&["Fixed path:", &session.config.storage_fixed_path]);
                }
                output.row(&["Archive root:", &root.display().to_string()]);
            }
            Ok(())
        }

        StorageCommands::UseCwd => {
            session.config.storage_root_mode = StorageRootMode::Cwd;
            session.config.storage_fixed_path.clear();
            session.save()?;

            output.success(&format!(
                "Archives will be stored under {}",
                session.storage_root().display()
            ));
            Ok(())
        }

        StorageCommands::UseFixed { path } => {
            let contracted = session.env.contract(&clean_input_path(&path));
            session.config.storage_root_mode = StorageRootMode::Fixed;
            session.config.storage_fixed_path = contracted.clone();
            session.save()?;

            output.success(&format!(
                "Archives will be stored under {} ({})",
                contracted,
                session.storage_root().display()
            ));
            Ok(())
        }
    }
}
