//! Plugin inspection and game detection commands

use anyhow::Result;
use clap::Subcommand;

use super::app::Session;
use super::output::Output;

#[derive(Subcommand)]
pub enum PluginCommands {
    /// List loaded plugins
    List,

    /// Show per-unit load outcomes, including rejections
    Report,
}

pub fn run(cmd: PluginCommands, output: &Output, session: &Session) -> Result<()> {
    let snapshot = session.plugins.snapshot();

    match cmd {
        PluginCommands::List => {
            if output.is_json() {
                output.data(&snapshot.descriptors());
                return Ok(());
            }

            if snapshot.is_empty() {
                println!("No plugins loaded.");
            } else {
                output.row(&["GAME ID", "NAME", "SAVE PATHS", "HOOKS"]);
                for descriptor in snapshot.descriptors() {
                    let paths = descriptor.save_paths.len().to_string();
                    let hooks = if descriptor.hooks.is_empty() {
                        "-".to_string()
                    } else {
                        descriptor
                            .hooks
                            .iter()
                            .map(|h| h.label())
                            .collect::<Vec<_>>()
                            .join(",")
                    };
                    output.row(&[&descriptor.game_id, &descriptor.game_name, &paths, &hooks]);
                }
            }

            let rejected = snapshot.report().rejected().count();
            if rejected > 0 {
                output.warn(&format!(
                    "{} plugin units failed to load; see 'savekeep plugin report'",
                    rejected
                ));
            }
            Ok(())
        }

        PluginCommands::Report => {
            let report = snapshot.report();
            if output.is_json() {
                output.data(report);
                return Ok(());
            }

            if report.outcomes.is_empty() {
                println!("No plugin units were discovered.");
                return Ok(());
            }

            for outcome in &report.outcomes {
                match (&outcome.game_id, &outcome.error) {
                    (Some(game_id), _) => output.row(&["ok", &outcome.unit, game_id]),
                    (None, Some(error)) => output.row(&["err", &outcome.unit, error]),
                    (None, None) => {}
                }
            }
            Ok(())
        }
    }
}

pub fn detect(output: &Output, session: &Session) -> Result<()> {
    let snapshot = session.plugins.snapshot();
    let detections = crate::plugin::detect(&snapshot, &session.env);

    if output.is_json() {
        output.data(&detections);
        return Ok(());
    }

    if detections.is_empty() {
        println!("No known games detected.");
        return Ok(());
    }

    output.row(&["GAME ID", "NAME", "EVIDENCE"]);
    for detection in &detections {
        let evidence = match &detection.matched_path {
            Some(path) => path.clone(),
            None if detection.via_registry => "registry".to_string(),
            None => String::new(),
        };
        output.row(&[
            &detection.descriptor.game_id,
            &detection.descriptor.game_name,
            &evidence,
        ]);
    }
    output.blank();
    println!("Adopt one with 'savekeep profile adopt <game_id>'.");
    Ok(())
}
