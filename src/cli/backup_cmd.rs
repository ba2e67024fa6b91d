//! Backup, restore and archive listing commands

use anyhow::{anyhow, bail, Result};
use serde_json::{json, Value};

use super::app::Session;
use super::output::Output;
use crate::domain::TIMESTAMP_FORMAT;
use crate::engine::{BackupEngine, RestoreEngine};
use crate::storage::ArchiveStore;

pub fn backup(output: &Output, session: &Session, key: &str) -> Result<()> {
    let profile = session.profiles.find(key)?;
    output.verbose_ctx(
        "backup",
        &format!("Profile {} -> root {}", profile.id, session.storage_root().display()),
    );

    let engine = BackupEngine::new(
        session.storage_root(),
        &session.env,
        session.plugins.snapshot(),
    );
    let result = engine.run_backup(profile)?;

    if output.is_json() {
        output.data(&json!({
            "archive": result.archive.file_path,
            "kind": result.archive.kind.label(),
            "metadata": result.metadata,
            "duration_ms": result.duration.as_millis() as u64,
        }));
        return Ok(());
    }

    output.success(&format!(
        "Backed up '{}' to {}",
        profile.name,
        result.archive.file_path.display()
    ));
    if !result.metadata.is_empty() {
        output.verbose_ctx(
            "backup",
            &format!("Hook metadata: {}", Value::Object(result.metadata)),
        );
    }
    Ok(())
}

pub fn restore(
    output: &Output,
    session: &Session,
    key: &str,
    archive_number: Option<usize>,
) -> Result<()> {
    let profile = session.profiles.find(key)?;
    let store = ArchiveStore::new(session.storage_root());

    let archives = store.list_archives(&profile.name)?;
    if archives.is_empty() {
        bail!("No archives found for '{}'", profile.name);
    }

    let number = archive_number.unwrap_or(1);
    let archive = number
        .checked_sub(1)
        .and_then(|i| archives.get(i))
        .ok_or_else(|| {
            anyhow!(
                "Archive #{} does not exist; '{}' has {} (see 'savekeep archives')",
                number,
                profile.name,
                archives.len()
            )
        })?;
    output.verbose_ctx(
        "restore",
        &format!("Restoring {} into {}", archive.file_path.display(), profile.contracted_path),
    );

    let engine = RestoreEngine::new(
        session.storage_root(),
        &session.env,
        session.plugins.snapshot(),
    );
    let result = engine.run_restore(profile, archive)?;

    if output.is_json() {
        output.data(&json!({
            "restored": result.restored.file_path,
            "safety_archive": result.safety_archive.as_ref().map(|a| &a.file_path),
            "metadata": result.metadata,
            "duration_ms": result.duration.as_millis() as u64,
        }));
        return Ok(());
    }

    output.success(&format!(
        "Restored '{}' from {}",
        profile.name,
        result.restored.file_path.display()
    ));
    match &result.safety_archive {
        Some(safety) => output.success(&format!(
            "Previous contents saved to {}",
            safety.file_path.display()
        )),
        None => output.verbose_ctx("restore", "Target was empty; no safety archive needed"),
    }
    Ok(())
}

pub fn archives(output: &Output, session: &Session, key: &str) -> Result<()> {
    let profile = session.profiles.find(key)?;
    let store = ArchiveStore::new(session.storage_root());
    let archives = store.list_archives(&profile.name)?;

    if output.is_json() {
        output.data(&archives);
        return Ok(());
    }

    if archives.is_empty() {
        println!("No archives for '{}' yet.", profile.name);
        return Ok(());
    }

    output.row(&["#", "KIND", "CREATED", "FILE"]);
    for (index, archive) in archives.iter().enumerate() {
        let number = (index + 1).to_string();
        let created = archive.timestamp.format(TIMESTAMP_FORMAT).to_string();
        let file = archive
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        output.row(&[&number, archive.kind.label(), &created, &file]);
    }
    Ok(())
}
