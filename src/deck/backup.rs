use std::{
    collections::HashMap,
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use log::{
    info,
    warn,
};

use super::{
    archive,
    collection::{
        self,
        FIELD_SEPARATOR,
    },
};
use crate::core::ProphoraError;

/// Answers "proceed anyway?" for the completeness override. Injected so
/// non-interactive callers can fail closed (or open) without a prompt.
pub type ConfirmFn = dyn Fn(&str) -> bool;

/// Holds the note set of the most recent backup; notes still present after
/// the run has visited every current note have vanished from the deck and
/// must not be silently packaged away.
pub struct BackupGuard {
    remaining: HashMap<i64, String>,
}

impl BackupGuard {
    /// Captures the note set of the lexicographically last .apkg in the
    /// backup directory (timestamp-suffixed names sort chronologically).
    /// No backups yet means nothing to guard.
    pub fn from_dir(backup_dir: &Path) -> Result<Self, ProphoraError> {
        let Some(latest) = latest_backup(backup_dir)? else {
            info!("No previous backup found in {:?}", backup_dir);
            return Ok(BackupGuard::from_snapshot(HashMap::new()));
        };

        info!("Checking completeness against backup {:?}", latest.file_name().unwrap_or_default());
        let scratch = tempfile::tempdir()?;
        archive::extract(&latest, scratch.path())?;
        let conn = collection::open(scratch.path())?;
        let snapshot = collection::load_note_snapshot(&conn)?;
        Ok(BackupGuard::from_snapshot(snapshot))
    }

    pub fn from_snapshot(snapshot: HashMap<i64, String>) -> Self {
        BackupGuard { remaining: snapshot }
    }

    /// Called as the mutation run visits each note.
    pub fn mark_seen(&mut self, note_id: i64) {
        self.remaining.remove(&note_id);
    }

    /// Note ids present in the backup but never visited this run.
    pub fn missing(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.remaining.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// A subset backup passes silently. Otherwise every missing note is
    /// named and the caller's confirmation decides between proceeding and a
    /// fatal abort that discards all work.
    pub fn verify(&self, confirm: &ConfirmFn) -> Result<(), ProphoraError> {
        if self.remaining.is_empty() {
            return Ok(());
        }

        let missing = self.missing();
        warn!("{} note(s) in the last backup are missing from this deck:", missing.len());
        for id in &missing {
            let content = self.remaining[id].replace(FIELD_SEPARATOR, " | ");
            warn!("  note {}: {}", id, content);
        }

        let question =
            format!("{} backed-up note(s) are missing from this deck. Continue anyway?", missing.len());
        if confirm(&question) {
            warn!("Proceeding despite missing notes");
            Ok(())
        } else {
            Err(ProphoraError::BackupAborted)
        }
    }
}

fn latest_backup(backup_dir: &Path) -> Result<Option<PathBuf>, ProphoraError> {
    if !backup_dir.exists() {
        return Ok(None);
    }

    let mut names: Vec<String> = fs::read_dir(backup_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|ext| ext.to_str()) == Some("apkg"))
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();

    Ok(names.last().map(|name| backup_dir.join(name)))
}

/// Files the freshly packed output into the backup directory under a Unix
/// timestamp suffix, becoming the next run's completeness baseline.
pub fn rotate(output_archive: &Path, backup_dir: &Path) -> Result<PathBuf, ProphoraError> {
    fs::create_dir_all(backup_dir)?;
    let name = format!("backup-{}.apkg", chrono::Utc::now().timestamp());
    let dest = backup_dir.join(name);
    fs::copy(output_archive, &dest)?;
    Ok(dest)
}
