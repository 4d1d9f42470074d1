use std::{
    path::PathBuf,
    time::Instant,
};

use log::info;

use crate::{
    core::{
        PipelineConfig,
        ProphoraError,
    },
    deck::{
        archive,
        backup::{
            self,
            BackupGuard,
            ConfirmFn,
        },
        collection,
        media::MediaManifest,
        mutation,
    },
    speech::{
        SpeechCache,
        SpeechSynthesizer,
    },
};

#[derive(Debug)]
pub struct PipelineSummary {
    pub notes_updated: usize,
    pub notes_skipped: usize,
    pub clips_synthesized: usize,
    pub output_archive: PathBuf,
    pub backup_archive: PathBuf,
}

/// Runs the whole augmentation sequentially: extract, snapshot the last
/// backup, mutate the note database in one transaction, verify completeness,
/// re-pack, rotate. The scratch directory is dropped on every exit path; a
/// fatal run leaves the input archive and all prior backups untouched and
/// produces no partial output.
pub fn run(
    config: &PipelineConfig,
    synthesizer: Box<dyn SpeechSynthesizer>,
    confirm: &ConfirmFn,
) -> Result<PipelineSummary, ProphoraError> {
    let total_start = Instant::now();

    let scratch = tempfile::tempdir()?;
    info!("Extracting {:?}", config.input_archive);
    archive::extract(&config.input_archive, scratch.path())?;

    let mut guard = BackupGuard::from_dir(&config.backup_dir)?;

    let mut conn = collection::open(scratch.path())?;
    let models = collection::load_models(&conn)?;
    info!("Loaded {} note types", models.len());
    let mut manifest = MediaManifest::load(scratch.path())?;

    let cache = SpeechCache::new(config.cache_dir.clone(), synthesizer)?;

    let outcome =
        mutation::augment_notes(&mut conn, &models, config, &cache, scratch.path(), &mut manifest)?;
    for note_id in &outcome.processed_ids {
        guard.mark_seen(*note_id);
    }
    guard.verify(confirm)?;

    manifest.save(scratch.path())?;
    drop(conn);

    info!("Packing {:?}", config.output_archive);
    archive::pack(scratch.path(), &config.output_archive)?;
    let backup_archive = backup::rotate(&config.output_archive, &config.backup_dir)?;

    info!(
        "Updated {} notes ({} skipped, {} clips) in {:.1}s",
        outcome.notes_updated,
        outcome.notes_skipped,
        outcome.clips_synthesized,
        total_start.elapsed().as_secs_f32()
    );

    Ok(PipelineSummary {
        notes_updated: outcome.notes_updated,
        notes_skipped: outcome.notes_skipped,
        clips_synthesized: outcome.clips_synthesized,
        output_archive: config.output_archive.clone(),
        backup_archive,
    })
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        sync::{
            atomic::{
                AtomicUsize,
                Ordering,
            },
            Arc,
        },
    };

    use rusqlite::{
        params,
        Connection,
    };

    use super::*;
    use crate::core::FieldPair;

    struct CountingSynthesizer {
        calls: Arc<AtomicUsize>,
    }

    impl SpeechSynthesizer for CountingSynthesizer {
        fn synthesize(&self, text: &str) -> Result<Vec<u8>, ProphoraError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("audio:{}", text).into_bytes())
        }
    }

    fn models_blob() -> String {
        serde_json::json!({
            "1600000000001": {
                "name": "Greek Vocab",
                "flds": [
                    { "name": "Greek" },
                    { "name": "English" },
                    { "name": "Pronunciation" }
                ]
            }
        })
        .to_string()
    }

    /// Builds a minimal .apkg on disk with the given notes.
    fn write_deck(apkg: &std::path::Path, notes: &[(i64, &str)]) {
        let staging = tempfile::tempdir().unwrap();
        let conn = Connection::open(staging.path().join("collection.anki2")).unwrap();
        conn.execute_batch(
            "CREATE TABLE col (id INTEGER PRIMARY KEY, models TEXT);
             CREATE TABLE notes (id INTEGER PRIMARY KEY, mid INTEGER, flds TEXT);
             CREATE TABLE cards (id INTEGER PRIMARY KEY, nid INTEGER, queue INTEGER);",
        )
        .unwrap();
        conn.execute("INSERT INTO col (id, models) VALUES (1, ?1)", params![models_blob()])
            .unwrap();
        for (id, flds) in notes {
            conn.execute(
                "INSERT INTO notes (id, mid, flds) VALUES (?1, 1600000000001, ?2)",
                params![id, flds],
            )
            .unwrap();
            conn.execute("INSERT INTO cards (nid, queue) VALUES (?1, 0)", params![id]).unwrap();
        }
        drop(conn);
        fs::write(staging.path().join("media"), "{}").unwrap();
        archive::pack(staging.path(), apkg).unwrap();
    }

    fn test_config(root: &std::path::Path) -> PipelineConfig {
        PipelineConfig {
            input_archive: root.join("input.apkg"),
            output_archive: root.join("output.apkg"),
            backup_dir: root.join("backups"),
            cache_dir: root.join("speech_cache"),
            locale: "el".to_string(),
            translation_field: "English".to_string(),
            field_pairs: vec![FieldPair::new("Greek", "Pronunciation")],
        }
    }

    #[test]
    fn end_to_end_produces_an_augmented_archive() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());
        write_deck(&config.input_archive, &[(1, "σήμερα\u{1f}today\u{1f}")]);

        let calls = Arc::new(AtomicUsize::new(0));
        let summary = run(
            &config,
            Box::new(CountingSynthesizer { calls: calls.clone() }),
            &|_| false,
        )
        .unwrap();

        assert_eq!(summary.notes_updated, 1);
        assert_eq!(summary.clips_synthesized, 1);
        assert!(config.output_archive.exists());
        assert!(summary.backup_archive.exists());

        let unpacked = tempfile::tempdir().unwrap();
        archive::extract(&config.output_archive, unpacked.path()).unwrap();
        let conn = collection::open(unpacked.path()).unwrap();
        let flds: String = conn
            .query_row("SELECT flds FROM notes WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(flds, "σήμερα\u{1f}today\u{1f}[sound:semera.mp3]");

        let manifest = MediaManifest::load(unpacked.path()).unwrap();
        assert_eq!(manifest.len(), 1);
        assert!(unpacked.path().join("0").exists());
    }

    #[test]
    fn rerun_over_own_output_synthesizes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let mut config = test_config(root.path());
        write_deck(&config.input_archive, &[(1, "σήμερα\u{1f}today\u{1f}")]);

        let calls = Arc::new(AtomicUsize::new(0));
        run(&config, Box::new(CountingSynthesizer { calls: calls.clone() }), &|_| true).unwrap();
        let first_calls = calls.load(Ordering::SeqCst);

        // Feed the output back in as the next run's input.
        config.input_archive = config.output_archive.clone();
        config.output_archive = root.path().join("second.apkg");
        run(&config, Box::new(CountingSynthesizer { calls: calls.clone() }), &|_| true).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), first_calls);
    }

    #[test]
    fn guard_denial_produces_no_output_archive() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());

        // First run establishes a backup containing notes 1 and 2.
        write_deck(&config.input_archive, &[(1, "ναι\u{1f}yes\u{1f}"), (2, "όχι\u{1f}no\u{1f}")]);
        run(&config, Box::new(CountingSynthesizer { calls: Arc::new(AtomicUsize::new(0)) }), &|_| {
            false
        })
        .unwrap();

        // Second run's deck lost note 2; a denying confirmation must abort.
        write_deck(&config.input_archive, &[(1, "ναι\u{1f}yes\u{1f}[sound:ne.mp3]")]);
        let second_output = root.path().join("second.apkg");
        let mut config = config;
        config.output_archive = second_output.clone();

        let err = run(
            &config,
            Box::new(CountingSynthesizer { calls: Arc::new(AtomicUsize::new(0)) }),
            &|_| false,
        )
        .unwrap_err();

        assert!(matches!(err, ProphoraError::BackupAborted));
        assert!(!second_output.exists());
    }
}
