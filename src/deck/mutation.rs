use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::OnceLock,
};

use log::{
    info,
    warn,
};
use regex::Regex;
use rusqlite::Connection;

use super::{
    collection::{
        self,
        Model,
        NoteRow,
        FIELD_SEPARATOR,
    },
    media::MediaManifest,
};
use crate::{
    core::{
        PipelineConfig,
        ProphoraError,
    },
    greek::{
        decode_entities,
        normalize,
        sanitize_filename,
        transliterate,
    },
    speech::SpeechCache,
};

#[derive(Debug, Default)]
pub struct MutationOutcome {
    /// Note ids visited this run, in processing order. Skipped notes are
    /// still visited for backup-completeness purposes.
    pub processed_ids: Vec<i64>,
    pub notes_updated: usize,
    pub notes_skipped: usize,
    pub clips_synthesized: usize,
}

/// Field indices resolved against one model.
struct ResolvedFields {
    translation: Option<usize>,
    pairs: Vec<(usize, usize)>,
}

fn resolve_fields(model: &Model, config: &PipelineConfig) -> ResolvedFields {
    let index_of = |name: &str| model.fields.iter().position(|f| f == name);

    let pairs = config
        .field_pairs
        .iter()
        .filter_map(|pair| {
            match (index_of(&pair.source_field), index_of(&pair.audio_field)) {
                (Some(source), Some(audio)) => Some((source, audio)),
                _ => None,
            }
        })
        .collect();

    ResolvedFields { translation: index_of(&config.translation_field), pairs }
}

/// Matches a pronunciation field that already carries audio. Re-runs must
/// not re-synthesize or duplicate media for fields already processed.
fn has_audio_marker(field: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\[sound:[^\]]+\.mp3\]").unwrap());
    re.is_match(field)
}

/// A short note label for log lines, preferring the translation field.
fn describe(note_id: i64, fields: &[String], translation: Option<usize>) -> String {
    match translation.and_then(|i| fields.get(i)).filter(|t| !t.is_empty()) {
        Some(text) => format!("note {} ({})", note_id, text),
        None => format!("note {}", note_id),
    }
}

/// Rewrites every augmentable note inside one transaction. Commits only
/// after the last note; any fatal error rolls every field mutation back and
/// propagates to the orchestrator.
pub fn augment_notes(
    conn: &mut Connection,
    models: &HashMap<i64, Model>,
    config: &PipelineConfig,
    cache: &SpeechCache,
    scratch_dir: &Path,
    manifest: &mut MediaManifest,
) -> Result<MutationOutcome, ProphoraError> {
    let tx = conn.transaction()?;
    let notes = collection::load_notes(&tx)?;
    info!("Processing {} notes", notes.len());

    let mut outcome = MutationOutcome::default();
    for note in &notes {
        outcome.processed_ids.push(note.id);
        if augment_note(&tx, note, models, config, cache, scratch_dir, manifest, &mut outcome)? {
            outcome.notes_updated += 1;
        } else {
            outcome.notes_skipped += 1;
        }
    }

    tx.commit()?;
    Ok(outcome)
}

/// Returns true if the note was updated, false if it was skipped. Only
/// per-note-recoverable conditions produce `false`; everything else is a
/// fatal error.
#[allow(clippy::too_many_arguments)]
fn augment_note(
    tx: &Connection,
    note: &NoteRow,
    models: &HashMap<i64, Model>,
    config: &PipelineConfig,
    cache: &SpeechCache,
    scratch_dir: &Path,
    manifest: &mut MediaManifest,
    outcome: &mut MutationOutcome,
) -> Result<bool, ProphoraError> {
    let model = models.get(&note.model_id).ok_or_else(|| {
        ProphoraError::SchemaMismatch(format!(
            "note {} references unknown model {}",
            note.id, note.model_id
        ))
    })?;

    let resolved = resolve_fields(model, config);
    if resolved.pairs.is_empty() {
        warn!("No audio field pairs in model \"{}\", skipping note {}", model.name, note.id);
        return Ok(false);
    }

    let mut fields: Vec<String> =
        note.fields_joined.split(FIELD_SEPARATOR).map(|s| s.to_string()).collect();

    if collection::all_cards_suspended(tx, note.id)? {
        info!("Skipping {}: all cards suspended", describe(note.id, &fields, resolved.translation));
        return Ok(false);
    }

    if fields.len() != model.fields.len() {
        return Err(ProphoraError::SchemaMismatch(format!(
            "note {} has {} field values but model \"{}\" declares {}",
            note.id,
            fields.len(),
            model.name,
            model.fields.len()
        )));
    }

    for (source_idx, audio_idx) in &resolved.pairs {
        fields[*source_idx] = normalize(&fields[*source_idx]);

        if has_audio_marker(&fields[*audio_idx]) {
            continue;
        }

        let decoded = decode_entities(&fields[*source_idx]);
        if decoded.trim().is_empty() {
            continue;
        }

        let filename = format!("{}.mp3", sanitize_filename(&transliterate(&decoded)?));
        let bytes = cache.fetch(&decoded)?;
        let key = manifest.allocate_key();
        fs::write(scratch_dir.join(&key), &bytes)?;
        manifest.insert(key, filename.clone());

        fields[*audio_idx] = format!("[sound:{}]", filename);
        outcome.clips_synthesized += 1;
    }

    let joined = fields.join(&FIELD_SEPARATOR.to_string());
    collection::update_note_fields(tx, note.id, &joined)?;
    Ok(true)
}
