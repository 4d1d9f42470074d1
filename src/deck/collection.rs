use std::{
    collections::HashMap,
    path::Path,
};

use rusqlite::{
    params,
    Connection,
};
use serde::Deserialize;

use crate::core::ProphoraError;

/// Anki joins a note's ordered field values into one string on U+001F.
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// Card queue value for suspended cards.
pub const QUEUE_SUSPENDED: i64 = -1;

const COLLECTION_FILE: &str = "collection.anki2";

/// One note type: an ordered field-name list keyed by model id. Decoded once
/// from the col row's schema blob and immutable for the run.
#[derive(Debug, Clone)]
pub struct Model {
    pub id: i64,
    pub name: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NoteRow {
    pub id: i64,
    pub model_id: i64,
    pub fields_joined: String,
}

#[derive(Deserialize)]
struct RawModel {
    name: String,
    flds: Vec<RawField>,
}

#[derive(Deserialize)]
struct RawField {
    name: String,
}

pub fn open(scratch_dir: &Path) -> Result<Connection, ProphoraError> {
    let path = scratch_dir.join(COLLECTION_FILE);
    Connection::open(&path)
        .map_err(|e| ProphoraError::Custom(format!("Failed to open {:?}: {}", path, e)))
}

/// The one schema read of the run. The col table must hold exactly one row;
/// anything else means the archive's internal consistency can't be trusted.
pub fn load_models(conn: &Connection) -> Result<HashMap<i64, Model>, ProphoraError> {
    let mut stmt = conn.prepare("SELECT models FROM col")?;
    let mut rows = stmt.query([])?;

    let row = rows
        .next()?
        .ok_or_else(|| ProphoraError::SchemaMismatch("collection has no col row".to_string()))?;
    let blob: String = row.get(0)?;
    if rows.next()?.is_some() {
        return Err(ProphoraError::SchemaMismatch(
            "collection has more than one col row".to_string(),
        ));
    }

    let raw: HashMap<String, RawModel> = serde_json::from_str(&blob)?;
    let mut models = HashMap::new();
    for (key, raw_model) in raw {
        let id: i64 = key.parse().map_err(|_| {
            ProphoraError::SchemaMismatch(format!("model id \"{}\" is not numeric", key))
        })?;
        let fields = raw_model.flds.into_iter().map(|f| f.name).collect();
        models.insert(id, Model { id, name: raw_model.name, fields });
    }
    Ok(models)
}

/// The one bulk note read of the run. Query order is stable within a run.
pub fn load_notes(conn: &Connection) -> Result<Vec<NoteRow>, ProphoraError> {
    let mut stmt = conn.prepare("SELECT id, mid, flds FROM notes ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(NoteRow { id: row.get(0)?, model_id: row.get(1)?, fields_joined: row.get(2)? })
    })?;

    let mut notes = Vec::new();
    for row in rows {
        notes.push(row?);
    }
    Ok(notes)
}

/// id -> joined field string of every note, for backup snapshots.
pub fn load_note_snapshot(conn: &Connection) -> Result<HashMap<i64, String>, ProphoraError> {
    let mut stmt = conn.prepare("SELECT id, flds FROM notes")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut snapshot = HashMap::new();
    for row in rows {
        let (id, fields_joined): (i64, String) = row?;
        snapshot.insert(id, fields_joined);
    }
    Ok(snapshot)
}

/// Suspended material should not incur synthesis cost. A note with no cards
/// at all is not considered suspended.
pub fn all_cards_suspended(conn: &Connection, note_id: i64) -> Result<bool, ProphoraError> {
    let mut stmt = conn.prepare("SELECT queue FROM cards WHERE nid = ?1")?;
    let rows = stmt.query_map(params![note_id], |row| row.get::<_, i64>(0))?;

    let mut any = false;
    for queue in rows {
        if queue? != QUEUE_SUSPENDED {
            return Ok(false);
        }
        any = true;
    }
    Ok(any)
}

/// Parameter binding keeps embedded quotes in field content inert.
pub fn update_note_fields(
    conn: &Connection,
    note_id: i64,
    fields_joined: &str,
) -> Result<(), ProphoraError> {
    conn.execute("UPDATE notes SET flds = ?1 WHERE id = ?2", params![fields_joined, note_id])?;
    Ok(())
}

#[cfg(test)]
pub fn create_test_schema(conn: &Connection) -> Result<(), ProphoraError> {
    conn.execute_batch(
        "CREATE TABLE col (id INTEGER PRIMARY KEY, models TEXT);
         CREATE TABLE notes (id INTEGER PRIMARY KEY, mid INTEGER, flds TEXT);
         CREATE TABLE cards (id INTEGER PRIMARY KEY, nid INTEGER, queue INTEGER);",
    )?;
    Ok(())
}
