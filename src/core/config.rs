use std::path::PathBuf;

use serde::{
    Deserialize,
    Serialize,
};

const APP_NAME: &str = "prophora";

/// A (source text field, pronunciation field) pair to augment. Pairs that
/// don't resolve against a note's model are skipped for that note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldPair {
    pub source_field: String,
    pub audio_field: String,
}

impl FieldPair {
    pub fn new(source_field: &str, audio_field: &str) -> Self {
        FieldPair { source_field: source_field.to_string(), audio_field: audio_field.to_string() }
    }
}

/// Immutable run configuration, built once in main and passed down.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input_archive: PathBuf,
    pub output_archive: PathBuf,
    pub backup_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub locale: String,
    pub translation_field: String,
    pub field_pairs: Vec<FieldPair>,
}

impl PipelineConfig {
    pub fn default_field_pairs() -> Vec<FieldPair> {
        vec![
            FieldPair::new("Greek", "Pronunciation"),
            FieldPair::new("Example Sentence", "Example Pronunciation"),
        ]
    }

    pub fn default_translation_field() -> String {
        "English".to_string()
    }

    pub fn default_cache_dir() -> PathBuf {
        if let Some(data_dir) = dirs::data_local_dir() {
            data_dir.join(APP_NAME).join("speech_cache")
        } else {
            PathBuf::from("speech_cache")
        }
    }
}
