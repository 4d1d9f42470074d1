use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProphoraError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Sqlite(Box<rusqlite::Error>),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("Archive tool error: {0}")]
    ArchiveTool(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("No transliteration for '{ch}' in \"{context}\"")]
    Transliteration { ch: char, context: String },

    #[error("Speech synthesis returned no audio for \"{0}\"")]
    Synthesis(String),

    #[error("Aborted: the last backup contains notes missing from this deck")]
    BackupAborted,

    #[error("ProphoraError: {0}")]
    Custom(String),
}

impl From<std::io::Error> for ProphoraError {
    fn from(error: std::io::Error) -> Self {
        ProphoraError::Io(Box::new(error))
    }
}

impl From<rusqlite::Error> for ProphoraError {
    fn from(error: rusqlite::Error) -> Self {
        ProphoraError::Sqlite(Box::new(error))
    }
}

impl From<reqwest::Error> for ProphoraError {
    fn from(error: reqwest::Error) -> Self {
        ProphoraError::Reqwest(Box::new(error))
    }
}

impl From<zip::result::ZipError> for ProphoraError {
    fn from(error: zip::result::ZipError) -> Self {
        ProphoraError::ArchiveTool(error.to_string())
    }
}
