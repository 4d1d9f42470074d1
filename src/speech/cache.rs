use std::{
    fs,
    path::PathBuf,
};

use log::{
    debug,
    info,
};

use super::SpeechSynthesizer;
use crate::core::ProphoraError;

/// Unbounded on-disk cache keyed by exact decoded text. Entries are never
/// evicted, so repeated runs over the same deck never re-incur synthesis
/// cost. The cache directory is shared across runs but assumed single-writer.
pub struct SpeechCache {
    dir: PathBuf,
    synthesizer: Box<dyn SpeechSynthesizer>,
}

impl SpeechCache {
    pub fn new(dir: PathBuf, synthesizer: Box<dyn SpeechSynthesizer>) -> Result<Self, ProphoraError> {
        fs::create_dir_all(&dir)
            .map_err(|e| ProphoraError::Custom(format!("Failed to create speech cache at {:?}: {}", dir, e)))?;
        Ok(SpeechCache { dir, synthesizer })
    }

    /// Path separators in the key would escape the cache directory.
    fn entry_path(&self, text: &str) -> PathBuf {
        self.dir.join(format!("{}.mp3", text.replace(['/', '\\'], "_")))
    }

    pub fn fetch(&self, text: &str) -> Result<Vec<u8>, ProphoraError> {
        let path = self.entry_path(text);
        if path.exists() {
            debug!("Speech cache hit for \"{}\"", text);
            return Ok(fs::read(&path)?);
        }

        info!("Synthesizing \"{}\"", text);
        let bytes = self.synthesizer.synthesize(text)?;
        fs::write(&path, &bytes)?;
        Ok(bytes)
    }
}
