use std::{
    collections::HashMap,
    fs,
    path::Path,
};

use crate::core::ProphoraError;

const MANIFEST_FILE: &str = "media";

/// The .apkg media manifest: a JSON object mapping string integer keys to
/// filenames. Read once at pipeline start, rewritten once at the end with
/// all new entries merged in. Keys are never reused within a run.
#[derive(Debug, Default)]
pub struct MediaManifest {
    entries: HashMap<String, String>,
}

impl MediaManifest {
    pub fn load(scratch_dir: &Path) -> Result<Self, ProphoraError> {
        let path = scratch_dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(MediaManifest::default());
        }
        let json = fs::read_to_string(&path)?;
        let entries: HashMap<String, String> = serde_json::from_str(&json)?;
        Ok(MediaManifest { entries })
    }

    /// Least unused successor over the integer key space.
    pub fn allocate_key(&self) -> String {
        let mut n: u64 = 0;
        while self.entries.contains_key(&n.to_string()) {
            n += 1;
        }
        n.to_string()
    }

    pub fn insert(&mut self, key: String, filename: String) {
        self.entries.insert(key, filename);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self, scratch_dir: &Path) -> Result<(), ProphoraError> {
        let json = serde_json::to_string(&self.entries)?;
        fs::write(scratch_dir.join(MANIFEST_FILE), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_fills_the_smallest_hole() {
        let mut manifest = MediaManifest::default();
        assert_eq!(manifest.allocate_key(), "0");

        manifest.insert("0".to_string(), "a.mp3".to_string());
        manifest.insert("1".to_string(), "b.mp3".to_string());
        manifest.insert("3".to_string(), "c.mp3".to_string());
        assert_eq!(manifest.allocate_key(), "2");

        manifest.insert("2".to_string(), "d.mp3".to_string());
        assert_eq!(manifest.allocate_key(), "4");
    }

    #[test]
    fn load_merge_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("media"), r#"{"0":"existing.mp3"}"#).unwrap();

        let mut manifest = MediaManifest::load(dir.path()).unwrap();
        assert_eq!(manifest.len(), 1);
        let key = manifest.allocate_key();
        assert_eq!(key, "1");
        manifest.insert(key, "semera.mp3".to_string());
        manifest.save(dir.path()).unwrap();

        let reloaded = MediaManifest::load(dir.path()).unwrap();
        assert_eq!(reloaded.entries["0"], "existing.mp3");
        assert_eq!(reloaded.entries["1"], "semera.mp3");
    }

    #[test]
    fn missing_manifest_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = MediaManifest::load(dir.path()).unwrap();
        assert!(manifest.is_empty());
    }
}
