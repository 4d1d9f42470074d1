use std::{
    fs::{
        self,
        File,
    },
    io::Write,
    path::Path,
};

use zip::{
    write::SimpleFileOptions,
    ZipArchive,
    ZipWriter,
};

use crate::core::ProphoraError;

/// Unpacks an .apkg archive into `dest_dir`. Fatal on any failure; nothing
/// has been mutated yet at extraction time.
pub fn extract(archive_path: &Path, dest_dir: &Path) -> Result<(), ProphoraError> {
    let file = File::open(archive_path)
        .map_err(|e| ProphoraError::ArchiveTool(format!("Failed to open {:?}: {}", archive_path, e)))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| ProphoraError::ArchiveTool(format!("Failed to read {:?}: {}", archive_path, e)))?;
    archive
        .extract(dest_dir)
        .map_err(|e| ProphoraError::ArchiveTool(format!("Failed to extract {:?}: {}", archive_path, e)))?;
    Ok(())
}

/// Packs the flat scratch directory back into an .apkg at `output_path`.
/// .apkg layout has no subdirectories: collection.anki2, media, and the
/// numbered audio files all sit at the archive root.
pub fn pack(dir: &Path, output_path: &Path) -> Result<(), ProphoraError> {
    let file = File::create(output_path)
        .map_err(|e| ProphoraError::ArchiveTool(format!("Failed to create {:?}: {}", output_path, e)))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut entries: Vec<_> = fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        zip.start_file(name.as_str(), options)
            .map_err(|e| ProphoraError::ArchiveTool(format!("Failed to add {}: {}", name, e)))?;
        zip.write_all(&fs::read(&path)?)
            .map_err(|e| ProphoraError::ArchiveTool(format!("Failed to write {}: {}", name, e)))?;
    }

    zip.finish()
        .map_err(|e| ProphoraError::ArchiveTool(format!("Failed to finish {:?}: {}", output_path, e)))?;
    Ok(())
}
