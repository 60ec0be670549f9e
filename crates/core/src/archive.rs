//! Annotation archive extraction.

use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Extract every file of the ZIP archive at `archive` into `dest`.
///
/// Entries whose names would escape `dest` (absolute paths, `..`) are
/// rejected. Returns the extracted file paths in archive order.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, CoreError> {
    if !archive.exists() {
        return Err(CoreError::NotFound(archive.to_path_buf()));
    }

    std::fs::create_dir_all(dest)?;
    let file = std::fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;

    let mut extracted = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(CoreError::Validation(format!(
                "Archive entry '{}' escapes the extraction directory",
                entry.name()
            )));
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = std::fs::File::create(&target)?;
        std::io::copy(&mut entry, &mut out)?;
        extracted.push(target);
    }

    tracing::info!(
        archive = %archive.display(),
        dest = %dest.display(),
        files = extracted.len(),
        "Extracted archive",
    );
    Ok(extracted)
}
