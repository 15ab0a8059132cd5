//! Zip packaging of an archive root.
//!
//! The zip container is transport only; the layout contract lives in
//! [`super::layout`]. Entry names always use `/` separators regardless of
//! host platform.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

/// Errors that can occur while packing or unpacking an archive.
#[derive(Debug, Error)]
pub enum PackageError {
    /// I/O error reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Zip codec error.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Entry path would escape the extraction root.
    #[error("refusing to extract unsafe zip entry '{0}'")]
    UnsafeEntry(String),
}

/// Result type for packaging operations.
pub type Result<T> = std::result::Result<T, PackageError>;

// =============================================================================
// Packing
// =============================================================================

/// Zip the contents of `source_root` into `destination`.
///
/// Entries are named relative to `source_root` with forward slashes, so the
/// archive's top level is the set of API folders (plus the global
/// `mediation/` folder when present), never the staging directory itself.
pub fn zip_directory(source_root: &Path, destination: &Path) -> Result<()> {
    let mut files = Vec::new();
    collect_files(source_root, &mut files)?;

    let output = File::create(destination)?;
    let mut writer = ZipWriter::new(output);
    let options: FileOptions = FileOptions::default();

    for path in files {
        let relative = path
            .strip_prefix(source_root)
            .map_err(|_| PackageError::UnsafeEntry(path.display().to_string()))?;
        let entry_name = zip_entry_name(relative);
        writer.start_file(entry_name, options)?;
        let mut input = File::open(&path)?;
        io::copy(&mut input, &mut writer)?;
    }

    writer.finish()?;
    Ok(())
}

/// Collect every regular file under `dir`, depth first.
fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Render a relative path as a `/`-separated zip entry name.
fn zip_entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// =============================================================================
// Unpacking
// =============================================================================

/// Extract a zip archive into `destination_root`.
///
/// Entries that would resolve outside the root (absolute paths, `..`) are
/// rejected rather than skipped, so a malformed archive fails loudly.
pub fn unzip_to(zip_path: &Path, destination_root: &Path) -> Result<()> {
    let file = File::open(zip_path)?;
    let mut archive = ZipArchive::new(file)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let relative = entry
            .enclosed_name()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| PackageError::UnsafeEntry(entry.name().to_string()))?;
        let target = destination_root.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut output = File::create(&target)?;
        io::copy(&mut entry, &mut output)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_zip_round_trip() {
        let staging = TempDir::new().unwrap();
        write(
            staging.path(),
            "PetStore-1.0.0/meta-information/api.json",
            "{}",
        );
        write(staging.path(), "PetStore-1.0.0/docs/docs.json", "{}");
        write(staging.path(), "mediation/in/log_in_message", "<sequence/>");

        let out = TempDir::new().unwrap();
        let zip_path = out.path().join("ExportedAPIs.zip");
        zip_directory(staging.path(), &zip_path).unwrap();

        let unpacked = TempDir::new().unwrap();
        unzip_to(&zip_path, unpacked.path()).unwrap();

        assert_eq!(
            fs::read_to_string(
                unpacked
                    .path()
                    .join("PetStore-1.0.0/meta-information/api.json")
            )
            .unwrap(),
            "{}"
        );
        assert_eq!(
            fs::read_to_string(unpacked.path().join("mediation/in/log_in_message")).unwrap(),
            "<sequence/>"
        );
    }

    #[test]
    fn test_entry_names_use_forward_slashes() {
        let staging = TempDir::new().unwrap();
        write(staging.path(), "PetStore-1.0.0/docs/docs.json", "{}");

        let out = TempDir::new().unwrap();
        let zip_path = out.path().join("a.zip");
        zip_directory(staging.path(), &zip_path).unwrap();

        let mut archive = ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["PetStore-1.0.0/docs/docs.json".to_string()]);
    }

    #[test]
    fn test_zip_entry_name_is_relative() {
        assert_eq!(
            zip_entry_name(Path::new("a").join("b.txt").as_path()),
            "a/b.txt"
        );
    }
}
