//! ZIP packaging of generated reports.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};

/// Write a deflated archive at `zip_path` holding `source` as its only
/// entry, named after the source file.
///
/// # Errors
///
/// Returns an error if the source cannot be read or the archive cannot be
/// written.
pub fn write_single_entry_zip(source: &Path, zip_path: &Path) -> Result<()> {
    let entry_name = source
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::internal(format!("no file name in {}", source.display())))?;

    let mut reader = BufReader::new(File::open(source).map_err(|e| Error::StorageRead {
        path: source.to_path_buf(),
        source: e,
    })?);
    let file = File::create(zip_path).map_err(|e| Error::StorageWrite {
        path: zip_path.to_path_buf(),
        source: e,
    })?;

    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(entry_name, options)?;
    io::copy(&mut reader, &mut writer)?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_single_entry_named_after_source() {
        let temp_dir = TempDir::new().unwrap();
        let pdf = temp_dir.path().join("report-1.pdf");
        let zip_path = temp_dir.path().join("report-1.zip");
        std::fs::write(&pdf, b"%PDF-1.4 fake").unwrap();

        write_single_entry_zip(&pdf, &zip_path).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "report-1.pdf");
        assert_eq!(entry.compression(), CompressionMethod::Deflated);

        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"%PDF-1.4 fake");
    }

    #[test]
    fn test_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let err = write_single_entry_zip(
            &temp_dir.path().join("missing.pdf"),
            &temp_dir.path().join("out.zip"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::StorageRead { .. }));
        assert!(!temp_dir.path().join("out.zip").exists());
    }
}
