use std::fmt;
use std::path::Path;

use crate::error::{DashboardError, Result};

/// MIME type of `.xlsx` workbooks
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// MIME type of legacy `.xls` workbooks
pub const XLS_MIME: &str = "application/vnd.ms-excel";

pub const CSV_MIME: &str = "text/csv";

/// MIME type reported for files whose extension is not recognised
pub const UNKNOWN_MIME: &str = "application/octet-stream";

/// A file selected for bulk import
///
/// Mirrors what a browser hands over from a file picker or a drop: the
/// file name, the MIME type the client determined, and the contents.
#[derive(Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Size of the file contents in bytes
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Map a file extension to the MIME type a browser would report for it
///
/// # Examples
/// ```
/// use ecodash::loader::{mime_for_path, CSV_MIME};
///
/// assert_eq!(mime_for_path("emissions.CSV"), CSV_MIME);
/// assert_eq!(mime_for_path("notes.txt"), "text/plain");
/// ```
pub fn mime_for_path(path: impl AsRef<Path>) -> &'static str {
    let extension = path
        .as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("xlsx") => XLSX_MIME,
        Some("xls") => XLS_MIME,
        Some("csv") => CSV_MIME,
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        _ => UNKNOWN_MIME,
    }
}

/// Read a local file into an [`UploadFile`]
///
/// The MIME type is derived from the extension; acceptance is decided
/// later by the import workflow, not here.
pub fn load_upload(filepath: impl AsRef<Path>) -> Result<UploadFile> {
    let path = filepath.as_ref();
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            DashboardError::Validation(format!("{} is not a file path", path.display()))
        })?
        .to_string();

    let bytes = std::fs::read(path)?;
    Ok(UploadFile::new(name, mime_for_path(path), bytes))
}

/// Read several local files, keeping their order
pub fn load_uploads<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<UploadFile>> {
    paths.iter().map(load_upload).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spreadsheet_extensions_map_to_accepted_types() {
        assert_eq!(mime_for_path("q1.xlsx"), XLSX_MIME);
        assert_eq!(mime_for_path("legacy.XLS"), XLS_MIME);
        assert_eq!(mime_for_path("dir/energy.csv"), CSV_MIME);
        assert_eq!(mime_for_path("no_extension"), UNKNOWN_MIME);
    }

    #[test]
    fn load_upload_reads_name_and_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("energy.csv");
        std::fs::write(&path, "energy_type,quantity\nelectricity,120\n").unwrap();

        let file = load_upload(&path).unwrap();
        assert_eq!(file.name, "energy.csv");
        assert_eq!(file.mime, CSV_MIME);
        assert_eq!(file.size(), 37);
    }

    #[test]
    fn load_uploads_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("b.csv");
        let second = dir.path().join("a.xlsx");
        std::fs::write(&first, "x").unwrap();
        std::fs::write(&second, "y").unwrap();

        let files = load_uploads(&[&first, &second]).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b.csv", "a.xlsx"]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_upload(dir.path().join("absent.csv"));
        assert!(matches!(result, Err(DashboardError::Io(_))));
    }
}
