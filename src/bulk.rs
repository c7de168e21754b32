//! Bulk spreadsheet import
//!
//! Files are validated up front, then uploaded one at a time to the
//! single-file import endpoint. Per-file outcomes are folded into one
//! [`BulkImportResult`] which is handed back only once every file has
//! resolved. While a batch runs, the only observable state is the
//! [`ImportProgress`] published on a watch channel.

use log::{info, warn};
use serde::Serialize;
use tokio::sync::watch;

use crate::api::Backend;
use crate::error::{DashboardError, Result};
use crate::loader::{CSV_MIME, UploadFile, XLS_MIME, XLSX_MIME};
use crate::models::FileImportOutcome;

/// MIME types accepted for import
pub const ACCEPTED_MIME_TYPES: [&str; 3] = [XLSX_MIME, XLS_MIME, CSV_MIME];

/// Largest accepted file, inclusive
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Error recorded for a file whose upload failed without any message
pub const UPLOAD_FAILED_FALLBACK: &str = "Upload failed";

/// Check a file's type and size
///
/// # Examples
/// ```
/// use ecodash::bulk::validate_file;
/// use ecodash::loader::{UploadFile, CSV_MIME};
///
/// let file = UploadFile::new("energy.csv", CSV_MIME, b"a,b\n1,2\n".to_vec());
/// assert!(validate_file(&file).is_ok());
///
/// let notes = UploadFile::new("notes.txt", "text/plain", Vec::new());
/// assert!(validate_file(&notes).is_err());
/// ```
pub fn validate_file(file: &UploadFile) -> Result<()> {
    if !ACCEPTED_MIME_TYPES.contains(&file.mime.as_str()) {
        return Err(DashboardError::Validation(format!(
            "Invalid file type for {}. Please upload Excel (.xlsx, .xls) or CSV files.",
            file.name
        )));
    }

    if file.size() > MAX_FILE_BYTES {
        return Err(DashboardError::Validation(format!(
            "File {} too large. Maximum size is 10MB.",
            file.name
        )));
    }

    Ok(())
}

/// Position of a running batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportProgress {
    /// 1-based index of the file being uploaded, 0 before the first
    pub current: usize,
    pub total: usize,
    pub active: bool,
}

/// Accumulated outcome of a whole batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkImportResult {
    pub successful: u64,
    pub failed: u64,
    /// Warnings in file order, each prefixed with its file name
    pub warnings: Vec<String>,
    /// Errors in file order, each prefixed with its file name
    pub errors: Vec<String>,
}

impl BulkImportResult {
    /// Fold in the outcome of one successfully uploaded file
    pub fn merge(&mut self, file_name: &str, outcome: FileImportOutcome) {
        self.successful += outcome.successful;
        self.failed += outcome.failed;
        self.warnings.extend(
            outcome
                .warnings
                .into_iter()
                .map(|w| format!("{}: {}", file_name, w)),
        );
        self.errors.extend(
            outcome
                .errors
                .into_iter()
                .map(|e| format!("{}: {}", file_name, e)),
        );
    }

    /// Record a file whose upload call itself failed
    pub fn record_failure(&mut self, file_name: &str, error: &DashboardError) {
        self.failed += 1;
        self.errors.push(format!(
            "{}: {}",
            file_name,
            error.user_message(UPLOAD_FAILED_FALLBACK)
        ));
    }
}

/// Import workflow for one company
pub struct BulkImportWorkflow {
    company_id: String,
    progress: watch::Sender<ImportProgress>,
    validation_errors: Vec<String>,
    last_result: Option<BulkImportResult>,
}

impl BulkImportWorkflow {
    pub fn new(company_id: impl Into<String>) -> Self {
        let (progress, _) = watch::channel(ImportProgress::default());
        Self {
            company_id: company_id.into(),
            progress,
            validation_errors: Vec::new(),
            last_result: None,
        }
    }

    /// Receiver that observes progress of every batch run by this workflow
    pub fn subscribe(&self) -> watch::Receiver<ImportProgress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> ImportProgress {
        *self.progress.borrow()
    }

    /// Last validation message of the most recent selection
    pub fn error(&self) -> Option<&str> {
        self.validation_errors.last().map(String::as_str)
    }

    /// Every validation message of the most recent selection, in file order
    pub fn validation_errors(&self) -> &[String] {
        &self.validation_errors
    }

    /// Result of the most recently completed batch
    pub fn last_result(&self) -> Option<&BulkImportResult> {
        self.last_result.as_ref()
    }

    /// Drop invalid files, remembering why each was rejected
    pub fn select_files(&mut self, files: Vec<UploadFile>) -> Vec<UploadFile> {
        self.validation_errors.clear();

        files
            .into_iter()
            .filter(|file| match validate_file(file) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Rejected {}: {}", file.name, e);
                    self.validation_errors.push(e.to_string());
                    false
                }
            })
            .collect()
    }

    /// Validate `files` and import the valid ones sequentially
    ///
    /// Returns `None` without contacting the backend when no file passes
    /// validation. A failing file never stops the batch.
    pub async fn run(
        &mut self,
        backend: &dyn Backend,
        files: Vec<UploadFile>,
    ) -> Option<BulkImportResult> {
        let valid = self.select_files(files);
        if valid.is_empty() {
            return None;
        }

        let total = valid.len();
        info!(
            "Importing {} file(s) for company {}",
            total, self.company_id
        );

        let mut result = BulkImportResult::default();
        for (index, file) in valid.iter().enumerate() {
            self.progress.send_replace(ImportProgress {
                current: index + 1,
                total,
                active: true,
            });

            match backend.import_file(&self.company_id, file).await {
                Ok(outcome) => {
                    info!(
                        "Imported {}: {} successful, {} failed",
                        file.name, outcome.successful, outcome.failed
                    );
                    result.merge(&file.name, outcome);
                }
                Err(e) => {
                    warn!("Import of {} failed: {}", file.name, e);
                    result.record_failure(&file.name, &e);
                }
            }
        }

        self.progress.send_modify(|progress| progress.active = false);
        info!(
            "Import finished: {} successful, {} failed",
            result.successful, result.failed
        );

        self.last_result = Some(result.clone());
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, mime: &str, size: usize) -> UploadFile {
        UploadFile::new(name, mime, vec![b'x'; size])
    }

    #[test]
    fn accepts_spreadsheets_and_csv() {
        assert!(validate_file(&file("a.xlsx", XLSX_MIME, 10)).is_ok());
        assert!(validate_file(&file("a.xls", XLS_MIME, 10)).is_ok());
        assert!(validate_file(&file("a.csv", CSV_MIME, 10)).is_ok());
    }

    #[test]
    fn rejects_other_types() {
        let err = validate_file(&file("scan.pdf", "application/pdf", 10)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid file type for scan.pdf. Please upload Excel (.xlsx, .xls) or CSV files."
        );
    }

    #[test]
    fn size_limit_is_inclusive() {
        let at_limit = file("big.csv", CSV_MIME, MAX_FILE_BYTES as usize);
        assert!(validate_file(&at_limit).is_ok());

        let over = file("huge.csv", CSV_MIME, MAX_FILE_BYTES as usize + 1);
        let err = validate_file(&over).unwrap_err();
        assert_eq!(
            err.to_string(),
            "File huge.csv too large. Maximum size is 10MB."
        );
    }

    #[test]
    fn selection_keeps_every_message_and_exposes_last() {
        let mut workflow = BulkImportWorkflow::new("1");
        let kept = workflow.select_files(vec![
            file("one.txt", "text/plain", 1),
            file("two.csv", CSV_MIME, 1),
            file("three.doc", "application/msword", 1),
        ]);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "two.csv");
        assert_eq!(workflow.validation_errors().len(), 2);
        assert!(workflow.error().unwrap().contains("three.doc"));
    }

    #[test]
    fn merge_prefixes_messages() {
        let mut result = BulkImportResult::default();
        result.merge(
            "q1.xlsx",
            FileImportOutcome {
                successful: 3,
                failed: 1,
                warnings: vec!["Row 2: unit assumed kWh".to_string()],
                errors: vec!["Row 5: missing date".to_string()],
            },
        );
        assert_eq!(result.successful, 3);
        assert_eq!(result.failed, 1);
        assert_eq!(result.warnings, vec!["q1.xlsx: Row 2: unit assumed kWh"]);
        assert_eq!(result.errors, vec!["q1.xlsx: Row 5: missing date"]);
    }

    #[test]
    fn failure_uses_detail_then_message() {
        let mut result = BulkImportResult::default();
        result.record_failure(
            "a.csv",
            &DashboardError::Api {
                status: 400,
                detail: Some("Missing column: quantity".to_string()),
            },
        );
        result.record_failure("b.csv", &DashboardError::Transport("connection reset".to_string()));
        result.record_failure("c.csv", &DashboardError::Transport(String::new()));

        assert_eq!(result.failed, 3);
        assert_eq!(
            result.errors,
            vec![
                "a.csv: Missing column: quantity",
                "b.csv: Network error: connection reset",
                "c.csv: Upload failed",
            ]
        );
    }
}
