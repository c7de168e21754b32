use lazy_static::lazy_static;
use regex::Regex;
use std::error::Error;
use std::path::{Path, PathBuf};

use crate::records::DomainRecord;

lazy_static! {
    static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(r"[^A-Za-z0-9._-]+").unwrap();
}

/// File name under which the bulk-import template is saved
pub const TEMPLATE_FILENAME: &str = "import-template.xlsx";

/// Make a server- or user-supplied name safe to use as a file name
///
/// Runs of characters outside `[A-Za-z0-9._-]` collapse to a single `_`,
/// and leading dots are dropped so the result can never climb out of the
/// download directory.
///
/// # Examples
/// ```
/// use ecodash::downloader::sanitize_filename;
///
/// assert_eq!(sanitize_filename("Q1 report (final).pdf"), "Q1_report_final_.pdf");
/// assert_eq!(sanitize_filename("../../etc/passwd"), "_.._etc_passwd");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(name, "_");
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "download".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Save a downloaded document into `dir`
///
/// This is what a browser's save flow does with a blob: the bytes land in
/// the download directory under the suggested name. The directory is
/// created if needed.
///
/// # Returns
/// * `std::io::Result<PathBuf>` - Path of the written file
pub fn save_download(dir: &Path, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(sanitize_filename(filename));
    std::fs::write(&path, bytes)?;
    Ok(path)
}

fn push_csv_field(out: &mut String, value: &str) {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        let escaped = value.replace('"', "\"\"");
        out.push('"');
        out.push_str(&escaped);
        out.push('"');
    } else {
        out.push_str(value);
    }
}

/// Convert a record listing to CSV
///
/// The first line holds the record type's export headers; every record
/// follows in the order given. Fields containing commas, quotes or
/// newlines are quoted.
///
/// # Arguments
/// * `records` - Records to export
///
/// # Returns
/// * `String` - CSV content
pub fn records_to_csv<R: DomainRecord>(records: &[R]) -> String {
    let mut csv_content = String::new();

    csv_content.push_str(&R::export_headers().join(","));
    csv_content.push('\n');

    for record in records {
        for (i, value) in record.export_row().iter().enumerate() {
            if i > 0 {
                csv_content.push(',');
            }
            push_csv_field(&mut csv_content, value);
        }
        csv_content.push('\n');
    }

    csv_content
}

/// Convert a record listing to XLSX
///
/// Writes a single worksheet with a header row. Cells that parse as
/// numbers are written as numbers so the workbook can be summed directly.
///
/// # Arguments
/// * `records` - Records to export
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - XLSX file content as bytes or an error
#[cfg(feature = "web")]
pub fn records_to_xlsx<R: DomainRecord>(records: &[R]) -> Result<Vec<u8>, Box<dyn Error>> {
    use rust_xlsxwriter::{Format, Workbook};

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(R::LABEL)?;

    for (c, header) in R::export_headers().iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, *header, &header_format)?;
    }

    for (r, record) in records.iter().enumerate() {
        let row = (r + 1) as u32;
        for (c, value) in record.export_row().iter().enumerate() {
            let col = c as u16;
            match value.parse::<f64>() {
                Ok(number) => worksheet.write_number(row, col, number)?,
                Err(_) => worksheet.write_string(row, col, value)?,
            };
        }
    }

    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}

/// Convert a record listing to XLSX (requires the `web` feature)
#[cfg(not(feature = "web"))]
pub fn records_to_xlsx<R: DomainRecord>(_records: &[R]) -> Result<Vec<u8>, Box<dyn Error>> {
    Err("XLSX export requires the 'web' feature".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DisposalMethod, WasteRecord, WasteType};
    use chrono::NaiveDate;

    fn waste(facility: &str) -> WasteRecord {
        WasteRecord {
            id: Some(1),
            company_id: None,
            waste_type: WasteType::Recyclable,
            quantity: 250.0,
            unit: "kg".to_string(),
            disposal_method: DisposalMethod::Recycling,
            cost: Some(30.0),
            emission_factor: None,
            emissions_kgco2e: 5.5,
            is_hazardous: false,
            facility_name: facility.to_string(),
            facility_location: None,
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            additional_data: None,
        }
    }

    #[test]
    fn csv_has_header_and_rows() {
        let csv = records_to_csv(&[waste("Depot")]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("date,waste_type,quantity"));
        assert_eq!(
            lines[1],
            "2024-02-01,recyclable,250,kg,recycling,false,30,,5.5,Depot,"
        );
    }

    #[test]
    fn csv_quotes_special_characters() {
        let csv = records_to_csv(&[waste("Depot, \"North\"")]);
        assert!(csv.contains("\"Depot, \"\"North\"\"\""));
    }

    #[test]
    fn sanitize_handles_empty_and_dots() {
        assert_eq!(sanitize_filename("..."), "download");
        assert_eq!(
            sanitize_filename("sustainability-report-2024-01-01.pdf"),
            "sustainability-report-2024-01-01.pdf"
        );
    }

    #[test]
    fn save_download_writes_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("reports");
        let path = save_download(&target, "report 1.pdf", b"%PDF-1.7").unwrap();
        assert_eq!(path, target.join("report_1.pdf"));
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.7");
    }

    #[cfg(feature = "web")]
    #[test]
    fn xlsx_export_produces_zip_container() {
        let bytes = records_to_xlsx(&[waste("Depot")]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
