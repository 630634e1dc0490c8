//! Spreadsheet/CSV decoding into [`UploadedRow`]s.
//!
//! The first row of the first sheet is the header and is discarded. Data
//! rows map positionally: amount, type, date, note, payment method.

use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use api_types::transaction::{PaymentMethod, TransactionType};
use calamine::{Data, Reader};
use chrono::NaiveDate;

use crate::{
    error::DecodeError,
    money::Amount,
    row::{RowId, UploadedRow},
};

/// Size ceiling announced to the user for a single upload.
pub const MAX_FILE_BYTES: u64 = 25 * 1024 * 1024;

pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["csv", "xls", "xlsx"];

const AMOUNT: usize = 0;
const TYPE: usize = 1;
const DATE: usize = 2;
const NOTE: usize = 3;
const PAYMENT_METHOD: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    /// Anything the workbook reader understands (xls, xlsx, xlsm, xlsb, ods).
    Workbook,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Some(Self::Workbook),
            _ => None,
        }
    }

    /// Format implied by a declared MIME type, for files without a usable
    /// extension.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "text/csv" => Some(Self::Csv),
            "application/vnd.ms-excel"
            | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Some(Self::Workbook)
            }
            _ => None,
        }
    }
}

/// A file handed over by drag-and-drop, with the MIME type the source
/// declared for it (if any).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DroppedFile {
    pub path: PathBuf,
    pub mime: Option<String>,
}

impl DroppedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mime: None,
        }
    }

    /// The format to decode this file as, or `None` when neither the
    /// extension nor the declared MIME type is on the allow-list.
    ///
    /// An allowed extension wins over the MIME type.
    pub fn format(&self) -> Option<FileFormat> {
        let by_extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| {
                ACCEPTED_EXTENSIONS
                    .iter()
                    .any(|accepted| accepted.eq_ignore_ascii_case(ext))
            })
            .and_then(|_| FileFormat::from_path(&self.path));
        by_extension.or_else(|| self.mime.as_deref().and_then(FileFormat::from_mime))
    }
}

/// A dropped file that passed the allow-list, with the format it was
/// accepted as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptedFile {
    pub path: PathBuf,
    pub format: FileFormat,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DropSelection {
    pub accepted: Vec<AcceptedFile>,
    pub rejected: Vec<PathBuf>,
}

/// Splits dropped files by the MIME/extension allow-list, keeping order.
pub fn filter_dropped(files: impl IntoIterator<Item = DroppedFile>) -> DropSelection {
    let mut selection = DropSelection::default();
    for file in files {
        if let Some(format) = file.format() {
            selection.accepted.push(AcceptedFile {
                path: file.path,
                format,
            });
        } else {
            tracing::warn!("rejected dropped file {}", file.path.display());
            selection.rejected.push(file.path);
        }
    }
    selection
}

#[derive(Clone, Copy, Debug)]
pub struct Decoder {
    max_bytes: u64,
}

impl Default for Decoder {
    fn default() -> Self {
        Self {
            max_bytes: MAX_FILE_BYTES,
        }
    }
}

impl Decoder {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Decodes the first file of a selection; the others are ignored.
    pub fn decode_first(&self, files: &[AcceptedFile]) -> Result<Vec<UploadedRow>, DecodeError> {
        let first = files.first().ok_or(DecodeError::NoFile)?;
        if files.len() > 1 {
            tracing::debug!(
                "{} files selected, only {} is read",
                files.len(),
                first.path.display()
            );
        }
        self.decode_file(&first.path, first.format)
    }

    /// Decodes a file whose format is taken from its extension.
    pub fn decode_path(&self, path: &Path) -> Result<Vec<UploadedRow>, DecodeError> {
        let format = FileFormat::from_path(path)
            .ok_or_else(|| DecodeError::UnsupportedType(path.display().to_string()))?;
        self.decode_file(path, format)
    }

    pub fn decode_file(
        &self,
        path: &Path,
        format: FileFormat,
    ) -> Result<Vec<UploadedRow>, DecodeError> {
        self.check_size(std::fs::metadata(path)?.len())?;
        let bytes = std::fs::read(path)?;
        let rows = self.decode_bytes(&bytes, format)?;
        tracing::debug!("decoded {} rows from {}", rows.len(), path.display());
        Ok(rows)
    }

    pub fn decode_bytes(
        &self,
        bytes: &[u8],
        format: FileFormat,
    ) -> Result<Vec<UploadedRow>, DecodeError> {
        self.check_size(bytes.len() as u64)?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        let grid = match format {
            FileFormat::Csv => csv_grid(bytes)?,
            FileFormat::Workbook => workbook_grid(bytes)?,
        };
        rows_from_grid(grid)
    }

    fn check_size(&self, size: u64) -> Result<(), DecodeError> {
        if size > self.max_bytes {
            return Err(DecodeError::FileTooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}

fn csv_grid(bytes: &[u8]) -> Result<Vec<Vec<String>>, DecodeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(record.iter().map(str::to_string).collect());
    }
    Ok(grid)
}

fn workbook_grid(bytes: &[u8]) -> Result<Vec<Vec<String>>, DecodeError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|err| DecodeError::Workbook(err.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DecodeError::NoSheet)?
        .map_err(|err| DecodeError::Workbook(err.to_string()))?;

    range
        .rows()
        .enumerate()
        .map(|(index, cells)| {
            cells
                .iter()
                .enumerate()
                .map(|(column, cell)| workbook_cell(cell, column, index + 1))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect()
}

fn workbook_cell(cell: &Data, column: usize, line: usize) -> Result<String, DecodeError> {
    let text = match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.clone(),
        Data::DateTimeIso(value) => match column {
            DATE => value.split('T').next().unwrap_or_default().to_string(),
            _ => value.clone(),
        },
        Data::DateTime(value) => excel_serial_to_date(value.as_f64()).unwrap_or_default(),
        Data::Float(value) => match column {
            DATE => excel_serial_to_date(*value).unwrap_or_else(|| value.to_string()),
            AMOUNT => format!("{value:.2}"),
            _ => value.to_string(),
        },
        Data::Int(value) => match column {
            DATE => excel_serial_to_date(*value as f64).unwrap_or_else(|| value.to_string()),
            _ => value.to_string(),
        },
        Data::Error(err) => {
            return Err(DecodeError::Cell {
                line,
                column: column_name(column),
                message: format!("cell error {err:?}"),
            });
        }
        other => other.to_string(),
    };
    Ok(text)
}

/// Excel stores dates as days since 1899-12-30 (which absorbs the 1900 leap
/// year bug).
fn excel_serial_to_date(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = base.checked_add_days(chrono::Days::new(serial.trunc() as u64))?;
    Some(date.format("%Y-%m-%d").to_string())
}

fn column_name(column: usize) -> &'static str {
    match column {
        AMOUNT => "amount",
        TYPE => "type",
        DATE => "date",
        NOTE => "note",
        PAYMENT_METHOD => "payment method",
        _ => "extra column",
    }
}

fn cell_text(cells: &[String], column: usize) -> &str {
    cells.get(column).map(|c| c.trim()).unwrap_or_default()
}

fn rows_from_grid(grid: Vec<Vec<String>>) -> Result<Vec<UploadedRow>, DecodeError> {
    let mut rows = Vec::new();
    // Line 1 is the header.
    for (index, cells) in grid.into_iter().enumerate().skip(1) {
        if cells.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let line = index + 1;
        let cell = |column: usize| cell_text(&cells, column);
        let invalid = |column: usize, message: String| DecodeError::Cell {
            line,
            column: column_name(column),
            message,
        };

        let amount = match cell(AMOUNT) {
            "" => Amount::ZERO,
            raw => raw
                .parse::<Amount>()
                .map_err(|err| invalid(AMOUNT, format!("{err}: \"{raw}\"")))?,
        };
        let kind = match cell(TYPE) {
            "" => None,
            raw => Some(
                TransactionType::parse(raw)
                    .ok_or_else(|| invalid(TYPE, format!("unknown type \"{raw}\"")))?,
            ),
        };
        let payment_method = match cell(PAYMENT_METHOD) {
            "" => None,
            raw => Some(PaymentMethod::parse(raw).ok_or_else(|| {
                invalid(PAYMENT_METHOD, format!("unknown payment method \"{raw}\""))
            })?),
        };

        rows.push(UploadedRow {
            id: RowId(rows.len()),
            amount,
            kind,
            date: cell(DATE).to_string(),
            note: cell(NOTE).to_string(),
            payment_method,
            category: None,
        });
    }
    Ok(rows)
}
