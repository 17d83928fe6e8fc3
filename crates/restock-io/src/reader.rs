//! CSV inventory reader with header normalization.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use restock_model::schema;
use restock_model::RawTable;
use tracing::{debug, info, instrument};

use crate::IoError;

/// Header spellings accepted for each canonical column, compared
/// case-insensitively after trimming.
const HEADER_ALIASES: [(&str, &str); 8] = [
    ("nama item", schema::ITEM_NAME),
    ("jenis", schema::CATEGORY),
    ("satuan", schema::UNIT),
    ("harga", schema::PRICE),
    ("stok awal", schema::OPENING_STOCK),
    ("terjual", schema::UNITS_SOLD),
    ("sisa stok", schema::REMAINING_STOCK),
    ("status kebutuhan", schema::STATUS),
];

const CANONICAL: [&str; 8] = [
    schema::ITEM_NAME,
    schema::CATEGORY,
    schema::UNIT,
    schema::PRICE,
    schema::OPENING_STOCK,
    schema::UNITS_SOLD,
    schema::REMAINING_STOCK,
    schema::STATUS,
];

/// Map a header cell to its canonical column name.
///
/// Unknown headers are returned trimmed but otherwise unchanged.
#[must_use]
pub fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim();
    let folded = trimmed.to_lowercase();
    CANONICAL
        .iter()
        .find(|c| c.to_lowercase() == folded)
        .copied()
        .or_else(|| {
            HEADER_ALIASES
                .iter()
                .find(|(alias, _)| *alias == folded)
                .map(|&(_, canonical)| canonical)
        })
        .map_or_else(|| trimmed.to_string(), String::from)
}

/// Reads an inventory table from a CSV file.
///
/// Expected CSV format:
/// - Header row required; column order is free
/// - Column names as in [`restock_model::schema`], or their Indonesian
///   equivalents (`Nama Item`, `Jenis`, `Satuan`, `Harga`, `Stok Awal`,
///   `Terjual`, `Sisa Stok`, `Status Kebutuhan`)
/// - Every row has the header's width; cells are trimmed
///
/// Column presence and cell types are checked later, by the schema and
/// preprocessor, so the reader accepts any rectangular table.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::DuplicateColumn`] | Two headers normalize to the same name |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
pub struct InventoryReader {
    path: PathBuf,
}

impl InventoryReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`RawTable`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<RawTable, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so ragged rows hit InconsistentRowLength rather
        // than a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.parse_error(e))?;
        let headers: Vec<String> = header.iter().map(normalize_header).collect();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (idx, name) in headers.iter().enumerate() {
            if seen.insert(name.as_str(), idx).is_some() {
                return Err(IoError::DuplicateColumn {
                    path: self.path.clone(),
                    column: name.clone(),
                });
            }
        }
        debug!(n_columns = headers.len(), ?headers, "read CSV header");

        let mut rows = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.parse_error(e))?;
            if record.len() != headers.len() {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: headers.len(),
                    got: record.len(),
                });
            }
            rows.push(record.iter().map(String::from).collect::<Vec<_>>());
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let table = RawTable::new(headers, rows).map_err(|e| IoError::Table {
            path: self.path.clone(),
            source: e,
        })?;
        info!(n_rows = table.n_rows(), n_columns = table.headers().len(), "inventory loaded");
        Ok(table)
    }

    fn parse_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn normalizes_indonesian_and_case() {
        assert_eq!(normalize_header(" Jenis "), schema::CATEGORY);
        assert_eq!(normalize_header("STOK AWAL"), schema::OPENING_STOCK);
        assert_eq!(normalize_header("units sold"), schema::UNITS_SOLD);
        assert_eq!(normalize_header(" Supplier "), "Supplier");
    }

    #[test]
    fn reads_and_trims() {
        let file = write_csv("Nama Item, Jenis ,Harga\n Paracetamol ,Tablet, 5000\n");
        let table = InventoryReader::new(file.path()).read().unwrap();
        assert_eq!(table.headers(), &[schema::ITEM_NAME, schema::CATEGORY, schema::PRICE]);
        assert_eq!(table.rows()[0], vec!["Paracetamol", "Tablet", "5000"]);
    }

    #[test]
    fn header_only_is_empty() {
        let file = write_csv("Item Name,Category\n");
        let err = InventoryReader::new(file.path()).read().unwrap_err();
        assert!(matches!(err, IoError::EmptyDataset { .. }));
    }

    #[test]
    fn ragged_row_reports_index() {
        let file = write_csv("Item Name,Category\nA,Tablet\nB\n");
        let err = InventoryReader::new(file.path()).read().unwrap_err();
        assert!(matches!(
            err,
            IoError::InconsistentRowLength { row_index: 1, expected: 2, got: 1, .. }
        ));
    }

    #[test]
    fn alias_and_canonical_collide() {
        let file = write_csv("Category,Jenis\nTablet,Syrup\n");
        let err = InventoryReader::new(file.path()).read().unwrap_err();
        assert!(matches!(err, IoError::DuplicateColumn { .. }));
    }

    #[test]
    fn missing_file() {
        let err = InventoryReader::new(Path::new("/nonexistent/stock.csv"))
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }
}
