//! Raw, already-parsed tabular input.

use crate::schema;
use crate::status::RestockStatus;
use crate::ModelError;

/// A header plus string cells, exactly as uploaded.
///
/// Every row has the header's width. Columns outside the schema are kept
/// untouched so exports reproduce the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Create a table, checking every row against the header width.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::RowWidthMismatch`] for the first ragged row.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, ModelError> {
        if let Some((row, cells)) = rows
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != headers.len())
        {
            return Err(ModelError::RowWidthMismatch {
                row,
                expected: headers.len(),
                got: cells.len(),
            });
        }
        Ok(Self { headers, rows })
    }

    /// Build a table in the canonical input layout from typed records.
    ///
    /// Records without a status leave the status cell empty.
    #[must_use]
    pub fn from_records(records: &[RawRecord]) -> Self {
        let headers = [
            schema::ITEM_NAME,
            schema::CATEGORY,
            schema::UNIT,
            schema::PRICE,
            schema::OPENING_STOCK,
            schema::UNITS_SOLD,
            schema::REMAINING_STOCK,
            schema::STATUS,
        ]
        .iter()
        .map(|h| h.to_string())
        .collect();
        let rows = records
            .iter()
            .map(|r| {
                vec![
                    r.item_name.clone(),
                    r.category.clone(),
                    r.unit.clone(),
                    r.price.to_string(),
                    r.opening_stock.to_string(),
                    r.units_sold.to_string(),
                    r.remaining_stock.to_string(),
                    r.status.map(|s| s.to_string()).unwrap_or_default(),
                ]
            })
            .collect();
        Self { headers, rows }
    }

    /// Return the header names.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Return the data rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Return the number of data rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Return `true` when the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Return the position of `name` in the header, if present.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Iterate over the cells of column `name`, in row order.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[idx].as_str()))
    }

    /// Return a copy with column `name` set to `values`.
    ///
    /// An existing column of that name is overwritten in place; otherwise
    /// the column is appended. `values` must have one entry per row.
    pub(crate) fn with_column(&self, name: &str, values: Vec<String>) -> Self {
        debug_assert_eq!(values.len(), self.rows.len());
        let mut headers = self.headers.clone();
        let mut rows = self.rows.clone();
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                headers.push(name.to_string());
                for (row, value) in rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Self { headers, rows }
    }
}

/// One typed inventory row.
///
/// `status` is present for training rows and `None` for items submitted
/// for prediction.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawRecord {
    /// Item name; informational only.
    pub item_name: String,
    /// Drug category.
    pub category: String,
    /// Packaging unit.
    pub unit: String,
    /// Unit price, non-negative.
    pub price: f64,
    /// Stock at the start of the period.
    pub opening_stock: u64,
    /// Units sold during the period.
    pub units_sold: u64,
    /// Stock left at the end of the period.
    pub remaining_stock: u64,
    /// Labeled restock status, if known.
    pub status: Option<RestockStatus>,
}

/// A single feature value looked up by column name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    /// A categorical value.
    Text(&'a str),
    /// A numeric value.
    Number(f64),
}

impl RawRecord {
    /// Look up the value of a canonical column.
    ///
    /// Returns `None` for columns this record type does not carry.
    #[must_use]
    pub fn field(&self, column: &str) -> Option<FieldValue<'_>> {
        match column {
            schema::ITEM_NAME => Some(FieldValue::Text(&self.item_name)),
            schema::CATEGORY => Some(FieldValue::Text(&self.category)),
            schema::UNIT => Some(FieldValue::Text(&self.unit)),
            schema::PRICE => Some(FieldValue::Number(self.price)),
            schema::OPENING_STOCK => Some(FieldValue::Number(self.opening_stock as f64)),
            schema::UNITS_SOLD => Some(FieldValue::Number(self.units_sold as f64)),
            schema::REMAINING_STOCK => Some(FieldValue::Number(self.remaining_stock as f64)),
            _ => None,
        }
    }
}
