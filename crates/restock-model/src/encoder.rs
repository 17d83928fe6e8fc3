//! Reversible category ↔ integer code mappings.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::schema::FeatureSchema;
use crate::table::RawTable;
use crate::ModelError;

/// Bijection between the categories of one column and the codes `0..n`.
///
/// Codes are assigned in ascending lexicographic order of the categories,
/// so fitting on the same values in any order yields the same mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    column: String,
    categories: Vec<String>,
    codes: HashMap<String, usize>,
}

impl LabelEncoder {
    /// Fit an encoder on the distinct values of a column.
    pub fn fit<'a>(column: impl Into<String>, values: impl IntoIterator<Item = &'a str>) -> Self {
        let categories: Vec<String> = values
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect();
        let codes = categories
            .iter()
            .enumerate()
            .map(|(code, c)| (c.clone(), code))
            .collect();
        Self {
            column: column.into(),
            categories,
            codes,
        }
    }

    /// Return the code for `value`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownCategory`] if `value` was not seen during fit.
    pub fn encode(&self, value: &str) -> Result<usize, ModelError> {
        self.codes
            .get(value)
            .copied()
            .ok_or_else(|| ModelError::UnknownCategory {
                column: self.column.clone(),
                value: value.to_string(),
                row: None,
            })
    }

    /// Return the category for `code`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidCode`] if `code` is out of range.
    pub fn decode(&self, code: usize) -> Result<&str, ModelError> {
        self.categories
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| ModelError::InvalidCode {
                column: self.column.clone(),
                code,
                n_categories: self.categories.len(),
            })
    }

    /// Return the column this encoder belongs to.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Return the known categories in code order.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Return the number of known categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Return `true` if the encoder knows no categories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// One [`LabelEncoder`] per categorical column, built from a training table.
///
/// Read-only once built; a new upload builds a new registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderRegistry {
    encoders: BTreeMap<String, LabelEncoder>,
}

impl EncoderRegistry {
    /// Fit an encoder for every categorical column of `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingColumn`] listing every categorical
    /// column absent from `table`.
    pub fn fit(table: &RawTable, schema: &FeatureSchema) -> Result<Self, ModelError> {
        let missing: Vec<String> = schema
            .categorical()
            .filter(|c| table.column_index(c.name()).is_none())
            .map(|c| c.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ModelError::MissingColumn { columns: missing });
        }

        let mut encoders = BTreeMap::new();
        for column in schema.categorical() {
            if let Some(values) = table.column(column.name()) {
                let encoder = LabelEncoder::fit(column.name(), values);
                debug!(column = column.name(), n_categories = encoder.len(), "fitted label encoder");
                encoders.insert(column.name().to_string(), encoder);
            }
        }
        Ok(Self { encoders })
    }

    /// Return the encoder for `column`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::FatalUsage`] if `column` has no encoder, which
    /// means the registry was built from a different schema.
    pub fn get(&self, column: &str) -> Result<&LabelEncoder, ModelError> {
        self.encoders.get(column).ok_or(ModelError::FatalUsage {
            operation: "encode",
            reason: "no label encoder for this column; registry and schema disagree",
        })
    }

    /// Encode `value` in `column`.
    ///
    /// # Errors
    ///
    /// [`ModelError::UnknownCategory`] for unseen values, [`ModelError::FatalUsage`]
    /// for a column without an encoder.
    pub fn encode(&self, column: &str, value: &str) -> Result<usize, ModelError> {
        self.get(column)?.encode(value)
    }

    /// Decode `code` in `column`.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidCode`] for out-of-range codes, [`ModelError::FatalUsage`]
    /// for a column without an encoder.
    pub fn decode(&self, column: &str, code: usize) -> Result<&str, ModelError> {
        self.get(column)?.decode(code)
    }

    /// Return the known categories of `column`, in code order.
    ///
    /// These are the only values a prediction request may use.
    #[must_use]
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.encoders.get(column).map(LabelEncoder::categories)
    }

    /// Iterate over all encoders, ordered by column name.
    pub fn iter(&self) -> impl Iterator<Item = &LabelEncoder> {
        self.encoders.values()
    }
}
