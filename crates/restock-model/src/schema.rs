//! The fixed column contract shared by training and inference.

use crate::ModelError;
use crate::table::RawTable;

/// Item identifier column; required on upload, never a feature.
pub const ITEM_NAME: &str = "Item Name";
/// Drug category (tablet, syrup, ...).
pub const CATEGORY: &str = "Category";
/// Packaging unit (box, bottle, ...).
pub const UNIT: &str = "Unit";
/// Unit price.
pub const PRICE: &str = "Price";
/// Stock at the start of the period.
pub const OPENING_STOCK: &str = "Opening Stock";
/// Units sold during the period.
pub const UNITS_SOLD: &str = "Units Sold";
/// Stock left at the end of the period.
pub const REMAINING_STOCK: &str = "Remaining Stock";
/// Labeled restock status; the training target.
pub const STATUS: &str = "Status Needed";

/// How a feature column's cells are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ColumnKind {
    /// Free-text category, mapped to an integer code by a label encoder.
    Categorical,
    /// Non-negative real number.
    Amount,
    /// Non-negative whole number.
    Count,
}

/// One feature column of the schema.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FeatureColumn {
    name: String,
    kind: ColumnKind,
}

impl FeatureColumn {
    /// Create a feature column.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Return the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the column kind.
    #[must_use]
    pub fn kind(&self) -> ColumnKind {
        self.kind
    }
}

/// Ordered feature columns plus the target column.
///
/// The feature order is the column order of every encoded row, at training
/// and inference alike, and the canonical order the split tie rule follows.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FeatureSchema {
    identifier: Option<String>,
    features: Vec<FeatureColumn>,
    target: String,
}

impl FeatureSchema {
    /// Create a schema from explicit parts.
    #[must_use]
    pub fn new(identifier: Option<String>, features: Vec<FeatureColumn>, target: impl Into<String>) -> Self {
        Self {
            identifier,
            features,
            target: target.into(),
        }
    }

    /// The pharmacy inventory schema.
    ///
    /// Features, in order: Category, Unit, Price, Opening Stock, Units Sold,
    /// Remaining Stock. Target: Status Needed. Identifier: Item Name.
    #[must_use]
    pub fn pharmacy() -> Self {
        Self::new(
            Some(ITEM_NAME.to_string()),
            vec![
                FeatureColumn::new(CATEGORY, ColumnKind::Categorical),
                FeatureColumn::new(UNIT, ColumnKind::Categorical),
                FeatureColumn::new(PRICE, ColumnKind::Amount),
                FeatureColumn::new(OPENING_STOCK, ColumnKind::Count),
                FeatureColumn::new(UNITS_SOLD, ColumnKind::Count),
                FeatureColumn::new(REMAINING_STOCK, ColumnKind::Count),
            ],
            STATUS,
        )
    }

    /// Return the feature columns in encoding order.
    #[must_use]
    pub fn features(&self) -> &[FeatureColumn] {
        &self.features
    }

    /// Return the feature names in encoding order.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.clone()).collect()
    }

    /// Return the categorical feature columns in encoding order.
    pub fn categorical(&self) -> impl Iterator<Item = &FeatureColumn> {
        self.features
            .iter()
            .filter(|f| f.kind == ColumnKind::Categorical)
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// Return the target column name.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Return the identifier column name, if the schema has one.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Check that every feature column is present in `table`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingColumn`] listing all absent feature columns.
    pub fn require_features(&self, table: &RawTable) -> Result<(), ModelError> {
        require(table, self.features.iter().map(|f| f.name.as_str()))
    }

    /// Check the full upload contract: identifier, features and target.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingColumn`] listing all absent columns.
    pub fn require_training_columns(&self, table: &RawTable) -> Result<(), ModelError> {
        let columns = self
            .identifier
            .iter()
            .map(String::as_str)
            .chain(self.features.iter().map(|f| f.name.as_str()))
            .chain(std::iter::once(self.target.as_str()));
        require(table, columns)
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::pharmacy()
    }
}

fn require<'a>(table: &RawTable, columns: impl Iterator<Item = &'a str>) -> Result<(), ModelError> {
    let missing: Vec<String> = columns
        .filter(|name| table.column_index(name).is_none())
        .map(String::from)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ModelError::MissingColumn { columns: missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pharmacy_feature_order() {
        let schema = FeatureSchema::pharmacy();
        assert_eq!(
            schema.feature_names(),
            vec![CATEGORY, UNIT, PRICE, OPENING_STOCK, UNITS_SOLD, REMAINING_STOCK]
        );
        let categorical: Vec<&str> = schema.categorical().map(FeatureColumn::name).collect();
        assert_eq!(categorical, vec![CATEGORY, UNIT]);
        assert_eq!(schema.target(), STATUS);
    }

    #[test]
    fn missing_columns_are_all_listed() {
        let table = RawTable::new(
            vec![ITEM_NAME.into(), CATEGORY.into(), PRICE.into()],
            vec![vec!["Paracetamol".into(), "Tablet".into(), "5000".into()]],
        )
        .unwrap();
        let err = FeatureSchema::pharmacy()
            .require_training_columns(&table)
            .unwrap_err();
        match err {
            ModelError::MissingColumn { columns } => assert_eq!(
                columns,
                vec![UNIT, OPENING_STOCK, UNITS_SOLD, REMAINING_STOCK, STATUS]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn features_only_check_ignores_target() {
        let headers = FeatureSchema::pharmacy().feature_names();
        let table = RawTable::new(headers, vec![]).unwrap();
        assert!(FeatureSchema::pharmacy().require_features(&table).is_ok());
        assert!(FeatureSchema::pharmacy().require_training_columns(&table).is_err());
    }
}
