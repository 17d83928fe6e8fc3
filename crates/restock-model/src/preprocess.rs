//! Raw rows → encoded numeric rows.

use tracing::{debug, instrument};

use crate::encoder::EncoderRegistry;
use crate::schema::{ColumnKind, FeatureColumn, FeatureSchema};
use crate::status::RestockStatus;
use crate::table::{FieldValue, RawRecord, RawTable};
use crate::ModelError;

/// A row restricted to the schema's features, in schema order, with
/// categorical values replaced by their codes.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRecord(Vec<f64>);

impl EncodedRecord {
    /// Wrap already-encoded values.
    #[must_use]
    pub fn from_values(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Return the encoded values in schema order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

/// Encode every row of `table`, preserving row order.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ModelError::MissingColumn`] | a feature column is absent (all are listed) |
/// | [`ModelError::UnknownCategory`] | a categorical cell was not seen at training |
/// | [`ModelError::InvalidValue`] | a numeric cell is not a non-negative number, or a count is fractional |
#[instrument(skip_all, fields(n_rows = table.n_rows()))]
pub fn build_feature_matrix(
    table: &RawTable,
    schema: &FeatureSchema,
    registry: &EncoderRegistry,
) -> Result<Vec<EncodedRecord>, ModelError> {
    schema.require_features(table)?;

    // Resolved once; require_features guarantees every lookup succeeds.
    let positions: Vec<(usize, &FeatureColumn)> = schema
        .features()
        .iter()
        .filter_map(|f| table.column_index(f.name()).map(|idx| (idx, f)))
        .collect();

    let matrix = table
        .rows()
        .iter()
        .enumerate()
        .map(|(row, cells)| {
            positions
                .iter()
                .map(|&(idx, column)| encode_cell(&cells[idx], column, registry, Some(row)))
                .collect::<Result<Vec<f64>, _>>()
                .map(EncodedRecord)
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(n_rows = matrix.len(), n_features = schema.n_features(), "encoded feature matrix");
    Ok(matrix)
}

/// Encode one ad-hoc item for prediction.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ModelError::MissingColumn`] | the schema names a column [`RawRecord`] does not carry |
/// | [`ModelError::UnknownCategory`] | a categorical value was not seen at training |
/// | [`ModelError::InvalidValue`] | a numeric value is negative or not finite |
pub fn encode_single(
    record: &RawRecord,
    schema: &FeatureSchema,
    registry: &EncoderRegistry,
) -> Result<EncodedRecord, ModelError> {
    let missing: Vec<String> = schema
        .features()
        .iter()
        .filter(|f| record.field(f.name()).is_none())
        .map(|f| f.name().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ModelError::MissingColumn { columns: missing });
    }

    schema
        .features()
        .iter()
        .map(|column| match record.field(column.name()) {
            Some(FieldValue::Text(text)) => encode_cell(text, column, registry, None),
            Some(FieldValue::Number(value)) => encode_number(value, column),
            None => Err(ModelError::MissingColumn {
                columns: vec![column.name().to_string()],
            }),
        })
        .collect::<Result<Vec<f64>, _>>()
        .map(EncodedRecord)
}

/// Parse the target column of a training table.
///
/// # Errors
///
/// [`ModelError::MissingColumn`] when the target column is absent;
/// [`ModelError::InvalidValue`] for a cell that is not a known status label.
pub fn extract_labels(
    table: &RawTable,
    schema: &FeatureSchema,
) -> Result<Vec<RestockStatus>, ModelError> {
    let cells = table
        .column(schema.target())
        .ok_or_else(|| ModelError::MissingColumn {
            columns: vec![schema.target().to_string()],
        })?;
    cells
        .enumerate()
        .map(|(row, cell)| {
            cell.parse::<RestockStatus>().map_err(|e| match e {
                ModelError::InvalidValue { column, raw, reason, .. } => ModelError::InvalidValue {
                    column,
                    row: Some(row),
                    raw,
                    reason,
                },
                other => other,
            })
        })
        .collect()
}

fn encode_cell(
    cell: &str,
    column: &FeatureColumn,
    registry: &EncoderRegistry,
    row: Option<usize>,
) -> Result<f64, ModelError> {
    match column.kind() {
        ColumnKind::Categorical => registry
            .encode(column.name(), cell)
            .map(|code| code as f64)
            .map_err(|e| match e {
                ModelError::UnknownCategory { column, value, .. } => {
                    ModelError::UnknownCategory { column, value, row }
                }
                other => other,
            }),
        ColumnKind::Amount | ColumnKind::Count => {
            let value: f64 = cell.trim().parse().map_err(|_| ModelError::InvalidValue {
                column: column.name().to_string(),
                row,
                raw: cell.to_string(),
                reason: "expected a number",
            })?;
            encode_number(value, column).map_err(|e| match e {
                ModelError::InvalidValue { column, raw: _, reason, .. } => ModelError::InvalidValue {
                    column,
                    row,
                    raw: cell.to_string(),
                    reason,
                },
                other => other,
            })
        }
    }
}

fn encode_number(value: f64, column: &FeatureColumn) -> Result<f64, ModelError> {
    let invalid = |reason| ModelError::InvalidValue {
        column: column.name().to_string(),
        row: None,
        raw: value.to_string(),
        reason,
    };
    match column.kind() {
        ColumnKind::Categorical => Err(invalid("expected a category, got a number")),
        _ if !value.is_finite() => Err(invalid("expected a finite number")),
        _ if value < 0.0 => Err(invalid("expected a non-negative number")),
        ColumnKind::Count if value.fract() != 0.0 => Err(invalid("expected a whole number")),
        _ => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CATEGORY, OPENING_STOCK, PRICE, STATUS, UNIT};

    fn training_table() -> RawTable {
        RawTable::from_records(&[
            RawRecord {
                item_name: "Paracetamol".into(),
                category: "Tablet".into(),
                unit: "Box".into(),
                price: 10000.0,
                opening_stock: 100,
                units_sold: 90,
                remaining_stock: 10,
                status: Some(RestockStatus::NeedsRestock),
            },
            RawRecord {
                item_name: "OBH".into(),
                category: "Syrup".into(),
                unit: "Bottle".into(),
                price: 20000.0,
                opening_stock: 50,
                units_sold: 5,
                remaining_stock: 45,
                status: Some(RestockStatus::NoRestockNeeded),
            },
        ])
    }

    fn fitted() -> (RawTable, FeatureSchema, EncoderRegistry) {
        let table = training_table();
        let schema = FeatureSchema::pharmacy();
        let registry = EncoderRegistry::fit(&table, &schema).unwrap();
        (table, schema, registry)
    }

    #[test]
    fn matrix_preserves_row_and_column_order() {
        let (table, schema, registry) = fitted();
        let matrix = build_feature_matrix(&table, &schema, &registry).unwrap();
        // Syrup < Tablet, Bottle < Box.
        assert_eq!(matrix[0].values(), &[1.0, 1.0, 10000.0, 100.0, 90.0, 10.0]);
        assert_eq!(matrix[1].values(), &[0.0, 0.0, 20000.0, 50.0, 5.0, 45.0]);
    }

    #[test]
    fn single_and_batch_encoding_agree() {
        let (table, schema, registry) = fitted();
        let matrix = build_feature_matrix(&table, &schema, &registry).unwrap();
        let record = RawRecord {
            item_name: String::new(),
            category: "Tablet".into(),
            unit: "Box".into(),
            price: 10000.0,
            opening_stock: 100,
            units_sold: 90,
            remaining_stock: 10,
            status: None,
        };
        assert_eq!(encode_single(&record, &schema, &registry).unwrap(), matrix[0]);
    }

    #[test]
    fn unknown_category_reports_row() {
        let (_, schema, registry) = fitted();
        let mut rows = training_table().rows().to_vec();
        rows[1][1] = "Capsule".into();
        let table = RawTable::new(training_table().headers().to_vec(), rows).unwrap();
        let err = build_feature_matrix(&table, &schema, &registry).unwrap_err();
        match err {
            ModelError::UnknownCategory { column, value, row } => {
                assert_eq!(column, CATEGORY);
                assert_eq!(value, "Capsule");
                assert_eq!(row, Some(1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_feature_columns_listed() {
        let (_, schema, registry) = fitted();
        let table = RawTable::new(
            vec![CATEGORY.into(), PRICE.into()],
            vec![vec!["Tablet".into(), "1".into()]],
        )
        .unwrap();
        let err = build_feature_matrix(&table, &schema, &registry).unwrap_err();
        match err {
            ModelError::MissingColumn { columns } => {
                assert!(columns.iter().any(|c| c == UNIT));
                assert!(columns.iter().any(|c| c == OPENING_STOCK));
                assert!(!columns.iter().any(|c| c == STATUS));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_numeric_cells() {
        let (table, schema, registry) = fitted();
        let price_idx = table.column_index(PRICE).unwrap();
        let stock_idx = table.column_index(OPENING_STOCK).unwrap();
        for (idx, raw) in [(price_idx, "abc"), (price_idx, "-5"), (stock_idx, "2.5"), (price_idx, "NaN")] {
            let mut rows = table.rows().to_vec();
            rows[0][idx] = raw.into();
            let bad = RawTable::new(table.headers().to_vec(), rows).unwrap();
            let err = build_feature_matrix(&bad, &schema, &registry).unwrap_err();
            match err {
                ModelError::InvalidValue { raw: got, row, .. } => {
                    assert_eq!(got, raw);
                    assert_eq!(row, Some(0));
                }
                other => panic!("unexpected error for {raw}: {other}"),
            }
        }
    }

    #[test]
    fn labels_parse_and_report_row() {
        let (table, schema, _) = fitted();
        let labels = extract_labels(&table, &schema).unwrap();
        assert_eq!(labels, vec![RestockStatus::NeedsRestock, RestockStatus::NoRestockNeeded]);

        let mut rows = table.rows().to_vec();
        let status_idx = table.column_index(STATUS).unwrap();
        rows[1][status_idx] = "Unknown".into();
        let bad = RawTable::new(table.headers().to_vec(), rows).unwrap();
        let err = extract_labels(&bad, &schema).unwrap_err();
        assert!(matches!(err, ModelError::InvalidValue { row: Some(1), .. }));
    }
}
