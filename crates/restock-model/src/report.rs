//! Presenting predictions: single-item results and annotated tables.

use std::fmt;

use crate::status::RestockStatus;
use crate::table::RawTable;
use crate::ModelError;

/// Column appended to an exported table with the predicted status per row.
pub const PREDICTED_STATUS_COLUMN: &str = "Predicted Status";

/// Outcome of a single-item prediction.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PredictionResult {
    /// Predicted restock status.
    pub predicted_status: RestockStatus,
    /// Probability of the predicted status, in `[0, 1]`.
    pub confidence: f64,
}

impl PredictionResult {
    /// Create a result.
    #[must_use]
    pub fn new(predicted_status: RestockStatus, confidence: f64) -> Self {
        Self {
            predicted_status,
            confidence,
        }
    }
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_result(self.predicted_status, self.confidence))
    }
}

/// Render a prediction as `Status: <label> (Confidence: <pct>%)`.
///
/// The percentage is `confidence * 100` with two decimals.
#[must_use]
pub fn format_result(status: RestockStatus, confidence: f64) -> String {
    format!("Status: {status} (Confidence: {:.2}%)", confidence * 100.0)
}

/// Return a copy of `table` with one predicted status per row in
/// [`PREDICTED_STATUS_COLUMN`].
///
/// Existing columns and row order are preserved. If the column already
/// exists it is overwritten, so annotating twice never duplicates it.
///
/// # Errors
///
/// Returns [`ModelError::LengthMismatch`] when `predictions.len()` differs
/// from the number of rows.
pub fn attach_predictions(
    table: &RawTable,
    predictions: &[RestockStatus],
) -> Result<RawTable, ModelError> {
    if predictions.len() != table.n_rows() {
        return Err(ModelError::LengthMismatch {
            n_rows: table.n_rows(),
            n_labels: predictions.len(),
        });
    }
    let values = predictions.iter().map(ToString::to_string).collect();
    Ok(table.with_column(PREDICTED_STATUS_COLUMN, values))
}
