use restock_tree::TreeError;

/// Errors from the restock classification pipeline.
///
/// Every variant carries the column, value, row or operation a caller needs
/// to tell the user what to correct. Row indices are zero-based data rows
/// (the header is not counted).
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Returned when required schema columns are absent from the input table.
    #[error("missing required column(s): {}", .columns.join(", "))]
    MissingColumn {
        /// Every missing column name, in schema order.
        columns: Vec<String>,
    },

    /// Returned when a categorical value was not observed at training time.
    #[error("unknown category \"{value}\" in column \"{column}\"{}", at_row(.row))]
    UnknownCategory {
        /// The categorical column.
        column: String,
        /// The unseen value.
        value: String,
        /// The offending row, when encoding a table.
        row: Option<usize>,
    },

    /// Returned when there is nothing to fit, or labels and rows disagree in count.
    #[error("insufficient training data: {n_rows} rows with {n_labels} labels")]
    InsufficientData {
        /// Number of encoded rows.
        n_rows: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when an operation is invoked in the wrong lifecycle state.
    #[error("{operation}: {reason}")]
    FatalUsage {
        /// The operation that was attempted.
        operation: &'static str,
        /// Why it cannot run.
        reason: &'static str,
    },

    /// Returned when decoding a code that no category maps to.
    #[error("code {code} is not valid for column \"{column}\" ({n_categories} categories)")]
    InvalidCode {
        /// The categorical column.
        column: String,
        /// The out-of-range code.
        code: usize,
        /// Number of categories the encoder knows.
        n_categories: usize,
    },

    /// Returned when predicted labels do not line up one-to-one with table rows.
    #[error("{n_labels} predicted labels for a table of {n_rows} rows")]
    LengthMismatch {
        /// Rows in the table.
        n_rows: usize,
        /// Labels supplied.
        n_labels: usize,
    },

    /// Returned when a cell cannot be read as the type its column requires.
    #[error("invalid value \"{raw}\" in column \"{column}\"{}: {reason}", at_row(.row))]
    InvalidValue {
        /// The column holding the value.
        column: String,
        /// The offending row, when reading a table.
        row: Option<usize>,
        /// The raw cell text.
        raw: String,
        /// What the column expects.
        reason: &'static str,
    },

    /// Returned when a table row has a different width than the header.
    #[error("row {row} has {got} cells, expected {expected}")]
    RowWidthMismatch {
        /// The offending row.
        row: usize,
        /// Header width.
        expected: usize,
        /// Cells in the row.
        got: usize,
    },

    /// Returned when the underlying decision tree rejects its input.
    #[error("decision tree: {0}")]
    Tree(#[from] TreeError),
}

fn at_row(row: &Option<usize>) -> String {
    row.map(|r| format!(" at row {r}")).unwrap_or_default()
}
