//! Per-user state: the schema, encoders and model built from one upload.

use tracing::{info, instrument};

use crate::classifier::{ClassifierConfig, RestockClassifier, TrainedModel};
use crate::encoder::EncoderRegistry;
use crate::metrics::{rank_importances, ConfusionMatrix, TrainingEvaluation};
use crate::preprocess::{build_feature_matrix, encode_single, extract_labels, EncodedRecord};
use crate::report::{attach_predictions, PredictionResult};
use crate::schema::FeatureSchema;
use crate::status::RestockStatus;
use crate::summary::{DatasetSummary, DEFAULT_ALERT_THRESHOLD};
use crate::table::{RawRecord, RawTable};
use crate::view::TreeView;
use crate::ModelError;

/// Everything derived from one uploaded table.
///
/// Built whole by [`Session::upload`] and never mutated afterwards, so the
/// registry always matches the model it was trained with.
#[derive(Debug, Clone)]
pub struct TrainedSession {
    schema: FeatureSchema,
    registry: EncoderRegistry,
    classifier: RestockClassifier,
    table: RawTable,
    matrix: Vec<EncodedRecord>,
    labels: Vec<RestockStatus>,
}

impl TrainedSession {
    #[instrument(skip_all, fields(n_rows = table.n_rows()))]
    fn train(
        table: RawTable,
        schema: &FeatureSchema,
        config: &ClassifierConfig,
    ) -> Result<Self, ModelError> {
        schema.require_training_columns(&table)?;
        if table.is_empty() {
            return Err(ModelError::InsufficientData {
                n_rows: 0,
                n_labels: 0,
            });
        }
        let registry = EncoderRegistry::fit(&table, schema)?;
        let matrix = build_feature_matrix(&table, schema, &registry)?;
        let labels = extract_labels(&table, schema)?;

        let mut classifier = RestockClassifier::new(config.clone());
        classifier.fit(&matrix, &labels, &schema.feature_names())?;

        Ok(Self {
            schema: schema.clone(),
            registry,
            classifier,
            table,
            matrix,
            labels,
        })
    }

    /// Predict the status of one item described by its attributes.
    ///
    /// # Errors
    ///
    /// [`ModelError::UnknownCategory`] for a category or unit not seen in the
    /// upload; [`ModelError::InvalidValue`] for negative or non-finite numbers.
    pub fn predict_item(&self, record: &RawRecord) -> Result<PredictionResult, ModelError> {
        let encoded = encode_single(record, &self.schema, &self.registry)?;
        let (status, confidence) = self.classifier.predict_one(&encoded)?;
        Ok(PredictionResult::new(status, confidence))
    }

    /// Return the uploaded table with a predicted status per row.
    ///
    /// # Errors
    ///
    /// Propagates prediction errors; none are expected for the training table.
    pub fn annotate(&self) -> Result<RawTable, ModelError> {
        let predictions = self.classifier.predict(&self.matrix)?;
        attach_predictions(&self.table, &predictions)
    }

    /// Predict every row of another table with the same features and
    /// return it annotated. The target column is not required.
    ///
    /// # Errors
    ///
    /// [`ModelError::MissingColumn`], [`ModelError::UnknownCategory`] or
    /// [`ModelError::InvalidValue`] from encoding.
    pub fn annotate_table(&self, table: &RawTable) -> Result<RawTable, ModelError> {
        let matrix = build_feature_matrix(table, &self.schema, &self.registry)?;
        let predictions = self.classifier.predict(&matrix)?;
        attach_predictions(table, &predictions)
    }

    /// Build the read-only tree view.
    ///
    /// # Errors
    ///
    /// Only if the session's own parts disagree, which `upload` prevents.
    pub fn tree_view(&self) -> Result<TreeView, ModelError> {
        TreeView::build(self.model()?, &self.schema, &self.registry)
    }

    /// Evaluate the model on its own training rows.
    ///
    /// # Errors
    ///
    /// Propagates prediction errors.
    pub fn evaluate(&self) -> Result<TrainingEvaluation, ModelError> {
        let predicted = self.classifier.predict(&self.matrix)?;
        let confusion = ConfusionMatrix::from_labels(&self.labels, &predicted)?;
        let model = self.model()?;
        let tree = model.tree();
        Ok(TrainingEvaluation {
            accuracy: confusion.accuracy(),
            majority_baseline: confusion.majority_baseline(),
            class_metrics: confusion.class_metrics(),
            confusion,
            feature_importances: rank_importances(&tree.feature_importances(), model.feature_names()),
            n_nodes: tree.n_nodes(),
            n_leaves: tree.n_leaves(),
            depth: tree.depth(),
        })
    }

    /// Summarize the uploaded labels.
    #[must_use]
    pub fn summary(&self, alert_threshold: usize) -> DatasetSummary {
        DatasetSummary::from_labels(&self.labels, alert_threshold)
    }

    /// Return the valid values of a categorical column.
    #[must_use]
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.registry.categories(column)
    }

    /// Return the trained model.
    ///
    /// # Errors
    ///
    /// Never fails for a session built by `upload`.
    pub fn model(&self) -> Result<&TrainedModel, ModelError> {
        self.classifier.model()
    }

    /// Return the schema.
    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Return the encoder registry.
    #[must_use]
    pub fn registry(&self) -> &EncoderRegistry {
        &self.registry
    }

    /// Return the uploaded table.
    #[must_use]
    pub fn table(&self) -> &RawTable {
        &self.table
    }

    /// Return the training labels.
    #[must_use]
    pub fn labels(&self) -> &[RestockStatus] {
        &self.labels
    }
}

/// A single user's working state across requests.
///
/// Starts empty. Each successful [`Session::upload`] replaces the trained
/// state as one value; a failed upload leaves the previous state in place.
#[derive(Debug, Clone)]
pub struct Session {
    config: ClassifierConfig,
    schema: FeatureSchema,
    alert_threshold: usize,
    trained: Option<TrainedSession>,
}

impl Session {
    /// Create an empty session for the pharmacy schema.
    #[must_use]
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            schema: FeatureSchema::pharmacy(),
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            trained: None,
        }
    }

    /// Set the restock alert threshold used by [`Session::summary`].
    #[must_use]
    pub fn with_alert_threshold(mut self, alert_threshold: usize) -> Self {
        self.alert_threshold = alert_threshold;
        self
    }

    /// Train on `table` and make it the active dataset.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::MissingColumn`] | required columns are absent (all are listed) |
    /// | [`ModelError::InsufficientData`] | the table has no rows |
    /// | [`ModelError::InvalidValue`] | a numeric cell or status label is malformed |
    /// | [`ModelError::Tree`] | the tree configuration is invalid |
    pub fn upload(&mut self, table: RawTable) -> Result<&TrainedSession, ModelError> {
        let trained = TrainedSession::train(table, &self.schema, &self.config)?;
        info!(
            n_rows = trained.table.n_rows(),
            n_nodes = trained.classifier.model()?.tree().n_nodes(),
            "dataset uploaded and model trained"
        );
        Ok(&*self.trained.insert(trained))
    }

    /// Return the active trained state.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::FatalUsage`] before the first successful upload.
    pub fn active(&self) -> Result<&TrainedSession, ModelError> {
        self.trained.as_ref().ok_or(ModelError::FatalUsage {
            operation: "session",
            reason: "no dataset has been uploaded",
        })
    }

    /// Predict one item against the active dataset.
    ///
    /// # Errors
    ///
    /// [`ModelError::FatalUsage`] before upload, otherwise as
    /// [`TrainedSession::predict_item`].
    pub fn predict_item(&self, record: &RawRecord) -> Result<PredictionResult, ModelError> {
        self.active()?.predict_item(record)
    }

    /// Summarize the active dataset with the session's alert threshold.
    ///
    /// # Errors
    ///
    /// [`ModelError::FatalUsage`] before upload.
    pub fn summary(&self) -> Result<DatasetSummary, ModelError> {
        Ok(self.active()?.summary(self.alert_threshold))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ClassifierConfig::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(category: &str, remaining: u64, status: Option<RestockStatus>) -> RawRecord {
        RawRecord {
            item_name: format!("{category}-{remaining}"),
            category: category.into(),
            unit: "Box".into(),
            price: 5000.0,
            opening_stock: 100,
            units_sold: 100 - remaining,
            remaining_stock: remaining,
            status,
        }
    }

    fn two_rows() -> RawTable {
        RawTable::from_records(&[
            record("Tablet", 10, Some(RestockStatus::NeedsRestock)),
            record("Syrup", 80, Some(RestockStatus::NoRestockNeeded)),
        ])
    }

    #[test]
    fn queries_before_upload_are_fatal() {
        let session = Session::new(ClassifierConfig::new());
        assert!(matches!(session.active(), Err(ModelError::FatalUsage { .. })));
        assert!(matches!(session.summary(), Err(ModelError::FatalUsage { .. })));
        let err = session.predict_item(&record("Tablet", 1, None)).unwrap_err();
        assert!(matches!(err, ModelError::FatalUsage { .. }));
    }

    #[test]
    fn failed_upload_keeps_previous_state() {
        let mut session = Session::new(ClassifierConfig::new());
        session.upload(two_rows()).unwrap();

        let mut rows = two_rows().rows().to_vec();
        rows[0][3] = "not a price".into();
        let bad = RawTable::new(two_rows().headers().to_vec(), rows).unwrap();
        assert!(session.upload(bad).is_err());

        let active = session.active().unwrap();
        assert_eq!(active.table(), &two_rows());
        assert_eq!(active.categories("Category").unwrap(), &["Syrup", "Tablet"]);
    }

    #[test]
    fn reupload_replaces_categories() {
        let mut session = Session::new(ClassifierConfig::new());
        session.upload(two_rows()).unwrap();
        session
            .upload(RawTable::from_records(&[
                record("Capsule", 5, Some(RestockStatus::NeedsRestock)),
                record("Ointment", 70, Some(RestockStatus::NoRestockNeeded)),
            ]))
            .unwrap();
        let active = session.active().unwrap();
        assert_eq!(active.categories("Category").unwrap(), &["Capsule", "Ointment"]);
        assert!(matches!(
            active.predict_item(&record("Tablet", 10, None)),
            Err(ModelError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn empty_table_is_insufficient() {
        let mut session = Session::new(ClassifierConfig::new());
        let err = session.upload(RawTable::from_records(&[])).unwrap_err();
        assert!(matches!(err, ModelError::InsufficientData { n_rows: 0, .. }));
    }

    #[test]
    fn annotate_and_evaluate_training_rows() {
        let mut session = Session::new(ClassifierConfig::new());
        let active = session.upload(two_rows()).unwrap();
        let annotated = active.annotate().unwrap();
        let predicted: Vec<&str> = annotated.column("Predicted Status").unwrap().collect();
        assert_eq!(predicted, vec!["Needs Restock", "No Restock Needed"]);

        let eval = active.evaluate().unwrap();
        assert!((eval.accuracy - 1.0).abs() < f64::EPSILON);
        assert!(eval.accuracy >= eval.majority_baseline);
        assert_eq!(eval.feature_importances[0].name, "Category");
        assert_eq!(eval.n_leaves, 2);
    }

    #[test]
    fn summary_uses_configured_threshold() {
        let mut session = Session::new(ClassifierConfig::new()).with_alert_threshold(0);
        session.upload(two_rows()).unwrap();
        let summary = session.summary().unwrap();
        assert_eq!(summary.needs_restock, 1);
        assert!(summary.restock_alert);
    }
}
