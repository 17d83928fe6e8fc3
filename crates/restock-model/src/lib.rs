//! Pharmacy restock classification: schema, encoding, training and reporting.
//!
//! The pipeline runs raw table → [`build_feature_matrix`] through an
//! [`EncoderRegistry`] → [`RestockClassifier::fit`]. Single items go
//! through [`encode_single`] and batch exports through
//! [`attach_predictions`]. A [`Session`] owns the schema, registry and
//! model built from one upload and swaps them together.

mod classifier;
mod encoder;
mod error;
mod metrics;
mod preprocess;
mod report;
pub mod schema;
mod session;
mod status;
mod summary;
mod table;
mod view;

pub use classifier::{confidence, ClassifierConfig, RestockClassifier, TrainedModel};
pub use encoder::{EncoderRegistry, LabelEncoder};
pub use error::ModelError;
pub use metrics::{ClassMetrics, ConfusionMatrix, RankedFeature, TrainingEvaluation};
pub use preprocess::{build_feature_matrix, encode_single, extract_labels, EncodedRecord};
pub use report::{attach_predictions, format_result, PredictionResult, PREDICTED_STATUS_COLUMN};
pub use schema::{ColumnKind, FeatureColumn, FeatureSchema};
pub use session::{Session, TrainedSession};
pub use status::RestockStatus;
pub use summary::{DatasetSummary, DEFAULT_ALERT_THRESHOLD};
pub use table::{FieldValue, RawRecord, RawTable};
pub use view::{NodeView, SplitView, TreeView};
