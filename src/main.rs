use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use restock_io::{InventoryReader, OutputName, ResultWriter};
use restock_model::{
    ClassMetrics, ClassifierConfig, ConfusionMatrix, DatasetSummary, PredictionResult,
    RankedFeature, RawRecord, RestockStatus, Session, TrainedSession, TrainingEvaluation,
    DEFAULT_ALERT_THRESHOLD, PREDICTED_STATUS_COLUMN,
};

#[derive(Parser)]
#[command(name = "restock")]
#[command(about = "Decision-tree restock prediction for a pharmacy's drug inventory")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Maximum tree depth (unlimited if not set)
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,
}

/// Where result files go.
#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Base name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    name: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

/// Attributes of the item to classify.
#[derive(Args, Debug, Clone)]
struct ItemArgs {
    /// Item name (informational only)
    #[arg(long, default_value = "")]
    item_name: String,

    /// Drug category; must be one seen in the training data
    #[arg(long)]
    category: String,

    /// Packaging unit; must be one seen in the training data
    #[arg(long)]
    unit: String,

    /// Unit price
    #[arg(long)]
    price: f64,

    /// Stock at the start of the period
    #[arg(long)]
    opening_stock: u64,

    /// Units sold during the period
    #[arg(long)]
    units_sold: u64,

    /// Stock left at the end of the period
    #[arg(long)]
    remaining_stock: u64,
}

impl From<ItemArgs> for RawRecord {
    fn from(item: ItemArgs) -> Self {
        RawRecord {
            item_name: item.item_name,
            category: item.category,
            unit: item.unit,
            price: item.price,
            opening_stock: item.opening_stock,
            units_sold: item.units_sold,
            remaining_stock: item.remaining_stock,
            status: None,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print dataset figures and the restock alert
    Summary {
        /// Path to the inventory CSV file
        #[arg(long)]
        data: PathBuf,

        /// Alert when more than this many items need restocking
        #[arg(long, default_value_t = DEFAULT_ALERT_THRESHOLD)]
        alert_threshold: usize,
    },

    /// Train on a dataset and predict the status of one item
    Predict {
        /// Path to the inventory CSV file
        #[arg(long)]
        data: PathBuf,

        #[command(flatten)]
        item: ItemArgs,
    },

    /// Write the dataset with a predicted status per row
    Export {
        /// Path to the inventory CSV file
        #[arg(long)]
        data: PathBuf,

        /// Annotate this table instead of the training data
        #[arg(long)]
        items: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Write the fitted tree as JSON and Graphviz
    Tree {
        /// Path to the inventory CSV file
        #[arg(long)]
        data: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Report training accuracy, confusion matrix and feature importances
    Evaluate {
        /// Path to the inventory CSV file
        #[arg(long)]
        data: PathBuf,

        /// Also write `{name}_evaluate.json` to this directory
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Base name for the evaluation file
        #[arg(long, default_value = "restock")]
        name: String,
    },
}

#[derive(Serialize)]
struct SummaryOutput<'a> {
    data: &'a Path,
    #[serde(flatten)]
    summary: &'a DatasetSummary,
    categories: Vec<CategoryOptions<'a>>,
}

#[derive(Serialize)]
struct CategoryOptions<'a> {
    column: &'a str,
    values: &'a [String],
}

#[derive(Serialize)]
struct PredictOutput<'a> {
    item_name: &'a str,
    #[serde(flatten)]
    result: &'a PredictionResult,
}

#[derive(Serialize)]
struct ExportOutput {
    path: PathBuf,
    n_rows: usize,
    n_needs_restock: usize,
}

#[derive(Serialize)]
struct TreeOutput {
    json: PathBuf,
    dot: PathBuf,
    n_nodes: usize,
    depth: usize,
}

#[derive(Serialize)]
struct EvaluateOutput<'a> {
    n_rows: usize,
    training_accuracy: f64,
    majority_baseline: f64,
    confusion_matrix: &'a ConfusionMatrix,
    class_metrics: &'a [ClassMetrics],
    feature_importances: &'a [RankedFeature],
    n_nodes: usize,
    n_leaves: usize,
    depth: usize,
    written: Option<PathBuf>,
}

impl<'a> EvaluateOutput<'a> {
    fn new(n_rows: usize, evaluation: &'a TrainingEvaluation, written: Option<PathBuf>) -> Self {
        Self {
            n_rows,
            training_accuracy: evaluation.accuracy,
            majority_baseline: evaluation.majority_baseline,
            confusion_matrix: &evaluation.confusion,
            class_metrics: &evaluation.class_metrics,
            feature_importances: &evaluation.feature_importances,
            n_nodes: evaluation.n_nodes,
            n_leaves: evaluation.n_leaves,
            depth: evaluation.depth,
            written,
        }
    }
}

/// Read `data` and train a session on it.
fn train(data: &Path, config: ClassifierConfig, alert_threshold: usize) -> Result<Session> {
    let table = InventoryReader::new(data)
        .read()
        .context("failed to read inventory CSV")?;
    let mut session = Session::new(config).with_alert_threshold(alert_threshold);
    session
        .upload(table)
        .context("failed to train restock classifier")?;
    Ok(session)
}

fn active(session: &Session) -> Result<&TrainedSession> {
    session.active().context("no trained dataset")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ClassifierConfig::new()
        .with_seed(cli.seed)
        .with_max_depth(cli.max_depth);

    match cli.command {
        Command::Summary {
            data,
            alert_threshold,
        } => {
            let session = train(&data, config, alert_threshold)?;
            let summary = session.summary().context("failed to summarize dataset")?;
            let trained = active(&session)?;

            let categories = trained
                .schema()
                .categorical()
                .filter_map(|column| {
                    trained.categories(column.name()).map(|values| CategoryOptions {
                        column: column.name(),
                        values,
                    })
                })
                .collect();

            let output = SummaryOutput {
                data: &data,
                summary: &summary,
                categories,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict { data, item } => {
            let session = train(&data, config, DEFAULT_ALERT_THRESHOLD)?;
            let record = RawRecord::from(item);
            let result = session
                .predict_item(&record)
                .context("prediction failed")?;
            info!(status = %result.predicted_status, confidence = result.confidence, "item classified");

            println!("{result}");
            let output = PredictOutput {
                item_name: &record.item_name,
                result: &result,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Export {
            data,
            items,
            output,
        } => {
            let name = OutputName::new(output.name)?;
            let session = train(&data, config, DEFAULT_ALERT_THRESHOLD)?;
            let trained = active(&session)?;

            let annotated = match items {
                Some(path) => {
                    let table = InventoryReader::new(&path)
                        .read()
                        .context("failed to read items CSV")?;
                    trained
                        .annotate_table(&table)
                        .context("batch prediction failed")?
                }
                None => trained.annotate().context("batch prediction failed")?,
            };

            let writer = ResultWriter::new(&output.output_dir, name)?;
            let path = writer
                .write_predictions(&annotated)
                .context("failed to write predictions")?;

            let n_needs_restock = annotated
                .column(PREDICTED_STATUS_COLUMN)
                .map(|cells| {
                    cells
                        .filter(|c| *c == RestockStatus::NeedsRestock.as_str())
                        .count()
                })
                .unwrap_or(0);
            let output = ExportOutput {
                path,
                n_rows: annotated.n_rows(),
                n_needs_restock,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Tree { data, output } => {
            let name = OutputName::new(output.name)?;
            let session = train(&data, config, DEFAULT_ALERT_THRESHOLD)?;
            let view = active(&session)?
                .tree_view()
                .context("failed to build tree view")?;

            let writer = ResultWriter::new(&output.output_dir, name)?;
            let json = writer
                .write_tree_json(&view)
                .context("failed to write tree JSON")?;
            let dot = writer
                .write_tree_dot(&view)
                .context("failed to write tree diagram")?;

            let output = TreeOutput {
                json,
                dot,
                n_nodes: view.nodes.len(),
                depth: view.depth(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Evaluate {
            data,
            output_dir,
            name,
        } => {
            let session = train(&data, config, DEFAULT_ALERT_THRESHOLD)?;
            let trained = active(&session)?;
            let evaluation = trained.evaluate().context("evaluation failed")?;
            info!(
                accuracy = evaluation.accuracy,
                baseline = evaluation.majority_baseline,
                "training evaluation complete"
            );
            if !cli.quiet {
                eprint!("{}", evaluation.confusion);
            }

            let written = match output_dir {
                Some(dir) => {
                    let writer = ResultWriter::new(&dir, OutputName::new(name)?)?;
                    Some(
                        writer
                            .write_evaluation(&evaluation)
                            .context("failed to write evaluation")?,
                    )
                }
                None => None,
            };

            let output = EvaluateOutput::new(trained.table().n_rows(), &evaluation, written);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
