//! Result writer for annotated tables, tree views and reports.

use std::fs;
use std::path::{Path, PathBuf};

use restock_model::{DatasetSummary, RawTable, TrainingEvaluation, TreeView};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::OutputName;
use crate::dot::render_dot;
use crate::IoError;

/// Writes results under one output directory and base name.
///
/// Creates the output directory on construction if it does not exist.
/// Files are named `{name}_predictions.csv`, `{name}_tree.json`,
/// `{name}_tree.dot`, `{name}_summary.json` and `{name}_evaluate.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    name: OutputName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and base name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), name = %name))]
    pub fn new(output_dir: &Path, name: OutputName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            name,
        })
    }

    /// Write an annotated table to `{name}_predictions.csv`.
    ///
    /// Header and rows are written exactly as held by `table`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::CsvWrite`] if the file cannot be created or written.
    #[instrument(skip_all, fields(n_rows = table.n_rows()))]
    pub fn write_predictions(&self, table: &RawTable) -> Result<PathBuf, IoError> {
        let path = self.path_for("predictions.csv");
        let csv_err = |e: csv::Error| IoError::CsvWrite {
            path: path.clone(),
            source: e,
        };

        let mut wtr = csv::Writer::from_path(&path).map_err(csv_err)?;
        wtr.write_record(table.headers()).map_err(csv_err)?;
        for row in table.rows() {
            wtr.write_record(row).map_err(csv_err)?;
        }
        wtr.flush().map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "predictions written");
        Ok(path)
    }

    /// Write the tree view to `{name}_tree.json`.
    ///
    /// # Errors
    ///
    /// [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all)]
    pub fn write_tree_json(&self, view: &TreeView) -> Result<PathBuf, IoError> {
        self.write_json("tree.json", "tree view", view)
    }

    /// Write the tree view as Graphviz to `{name}_tree.dot`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_tree_dot(&self, view: &TreeView) -> Result<PathBuf, IoError> {
        let path = self.path_for("tree.dot");
        fs::write(&path, render_dot(view)).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), n_nodes = view.nodes.len(), "tree diagram written");
        Ok(path)
    }

    /// Write the dataset summary to `{name}_summary.json`.
    ///
    /// # Errors
    ///
    /// [`IoError::Serialize`] or [`IoError::WriteFile`].
    pub fn write_summary(&self, summary: &DatasetSummary) -> Result<PathBuf, IoError> {
        self.write_json("summary.json", "dataset summary", summary)
    }

    /// Write a training evaluation to `{name}_evaluate.json`.
    ///
    /// # Errors
    ///
    /// [`IoError::Serialize`] or [`IoError::WriteFile`].
    pub fn write_evaluation(&self, evaluation: &TrainingEvaluation) -> Result<PathBuf, IoError> {
        self.write_json("evaluate.json", "training evaluation", evaluation)
    }

    fn write_json<T: Serialize>(
        &self,
        suffix: &str,
        what: &'static str,
        value: &T,
    ) -> Result<PathBuf, IoError> {
        let path = self.path_for(suffix);
        let artifact = Artifact {
            name: self.name.as_str(),
            content: value,
        };
        let json = serde_json::to_string_pretty(&artifact)
            .map_err(|e| IoError::Serialize { what, source: e })?;
        fs::write(&path, json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), what, "result written");
        Ok(path)
    }

    fn path_for(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(self.name.file_name(suffix))
    }
}

/// Every JSON artifact carries the output name next to its content.
#[derive(Serialize)]
struct Artifact<'a, T: Serialize> {
    name: &'a str,
    #[serde(flatten)]
    content: &'a T,
}
