//! File I/O for the restock pipeline: CSV inventory input, annotated CSV
//! export, and JSON/Graphviz output of tree views and reports.

mod domain;
mod dot;
mod error;
mod reader;
mod writer;

pub use domain::OutputName;
pub use dot::render_dot;
pub use error::IoError;
pub use reader::{normalize_header, InventoryReader};
pub use writer::ResultWriter;
