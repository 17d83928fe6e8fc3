//! Deterministic CART decision tree classification: fit, predict, inspect.
//!
//! Provides a hand-rolled single-tree classifier with Entropy/Gini split
//! criteria, a fixed class space supplied by the caller, optional seeded
//! feature subsampling, and an arena node layout that callers can walk
//! read-only for rendering.

mod error;
mod node;
mod split;
mod tree;

pub use error::TreeError;
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
