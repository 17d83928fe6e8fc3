//! Read-only, renderer-friendly projection of a fitted tree.

use restock_tree::Node;

use crate::classifier::TrainedModel;
use crate::encoder::EncoderRegistry;
use crate::schema::{ColumnKind, FeatureSchema};
use crate::status::RestockStatus;
use crate::ModelError;

/// The decision rule of an interior node.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SplitView {
    /// Feature name.
    pub feature: String,
    /// Samples with `feature <= threshold` go left.
    pub threshold: f64,
    /// For categorical features, the categories routed left.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_categories: Option<Vec<String>>,
    /// Id of the left child.
    pub left: usize,
    /// Id of the right child.
    pub right: usize,
}

/// One node, split or leaf.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NodeView {
    /// Pre-order id; the root is 0.
    pub id: usize,
    /// Distance from the root.
    pub depth: usize,
    /// `None` for leaves.
    pub split: Option<SplitView>,
    /// Impurity at this node, in the tree's criterion.
    pub impurity: f64,
    /// Training samples reaching this node.
    pub n_samples: usize,
    /// Training samples per status, in class-index order.
    pub class_counts: Vec<usize>,
    /// Majority status at this node.
    pub majority: RestockStatus,
}

impl NodeView {
    /// Return `true` for leaves.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.split.is_none()
    }
}

/// The whole tree, ready for a renderer.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TreeView {
    /// Split criterion name.
    pub criterion: &'static str,
    /// Feature names in encoding order.
    pub feature_names: Vec<String>,
    /// Status labels in class-index order.
    pub class_names: Vec<&'static str>,
    /// Nodes in pre-order.
    pub nodes: Vec<NodeView>,
}

impl TreeView {
    /// Project `model` into a view, naming features from `schema` and
    /// categorical thresholds from `registry`.
    ///
    /// # Errors
    ///
    /// [`ModelError::FatalUsage`] if `schema` and `model` disagree on the
    /// feature count or a categorical column has no encoder.
    pub fn build(
        model: &TrainedModel,
        schema: &FeatureSchema,
        registry: &EncoderRegistry,
    ) -> Result<Self, ModelError> {
        let tree = model.tree();
        if tree.n_features() != schema.n_features() {
            return Err(ModelError::FatalUsage {
                operation: "tree_view",
                reason: "schema does not match the fitted tree",
            });
        }

        let mut depths = vec![0usize; tree.n_nodes()];
        let mut nodes = Vec::with_capacity(tree.n_nodes());
        for (id, node) in tree.nodes().iter().enumerate() {
            let split = match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    depths[left.index()] = depths[id] + 1;
                    depths[right.index()] = depths[id] + 1;
                    let column = &schema.features()[feature.index()];
                    let left_categories = match column.kind() {
                        ColumnKind::Categorical => Some(
                            registry
                                .get(column.name())?
                                .categories()
                                .iter()
                                .enumerate()
                                .filter(|&(code, _)| code as f64 <= *threshold)
                                .map(|(_, c)| c.clone())
                                .collect(),
                        ),
                        ColumnKind::Amount | ColumnKind::Count => None,
                    };
                    Some(SplitView {
                        feature: column.name().to_string(),
                        threshold: *threshold,
                        left_categories,
                        left: left.index(),
                        right: right.index(),
                    })
                }
                Node::Leaf { .. } => None,
            };
            nodes.push(NodeView {
                id,
                depth: depths[id],
                split,
                impurity: node.impurity().value(),
                n_samples: node.n_samples(),
                class_counts: node.class_counts().to_vec(),
                majority: RestockStatus::from_class_index(node.majority_class())?,
            });
        }

        Ok(Self {
            criterion: tree.criterion().name(),
            feature_names: schema.feature_names(),
            class_names: RestockStatus::ALL.iter().map(|s| s.as_str()).collect(),
            nodes,
        })
    }

    /// Return the root node.
    #[must_use]
    pub fn root(&self) -> Option<&NodeView> {
        self.nodes.first()
    }

    /// Return the maximum node depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ClassifierConfig, RestockClassifier};
    use crate::preprocess::{build_feature_matrix, extract_labels};
    use crate::table::{RawRecord, RawTable};

    fn record(category: &str, remaining: u64, status: RestockStatus) -> RawRecord {
        RawRecord {
            item_name: format!("{category}-{remaining}"),
            category: category.into(),
            unit: "Box".into(),
            price: 5000.0,
            opening_stock: 100,
            units_sold: 100 - remaining,
            remaining_stock: remaining,
            status: Some(status),
        }
    }

    fn view_for(records: &[RawRecord]) -> TreeView {
        let table = RawTable::from_records(records);
        let schema = FeatureSchema::pharmacy();
        let registry = EncoderRegistry::fit(&table, &schema).unwrap();
        let matrix = build_feature_matrix(&table, &schema, &registry).unwrap();
        let labels = extract_labels(&table, &schema).unwrap();
        let mut clf = RestockClassifier::new(ClassifierConfig::new());
        let model = clf.fit(&matrix, &labels, &schema.feature_names()).unwrap();
        TreeView::build(model, &schema, &registry).unwrap()
    }

    #[test]
    fn categorical_split_lists_left_categories() {
        // Category alone separates the classes; it is scanned first.
        let view = view_for(&[
            record("Tablet", 10, RestockStatus::NeedsRestock),
            record("Syrup", 90, RestockStatus::NoRestockNeeded),
        ]);
        assert_eq!(view.nodes.len(), 3);
        let root = view.root().unwrap();
        let split = root.split.as_ref().unwrap();
        assert_eq!(split.feature, "Category");
        assert!((split.threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(split.left_categories.as_deref(), Some(&["Syrup".to_string()][..]));
        assert_eq!(root.class_counts, vec![1, 1]);
        assert!((root.impurity - 1.0).abs() < 1e-12);
        assert_eq!(view.nodes[split.left].majority, RestockStatus::NoRestockNeeded);
        assert_eq!(view.nodes[split.right].majority, RestockStatus::NeedsRestock);
        assert_eq!(view.depth(), 1);
        assert_eq!(view.criterion, "entropy");
    }

    #[test]
    fn single_class_is_one_leaf() {
        let view = view_for(&[
            record("Tablet", 10, RestockStatus::NeedsRestock),
            record("Syrup", 20, RestockStatus::NeedsRestock),
        ]);
        assert_eq!(view.nodes.len(), 1);
        let root = view.root().unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.majority, RestockStatus::NeedsRestock);
        assert_eq!(root.impurity, 0.0);
    }
}
