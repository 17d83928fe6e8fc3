//! Graphviz rendering of a tree view.

use restock_model::{NodeView, RestockStatus, TreeView};

/// Fill colours per status, in class-index order.
const FILL: [&str; RestockStatus::N_CLASSES] = ["#f4b183", "#9dc3e6"];

/// Render `view` as a Graphviz `digraph`.
///
/// Each node shows its rule (splits only), impurity, sample count, class
/// counts and majority status. Left edges are the `true` branch.
#[must_use]
pub fn render_dot(view: &TreeView) -> String {
    let mut out = String::new();
    out.push_str("digraph Tree {\n");
    out.push_str("node [shape=box, style=\"filled, rounded\", fontname=\"helvetica\"];\n");
    out.push_str("edge [fontname=\"helvetica\"];\n");
    for node in &view.nodes {
        let fill = FILL[node.majority.class_index()];
        out.push_str(&format!(
            "{} [label=\"{}\", fillcolor=\"{fill}\"];\n",
            node.id,
            escape(&label(node, view.criterion))
        ));
        if let Some(split) = &node.split {
            out.push_str(&format!("{} -> {} [label=\"true\"];\n", node.id, split.left));
            out.push_str(&format!("{} -> {} [label=\"false\"];\n", node.id, split.right));
        }
    }
    out.push_str("}\n");
    out
}

fn label(node: &NodeView, criterion: &str) -> String {
    let mut lines = Vec::with_capacity(5);
    if let Some(split) = &node.split {
        lines.push(match &split.left_categories {
            Some(categories) => format!("{} in {{{}}}", split.feature, categories.join(", ")),
            None => format!("{} <= {}", split.feature, split.threshold),
        });
    }
    lines.push(format!("{criterion} = {:.3}", node.impurity));
    lines.push(format!("samples = {}", node.n_samples));
    let counts: Vec<String> = node.class_counts.iter().map(ToString::to_string).collect();
    lines.push(format!("value = [{}]", counts.join(", ")));
    lines.push(format!("class = {}", node.majority));
    lines.join("\n")
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
