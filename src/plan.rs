//! Plan construction (§4.2).
//!
//! Assigns every node a stable virtual pane id via pre-order traversal and
//! records the id of the unique focused leaf. Pure and total once a preset
//! has compiled.

use crate::preset::Orientation;
use crate::preset::compiler::{CompiledNode, CompiledPreset};

#[derive(Debug, Clone)]
pub struct PlanTerminal {
    pub id: String,
    pub name: String,
    pub command: Option<String>,
    pub cwd: Option<String>,
    pub env: Vec<(String, String)>,
    pub focus: bool,
    pub title: Option<String>,
    pub ephemeral: bool,
    pub close_on_error: bool,
    pub delay_ms: i64,
}

#[derive(Debug, Clone)]
pub struct PlanSplit {
    pub id: String,
    pub orientation: Orientation,
    pub ratio: Vec<f64>,
    pub children: Vec<PlanNode>,
}

#[derive(Debug, Clone)]
pub enum PlanNode {
    Terminal(PlanTerminal),
    Split(PlanSplit),
}

impl PlanNode {
    pub fn id(&self) -> &str {
        match self {
            PlanNode::Terminal(t) => &t.id,
            PlanNode::Split(s) => &s.id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutPlan {
    pub root: PlanNode,
    pub focus_pane_id: String,
}

/// Assign stable ids: root is `"root"`; a split's k-th child is `<parent>.<k>`.
pub fn plan(compiled: &CompiledPreset) -> LayoutPlan {
    let mut focus_pane_id = None;
    let root = assign_ids(&compiled.layout, "root", &mut focus_pane_id);
    LayoutPlan {
        root,
        focus_pane_id: focus_pane_id
            .expect("compile() guarantees exactly one focused leaf in the tree"),
    }
}

fn assign_ids(node: &CompiledNode, id: &str, focus_pane_id: &mut Option<String>) -> PlanNode {
    match node {
        CompiledNode::Terminal(t) => {
            if t.focus {
                *focus_pane_id = Some(id.to_string());
            }
            PlanNode::Terminal(PlanTerminal {
                id: id.to_string(),
                name: t.name.clone(),
                command: t.command.clone(),
                cwd: t.cwd.clone(),
                env: t.env.clone(),
                focus: t.focus,
                title: t.title.clone(),
                ephemeral: t.ephemeral,
                close_on_error: t.close_on_error,
                delay_ms: t.delay_ms,
            })
        }
        CompiledNode::Split(s) => {
            let children = s
                .children
                .iter()
                .enumerate()
                .map(|(k, child)| assign_ids(child, &format!("{id}.{k}"), focus_pane_id))
                .collect();
            PlanNode::Split(PlanSplit {
                id: id.to_string(),
                orientation: s.orientation,
                ratio: s.ratio.clone(),
                children,
            })
        }
    }
}
