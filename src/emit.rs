//! Plan emission (§4.3).
//!
//! Walks a [`LayoutPlan`] depth-first, pre-order, turning each split node
//! into the split steps that physically realize it and collecting terminals
//! in the order they should be populated. A single `focus` step closes out
//! the emission. Every split step's `target_pane_id` is either `"root"` or
//! an earlier step's `created_pane_id`, so a backend can replay the list
//! strictly in order against a pane-id registry seeded only with the
//! initial real pane.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::plan::{LayoutPlan, PlanNode};
use crate::preset::Orientation;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum Sizing {
    Percent { percentage: u8 },
    DynamicCells { requested_ratio: f64 },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StepKind {
    Split {
        target_pane_id: String,
        created_pane_id: String,
        orientation: Orientation,
        sizing: Sizing,
    },
    Focus {
        target_pane_id: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandStep {
    pub id: String,
    pub summary: String,
    /// Generic, backend-agnostic illustration of the step; backends build
    /// their own argv independently.
    pub command: Vec<String>,
    #[serde(flatten)]
    pub kind: StepKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmittedTerminal {
    pub pane_id: String,
    pub name: String,
    pub command: Option<String>,
    pub cwd: Option<String>,
    pub env: Vec<(String, String)>,
    pub focus: bool,
    pub title: Option<String>,
    pub ephemeral: bool,
    pub close_on_error: bool,
    /// Negative delays are clamped to zero (§3).
    pub delay_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmissionSummary {
    pub steps_count: usize,
    pub focus_pane_id: String,
    pub initial_pane_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanEmission {
    pub steps: Vec<CommandStep>,
    pub terminals: Vec<EmittedTerminal>,
    pub summary: EmissionSummary,
    pub hash: String,
}

struct Emitter {
    steps: Vec<CommandStep>,
    terminals: Vec<EmittedTerminal>,
    next_step: usize,
}

impl Emitter {
    fn next_id(&mut self) -> String {
        let id = format!("step{}", self.next_step);
        self.next_step += 1;
        id
    }

    fn walk(&mut self, node: &PlanNode) {
        match node {
            PlanNode::Terminal(t) => {
                self.terminals.push(EmittedTerminal {
                    pane_id: t.id.clone(),
                    name: t.name.clone(),
                    command: t.command.clone(),
                    cwd: t.cwd.clone(),
                    env: t.env.clone(),
                    focus: t.focus,
                    title: t.title.clone(),
                    ephemeral: t.ephemeral,
                    close_on_error: t.close_on_error,
                    delay_ms: t.delay_ms.max(0),
                });
            }
            PlanNode::Split(s) => {
                let mut target = s.id.clone();
                let mut remaining_share: f64 = 1.0;
                for (k, child) in s.children.iter().enumerate().skip(1) {
                    let created = child.id().to_string();
                    // `target` currently represents the undivided remainder
                    // covering children k-1..n-1 (share = remaining_share).
                    // This step carves off child k-1 (the left part, now
                    // finalized) and the new pane inherits whatever's left.
                    let finalized_share = s.ratio[k - 1];
                    let requested_ratio = (remaining_share - finalized_share) / remaining_share;
                    let sizing = resolve_sizing(requested_ratio);
                    let id = self.next_id();
                    self.steps.push(CommandStep {
                        summary: format!("split {target}"),
                        command: vec![
                            "split".to_string(),
                            target.clone(),
                            orientation_str(s.orientation).to_string(),
                            sizing_repr(&sizing),
                        ],
                        id,
                        kind: StepKind::Split {
                            target_pane_id: target.clone(),
                            created_pane_id: created.clone(),
                            orientation: s.orientation,
                            sizing,
                        },
                    });
                    remaining_share -= finalized_share;
                    target = created;
                }
                for child in &s.children {
                    self.walk(child);
                }
            }
        }
    }
}

fn orientation_str(o: Orientation) -> &'static str {
    match o {
        Orientation::Horizontal => "horizontal",
        Orientation::Vertical => "vertical",
    }
}

fn sizing_repr(sizing: &Sizing) -> String {
    match sizing {
        Sizing::Percent { percentage } => format!("{percentage}%"),
        Sizing::DynamicCells { requested_ratio } => format!("ratio={requested_ratio:.4}"),
    }
}

/// Percent mode when the requested share rounds cleanly to an integer
/// percentage in `1..=99`; dynamic-cells otherwise (resolved at apply time
/// against the real pane's current dimensions).
fn resolve_sizing(requested_ratio: f64) -> Sizing {
    let pct = (requested_ratio * 100.0).round();
    if (pct / 100.0 - requested_ratio).abs() < 1e-6 && (1.0..=99.0).contains(&pct) {
        Sizing::Percent {
            percentage: pct as u8,
        }
    } else {
        Sizing::DynamicCells { requested_ratio }
    }
}

/// Emit the ordered command steps and terminal list for a compiled plan.
pub fn emit(plan: &LayoutPlan) -> PlanEmission {
    let mut emitter = Emitter {
        steps: Vec::new(),
        terminals: Vec::new(),
        next_step: 0,
    };
    emitter.walk(&plan.root);

    let focus_id = emitter.next_id();
    emitter.steps.push(CommandStep {
        summary: format!("select pane {}", plan.focus_pane_id),
        command: vec!["focus".to_string(), plan.focus_pane_id.clone()],
        id: focus_id,
        kind: StepKind::Focus {
            target_pane_id: plan.focus_pane_id.clone(),
        },
    });

    let summary = EmissionSummary {
        steps_count: emitter.steps.len(),
        focus_pane_id: plan.focus_pane_id.clone(),
        initial_pane_id: "root".to_string(),
    };

    let hash = plan_hash(&emitter.steps, &emitter.terminals, &summary);

    PlanEmission {
        steps: emitter.steps,
        terminals: emitter.terminals,
        summary,
        hash,
    }
}

fn plan_hash(steps: &[CommandStep], terminals: &[EmittedTerminal], summary: &EmissionSummary) -> String {
    #[derive(Serialize)]
    struct Canonical<'a> {
        steps: &'a [CommandStep],
        terminals: &'a [EmittedTerminal],
        summary: &'a EmissionSummary,
    }
    let bytes = serde_json::to_vec(&Canonical {
        steps,
        terminals,
        summary,
    })
    .expect("emission types are always serializable");
    let digest = Sha256::digest(&bytes);
    hex::encode(digest)
}
