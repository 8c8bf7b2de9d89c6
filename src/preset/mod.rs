//! User-authored layout presets (§3).
//!
//! A preset is a recursive tree of `split` nodes and `terminal` leaves. It is
//! parsed as-is from YAML; [`compiler`] enforces the invariants that turn it
//! into a [`CompiledPreset`](compiler::CompiledPreset).

pub mod compiler;
pub mod source;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Map as JsonMap;

/// Orientation of a split node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A single layout node: either a `terminal` leaf or a `split` with children.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayoutNode {
    Terminal(TerminalNode),
    Split(SplitNode),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerminalNode {
    pub name: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub env: IndexMap<String, String>,
    #[serde(default)]
    pub focus: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub ephemeral: bool,
    #[serde(default)]
    pub close_on_error: bool,
    #[serde(default)]
    pub delay_ms: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SplitNode {
    pub orientation: Orientation,
    pub ratio: Vec<f64>,
    pub children: Vec<LayoutNode>,
}

/// Top-level preset document.
#[derive(Debug, Clone, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub metadata: JsonMap<String, serde_json::Value>,
    /// Declared backend preference, if any (lowest precedence in §4.8's resolver).
    #[serde(default)]
    pub backend: Option<String>,
    pub layout: LayoutNode,
}

fn default_version() -> String {
    "1".to_string()
}
