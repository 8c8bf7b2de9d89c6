//! Preset compilation (§4.1).
//!
//! `compile` validates structural shape, ratios, env keys and name
//! uniqueness, normalizes every split's ratio to sum to 1.0, and resolves
//! the tree to carry exactly one focused leaf.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{AppError, ErrorCode, Result};

use super::{LayoutNode, Orientation, Preset};

#[derive(Debug, Clone)]
pub struct CompiledTerminal {
    pub name: String,
    pub command: Option<String>,
    pub cwd: Option<String>,
    /// Insertion order preserved (§3).
    pub env: Vec<(String, String)>,
    pub focus: bool,
    pub title: Option<String>,
    pub ephemeral: bool,
    pub close_on_error: bool,
    pub delay_ms: i64,
}

#[derive(Debug, Clone)]
pub struct CompiledSplit {
    pub orientation: Orientation,
    /// Normalized so elements sum to 1.0 (±ε).
    pub ratio: Vec<f64>,
    pub children: Vec<CompiledNode>,
}

#[derive(Debug, Clone)]
pub enum CompiledNode {
    Terminal(CompiledTerminal),
    Split(CompiledSplit),
}

#[derive(Debug, Clone)]
pub struct CompiledPreset {
    pub name: String,
    pub layout: CompiledNode,
}

fn env_key_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"))
}

struct Ctx {
    names: HashSet<String>,
    auto_focus: bool,
    auto_focus_assigned: bool,
}

/// Validate and canonicalize a user-authored preset.
pub fn compile(preset: &Preset) -> Result<CompiledPreset> {
    tracing::debug!(
        name = %preset.name,
        version = %preset.version,
        metadata = ?preset.metadata,
        "compiling preset"
    );
    let focus_count = count_focus(&preset.layout);
    if focus_count > 1 {
        return Err(AppError::validation(
            ErrorCode::MultipleFocus,
            format!("expected exactly one focused leaf, found {focus_count}"),
        ));
    }

    let mut ctx = Ctx {
        names: HashSet::new(),
        auto_focus: focus_count == 0,
        auto_focus_assigned: false,
    };
    let layout = compile_node(&preset.layout, "root", &mut ctx)?;

    Ok(CompiledPreset {
        name: preset.name.clone(),
        layout,
    })
}

fn count_focus(node: &LayoutNode) -> usize {
    match node {
        LayoutNode::Terminal(t) => usize::from(t.focus),
        LayoutNode::Split(s) => s.children.iter().map(count_focus).sum(),
    }
}

fn compile_node(node: &LayoutNode, path: &str, ctx: &mut Ctx) -> Result<CompiledNode> {
    match node {
        LayoutNode::Terminal(t) => {
            if !ctx.names.insert(t.name.clone()) {
                return Err(AppError::validation(
                    ErrorCode::DuplicateName,
                    format!("duplicate leaf name: {}", t.name),
                )
                .with_path(path));
            }

            for key in t.env.keys() {
                if !env_key_pattern().is_match(key) {
                    return Err(AppError::validation(
                        ErrorCode::InvalidEnvKey,
                        format!("invalid environment variable key: {key}"),
                    )
                    .with_path(path));
                }
            }

            let focus = if ctx.auto_focus && !ctx.auto_focus_assigned {
                ctx.auto_focus_assigned = true;
                true
            } else {
                t.focus
            };

            Ok(CompiledNode::Terminal(CompiledTerminal {
                name: t.name.clone(),
                command: t.command.clone(),
                cwd: t.cwd.clone(),
                env: t.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                focus,
                title: t.title.clone(),
                ephemeral: t.ephemeral,
                close_on_error: t.close_on_error,
                delay_ms: t.delay_ms,
            }))
        }
        LayoutNode::Split(s) => {
            if s.children.len() < 2 {
                return Err(AppError::validation(
                    ErrorCode::InvalidLayout,
                    "split node requires at least 2 children",
                )
                .with_path(path));
            }
            if s.ratio.len() != s.children.len() {
                return Err(AppError::validation(
                    ErrorCode::InvalidLayout,
                    format!(
                        "ratio has {} entries but split has {} children",
                        s.ratio.len(),
                        s.children.len()
                    ),
                )
                .with_path(path));
            }
            if let Some(bad) = s.ratio.iter().find(|r| !r.is_finite() || **r <= 0.0) {
                return Err(AppError::validation(
                    ErrorCode::InvalidRatio,
                    format!("ratio elements must be positive, found {bad}"),
                )
                .with_path(path));
            }
            let sum: f64 = s.ratio.iter().sum();
            if sum <= 0.0 {
                return Err(
                    AppError::validation(ErrorCode::InvalidRatio, "ratio sum must be positive")
                        .with_path(path),
                );
            }
            let ratio: Vec<f64> = s.ratio.iter().map(|r| r / sum).collect();

            let children = s
                .children
                .iter()
                .enumerate()
                .map(|(k, child)| compile_node(child, &format!("{path}.{k}"), ctx))
                .collect::<Result<Vec<_>>>()?;

            Ok(CompiledNode::Split(CompiledSplit {
                orientation: s.orientation,
                ratio,
                children,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::{SplitNode, TerminalNode};
    use indexmap::IndexMap;

    fn terminal(name: &str, focus: bool) -> LayoutNode {
        LayoutNode::Terminal(TerminalNode {
            name: name.to_string(),
            command: None,
            cwd: None,
            env: IndexMap::new(),
            focus,
            title: None,
            ephemeral: false,
            close_on_error: false,
            delay_ms: 0,
        })
    }

    fn split(ratio: Vec<f64>, children: Vec<LayoutNode>) -> LayoutNode {
        LayoutNode::Split(SplitNode {
            orientation: Orientation::Horizontal,
            ratio,
            children,
        })
    }

    fn preset(layout: LayoutNode) -> Preset {
        Preset {
            name: "test".to_string(),
            version: "1".to_string(),
            metadata: Default::default(),
            backend: None,
            layout,
        }
    }

    #[test]
    fn normalizes_ratio_to_sum_one() {
        let p = preset(split(
            vec![1.0, 1.0, 2.0],
            vec![terminal("a", true), terminal("b", false), terminal("c", false)],
        ));
        let compiled = compile(&p).unwrap();
        let CompiledNode::Split(s) = compiled.layout else {
            panic!("expected split")
        };
        let sum: f64 = s.ratio.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!((s.ratio[2] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn missing_focus_auto_assigns_first_leaf_preorder() {
        let p = preset(split(
            vec![0.5, 0.5],
            vec![terminal("a", false), terminal("b", false)],
        ));
        let compiled = compile(&p).unwrap();
        let CompiledNode::Split(s) = compiled.layout else {
            panic!("expected split")
        };
        let CompiledNode::Terminal(a) = &s.children[0] else {
            panic!()
        };
        let CompiledNode::Terminal(b) = &s.children[1] else {
            panic!()
        };
        assert!(a.focus);
        assert!(!b.focus);
    }

    #[test]
    fn multiple_focus_fails() {
        let p = preset(split(
            vec![0.5, 0.5],
            vec![terminal("a", true), terminal("b", true)],
        ));
        let err = compile(&p).unwrap_err();
        assert_eq!(err.code, ErrorCode::MultipleFocus);
    }

    #[test]
    fn duplicate_name_fails() {
        let p = preset(split(
            vec![0.5, 0.5],
            vec![terminal("a", true), terminal("a", false)],
        ));
        let err = compile(&p).unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateName);
    }

    #[test]
    fn zero_ratio_fails() {
        let p = preset(split(
            vec![0.0, 1.0],
            vec![terminal("a", true), terminal("b", false)],
        ));
        let err = compile(&p).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRatio);
    }

    #[test]
    fn invalid_env_key_fails() {
        let mut env = IndexMap::new();
        env.insert("1BAD".to_string(), "x".to_string());
        let node = LayoutNode::Terminal(TerminalNode {
            name: "a".to_string(),
            command: None,
            cwd: None,
            env,
            focus: true,
            title: None,
            ephemeral: false,
            close_on_error: false,
            delay_ms: 0,
        });
        let p = preset(split(vec![0.5, 0.5], vec![node, terminal("b", false)]));
        let err = compile(&p).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidEnvKey);
    }

    #[test]
    fn single_child_split_is_invalid_layout() {
        let p = preset(split(vec![1.0], vec![terminal("a", true)]));
        let err = compile(&p).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidLayout);
    }
}
