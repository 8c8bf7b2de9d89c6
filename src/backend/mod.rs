//! Backend abstraction, factory and resolver (§4.6–§4.8).
//!
//! Both concrete backends implement the same capability trait; no common
//! base object is required. `tmux.rs` and `wezterm.rs` hold the per-backend
//! primitive translations; the shared apply algorithm lives in
//! [`crate::runner`].

pub mod tmux;
pub mod wezterm;

use std::collections::HashMap;

use crate::emit::PlanEmission;
use crate::error::{AppError, ErrorCode, Result};
use crate::terminal_prep::{self, PreparedTerminal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Tmux,
    Wezterm,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Tmux => "tmux",
            BackendKind::Wezterm => "wezterm",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "tmux" => Ok(BackendKind::Tmux),
            "wezterm" => Ok(BackendKind::Wezterm),
            other => Err(AppError::environment(
                ErrorCode::UnknownBackend,
                format!("unknown backend: {other}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    CurrentWindow,
    NewWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneDimensions {
    pub cols: u32,
    pub rows: u32,
}

/// One rendered line of a dry-run preview.
#[derive(Debug, Clone)]
pub struct DryRunLine {
    pub summary: String,
    pub command: String,
}

#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub executed_steps: usize,
    pub focus_pane_real_id: String,
}

/// Context a backend is constructed with (§4.8's factory contract).
pub struct Context {
    pub dry_run: bool,
    pub cwd: std::path::PathBuf,
    /// The pane the process is itself running in, if known (e.g. `WEZTERM_PANE`).
    /// Used to scope wezterm-class operations to one workspace among several.
    pub pane_id: Option<String>,
}

/// Capability trait shared by every backend (§9).
pub trait Backend {
    fn kind(&self) -> BackendKind;
    fn verify_environment(&self) -> Result<()>;
    fn dry_run_steps(&self, emission: &PlanEmission) -> Result<Vec<DryRunLine>>;
    fn apply_plan(
        &mut self,
        emission: &PlanEmission,
        window_mode: WindowMode,
        window_name: Option<&str>,
        confirm_kill: &mut dyn FnMut(&[String]) -> bool,
    ) -> Result<ApplyOutcome>;
}

/// Resolve each terminal's cd/export/command fragments for a dry-run
/// preview. There is no real pane registry yet, so virtual pane ids stand
/// in for their own resolution.
pub(crate) fn prepare_dry_run_terminals(emission: &PlanEmission) -> Result<Vec<PreparedTerminal>> {
    let prepared = terminal_prep::prepare(
        &emission.terminals,
        &emission.summary.focus_pane_id,
        &mut |id: &str| Some(id.to_string()),
    )?;
    Ok(prepared.terminals)
}

/// Construct a backend for `kind` given the apply/dry-run context.
pub fn create_backend(kind: BackendKind, ctx: Context) -> Box<dyn Backend> {
    match kind {
        BackendKind::Tmux => Box::new(tmux::TmuxBackend::new(ctx)),
        BackendKind::Wezterm => Box::new(wezterm::WeztermBackend::new(ctx)),
    }
}

/// Resolve the effective backend: CLI flag > preset hint > environment probe
/// (`TMUX` session marker) > default (tmux).
pub fn resolve_backend_kind(
    cli_flag: Option<BackendKind>,
    preset_backend: Option<&str>,
    env: &HashMap<String, String>,
) -> Result<BackendKind> {
    if let Some(kind) = cli_flag {
        return Ok(kind);
    }
    if let Some(name) = preset_backend {
        return BackendKind::parse(name);
    }
    if env.get("TMUX").is_some_and(|v| !v.is_empty()) {
        return Ok(BackendKind::Tmux);
    }
    Ok(BackendKind::Tmux)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_takes_precedence_over_everything() {
        let mut env = HashMap::new();
        env.insert("TMUX".to_string(), "".to_string());
        let kind =
            resolve_backend_kind(Some(BackendKind::Wezterm), Some("tmux"), &env).unwrap();
        assert_eq!(kind, BackendKind::Wezterm);
    }

    #[test]
    fn preset_hint_wins_over_env_probe() {
        let mut env = HashMap::new();
        env.insert("TMUX".to_string(), "/tmp/tmux-1000/default,123,0".to_string());
        let kind = resolve_backend_kind(None, Some("wezterm"), &env).unwrap();
        assert_eq!(kind, BackendKind::Wezterm);
    }

    #[test]
    fn env_probe_selects_tmux_when_session_active() {
        let mut env = HashMap::new();
        env.insert("TMUX".to_string(), "/tmp/tmux-1000/default,123,0".to_string());
        let kind = resolve_backend_kind(None, None, &env).unwrap();
        assert_eq!(kind, BackendKind::Tmux);
    }

    #[test]
    fn default_is_tmux() {
        let kind = resolve_backend_kind(None, None, &HashMap::new()).unwrap();
        assert_eq!(kind, BackendKind::Tmux);
    }

    #[test]
    fn unknown_preset_backend_name_fails() {
        let err = resolve_backend_kind(None, Some("iterm2"), &HashMap::new()).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownBackend);
    }
}
