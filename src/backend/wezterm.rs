//! Wezterm-class backend (§4.7).
//!
//! Drives `wezterm cli` as a subprocess, using its JSON pane listing to
//! discover real pane ids by diffing snapshots before/after a mutation
//! (there is no direct "print the new id" flag as tmux has).

use serde::Deserialize;

use crate::cmd::Cmd;
use crate::emit::{PlanEmission, Sizing, StepKind};
use crate::error::{AppError, ErrorCode, Result};
use crate::preset::Orientation;
use crate::runner::{self, PaneOps};

use super::{ApplyOutcome, Backend, BackendKind, Context, DryRunLine, WindowMode};

#[derive(Debug, Deserialize)]
struct PaneEntry {
    window_id: u64,
    workspace: String,
    pane_id: u64,
    is_active: bool,
}

pub struct WeztermBackend {
    dry_run: bool,
    cwd: std::path::PathBuf,
    /// Pane the process is itself running in, if known. Used to scope
    /// operations to one workspace when several are open (§4.7).
    pane_id: Option<String>,
}

impl WeztermBackend {
    pub fn new(ctx: Context) -> Self {
        Self {
            dry_run: ctx.dry_run,
            cwd: ctx.cwd,
            pane_id: ctx.pane_id,
        }
    }

    fn cli(&self, args: &[&str]) -> Result<String> {
        let mut full = vec!["cli"];
        full.extend_from_slice(args);
        Cmd::new("wezterm")
            .workdir(&self.cwd)
            .args(&full)
            .run_and_capture_stdout()
            .map_err(AppError::from)
    }

    fn snapshot(&self) -> Result<Vec<PaneEntry>> {
        let raw = self.cli(&["list", "--format", "json"])?;
        serde_json::from_str(&raw).map_err(|e| {
            AppError::execution(
                ErrorCode::TerminalCommandFailed,
                format!("failed to parse wezterm pane listing: {e}"),
            )
        })
    }

    fn orientation_flags(orientation: Orientation) -> &'static str {
        match orientation {
            Orientation::Horizontal => "--right",
            Orientation::Vertical => "--bottom",
        }
    }

    /// If several workspaces are present, narrow `entries` down to the one
    /// containing our own context pane (or the active pane as a fallback) so
    /// a mutation never touches an unrelated workspace's windows.
    fn scope_to_workspace<'a>(&self, entries: &'a [PaneEntry]) -> Vec<&'a PaneEntry> {
        let workspaces: std::collections::HashSet<&str> =
            entries.iter().map(|p| p.workspace.as_str()).collect();
        if workspaces.len() <= 1 {
            return entries.iter().collect();
        }
        let resolved = self
            .pane_id
            .as_ref()
            .and_then(|id| entries.iter().find(|p| p.pane_id.to_string() == *id))
            .or_else(|| entries.iter().find(|p| p.is_active))
            .map(|p| p.workspace.as_str());
        match resolved {
            Some(workspace) => entries.iter().filter(|p| p.workspace == workspace).collect(),
            None => entries.iter().collect(),
        }
    }
}

impl PaneOps for WeztermBackend {
    fn setup_window(
        &mut self,
        window_mode: WindowMode,
        _window_name: Option<&str>,
        confirm_kill: &mut dyn FnMut(&[String]) -> bool,
    ) -> Result<String> {
        let before = self.snapshot()?;
        let scoped = self.scope_to_workspace(&before);

        match window_mode {
            WindowMode::CurrentWindow => {
                let active = scoped
                    .iter()
                    .find(|p| p.is_active)
                    .ok_or_else(|| AppError::environment(ErrorCode::MissingTarget, "no active wezterm pane found"))?;
                let siblings: Vec<String> = scoped
                    .iter()
                    .filter(|p| p.window_id == active.window_id && p.pane_id != active.pane_id)
                    .map(|p| p.pane_id.to_string())
                    .collect();
                if !siblings.is_empty() {
                    if !confirm_kill(&siblings) {
                        return Err(AppError::user(
                            ErrorCode::UserCancelled,
                            "user declined to close existing panes in current window",
                        ));
                    }
                    for pane in &siblings {
                        self.cli(&["kill-pane", "--pane-id", pane])?;
                    }
                }
                Ok(active.pane_id.to_string())
            }
            WindowMode::NewWindow => {
                let cwd = self.cwd.display().to_string();
                let existing_window = scoped.first().map(|p| p.window_id);
                let stdout = if let Some(window_id) = existing_window {
                    let window_id_str = window_id.to_string();
                    self.cli(&["spawn", "--window-id", &window_id_str, "--cwd", &cwd])?
                } else {
                    self.cli(&["spawn", "--new-window", "--cwd", &cwd])?
                };
                let id = stdout
                    .split_whitespace()
                    .next()
                    .ok_or_else(|| AppError::execution(ErrorCode::TerminalCommandFailed, "wezterm spawn returned no pane id"))?;
                Ok(id.to_string())
            }
        }
    }

    fn split(&mut self, target_real: &str, orientation: Orientation, sizing: &Sizing) -> Result<String> {
        let before = self.snapshot()?;
        let percentage = match sizing {
            Sizing::Percent { percentage } => *percentage,
            // Wezterm-class always uses percent (§9): auto-downgrade cell requests.
            Sizing::DynamicCells { requested_ratio } => {
                ((requested_ratio * 100.0).round() as i64).clamp(1, 99) as u8
            }
        };
        let percentage_str = percentage.to_string();
        self.cli(&[
            "split-pane",
            Self::orientation_flags(orientation),
            "--percent",
            &percentage_str,
            "--pane-id",
            target_real,
        ])?;

        let after = self.snapshot()?;
        let scoped_before = self.scope_to_workspace(&before);
        let scoped_after = self.scope_to_workspace(&after);
        let before_ids: std::collections::HashSet<u64> = scoped_before.iter().map(|p| p.pane_id).collect();
        scoped_after
            .iter()
            .find(|p| !before_ids.contains(&p.pane_id))
            .map(|p| p.pane_id.to_string())
            .ok_or_else(|| AppError::execution(ErrorCode::TerminalCommandFailed, "could not find newly split wezterm pane"))
    }

    fn focus(&mut self, target_real: &str) -> Result<()> {
        self.cli(&["activate-pane", "--pane-id", target_real]).map(|_| ())
    }

    fn set_title(&mut self, pane_real: &str, title: &str) -> Result<()> {
        self.cli(&["set-tab-title", "--pane-id", pane_real, title]).map(|_| ())
    }

    fn send_line(&mut self, pane_real: &str, text: &str) -> Result<()> {
        let payload = format!("{text}\r");
        self.cli(&["send-text", "--pane-id", pane_real, "--no-paste", "--", &payload]).map(|_| ())
    }
}

impl Backend for WeztermBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Wezterm
    }

    fn verify_environment(&self) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        if !Cmd::new("wezterm").workdir(&self.cwd).arg("--version").run_as_check() {
            return Err(AppError::environment(
                ErrorCode::WeztermNotFound,
                "wezterm binary not found on PATH or did not respond to a version query",
            ));
        }
        Ok(())
    }

    fn dry_run_steps(&self, emission: &PlanEmission) -> Result<Vec<DryRunLine>> {
        let mut lines: Vec<DryRunLine> = emission
            .steps
            .iter()
            .map(|step| match &step.kind {
                StepKind::Split {
                    target_pane_id,
                    orientation,
                    sizing,
                    ..
                } => {
                    let percentage = match sizing {
                        Sizing::Percent { percentage } => *percentage,
                        Sizing::DynamicCells { requested_ratio } => {
                            ((requested_ratio * 100.0).round() as i64).clamp(1, 99) as u8
                        }
                    };
                    DryRunLine {
                        summary: step.summary.clone(),
                        command: format!(
                            "wezterm cli split-pane {} --percent {percentage} --pane-id {target_pane_id}",
                            Self::orientation_flags(*orientation)
                        ),
                    }
                }
                StepKind::Focus { target_pane_id } => DryRunLine {
                    summary: step.summary.clone(),
                    command: format!("wezterm cli activate-pane --pane-id {target_pane_id}"),
                },
            })
            .collect();

        for terminal in super::prepare_dry_run_terminals(emission)? {
            let pane = &terminal.virtual_pane_id;
            if let Some(cwd_command) = &terminal.cwd_command {
                lines.push(DryRunLine {
                    summary: format!("send to {pane}"),
                    command: format!("wezterm cli send-text --pane-id {pane} --no-paste -- {cwd_command}"),
                });
            }
            for env_command in &terminal.env_commands {
                lines.push(DryRunLine {
                    summary: format!("send to {pane}"),
                    command: format!("wezterm cli send-text --pane-id {pane} --no-paste -- {env_command}"),
                });
            }
            if let Some(title) = &terminal.title {
                lines.push(DryRunLine {
                    summary: format!("title {pane}"),
                    command: format!("wezterm cli set-tab-title --pane-id {pane} {title}"),
                });
            }
            if let Some(command_text) = &terminal.command_text {
                lines.push(DryRunLine {
                    summary: format!("send to {pane}"),
                    command: format!("wezterm cli send-text --pane-id {pane} --no-paste -- {command_text}"),
                });
            }
        }

        Ok(lines)
    }

    fn apply_plan(
        &mut self,
        emission: &PlanEmission,
        window_mode: WindowMode,
        window_name: Option<&str>,
        confirm_kill: &mut dyn FnMut(&[String]) -> bool,
    ) -> Result<ApplyOutcome> {
        runner::execute(self, emission, window_mode, window_name, confirm_kill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::emit;
    use crate::plan::plan;
    use crate::preset::compiler::compile;
    use crate::preset::{LayoutNode, Preset, SplitNode, TerminalNode};
    use indexmap::IndexMap;

    fn two_pane_preset() -> Preset {
        Preset {
            name: "t".to_string(),
            version: "1".to_string(),
            metadata: Default::default(),
            backend: None,
            layout: LayoutNode::Split(SplitNode {
                orientation: Orientation::Horizontal,
                ratio: vec![0.5, 0.5],
                children: vec![
                    LayoutNode::Terminal(TerminalNode {
                        name: "main".to_string(),
                        command: Some("nvim".to_string()),
                        cwd: None,
                        env: IndexMap::new(),
                        focus: true,
                        title: None,
                        ephemeral: false,
                        close_on_error: false,
                        delay_ms: 0,
                    }),
                    LayoutNode::Terminal(TerminalNode {
                        name: "aux".to_string(),
                        command: Some("npm run dev".to_string()),
                        cwd: None,
                        env: IndexMap::new(),
                        focus: false,
                        title: None,
                        ephemeral: false,
                        close_on_error: false,
                        delay_ms: 0,
                    }),
                ],
            }),
        }
    }

    fn backend() -> WeztermBackend {
        WeztermBackend {
            dry_run: true,
            cwd: std::env::temp_dir(),
            pane_id: None,
        }
    }

    #[test]
    fn dry_run_renders_split_then_activate() {
        let emission = emit(&plan(&compile(&two_pane_preset()).unwrap()));
        let lines = backend().dry_run_steps(&emission).unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0].command,
            "wezterm cli split-pane --right --percent 50 --pane-id root"
        );
        assert_eq!(lines[1].command, "wezterm cli activate-pane --pane-id root.0");
        assert_eq!(
            lines[2].command,
            "wezterm cli send-text --pane-id root.0 --no-paste -- nvim"
        );
        assert_eq!(
            lines[3].command,
            "wezterm cli send-text --pane-id root.1 --no-paste -- npm run dev"
        );
    }

    #[test]
    fn dry_run_includes_cwd_send_text_line() {
        let mut preset = two_pane_preset();
        if let LayoutNode::Split(s) = &mut preset.layout
            && let LayoutNode::Terminal(t) = &mut s.children[0]
        {
            t.cwd = Some("/repo".to_string());
        }
        let emission = emit(&plan(&compile(&preset).unwrap()));
        let lines = backend().dry_run_steps(&emission).unwrap();
        assert!(
            lines
                .iter()
                .any(|l| l.command.contains("send-text") && l.command.contains("cd") && l.command.contains("/repo")),
            "expected a send-text line with a cd /repo payload, got {lines:?}"
        );
    }

    fn entry(window_id: u64, workspace: &str, pane_id: u64, is_active: bool) -> PaneEntry {
        PaneEntry {
            window_id,
            workspace: workspace.to_string(),
            pane_id,
            is_active,
        }
    }

    #[test]
    fn scope_to_workspace_is_noop_with_a_single_workspace() {
        let b = backend();
        let entries = vec![entry(1, "default", 0, true), entry(1, "default", 1, false)];
        assert_eq!(b.scope_to_workspace(&entries).len(), 2);
    }

    #[test]
    fn scope_to_workspace_filters_by_context_pane_across_multiple_workspaces() {
        let mut b = backend();
        b.pane_id = Some("5".to_string());
        let entries = vec![
            entry(1, "work", 5, false),
            entry(1, "work", 6, true),
            entry(2, "scratch", 7, false),
        ];
        let scoped = b.scope_to_workspace(&entries);
        assert_eq!(scoped.len(), 2);
        assert!(scoped.iter().all(|p| p.workspace == "work"));
    }

    #[test]
    fn scope_to_workspace_falls_back_to_active_pane_without_context() {
        let b = backend();
        let entries = vec![entry(1, "work", 5, false), entry(2, "scratch", 7, true)];
        let scoped = b.scope_to_workspace(&entries);
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].workspace, "scratch");
    }
}
