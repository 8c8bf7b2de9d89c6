//! Tmux-class backend (§4.6).

use std::path::PathBuf;

use crate::cmd::Cmd;
use crate::emit::{PlanEmission, Sizing, StepKind};
use crate::error::{AppError, ErrorCode, Result};
use crate::preset::Orientation;
use crate::runner::{self, PaneOps};

use super::{ApplyOutcome, Backend, BackendKind, Context, DryRunLine, PaneDimensions, WindowMode};

pub struct TmuxBackend {
    dry_run: bool,
    cwd: PathBuf,
}

impl TmuxBackend {
    pub fn new(ctx: Context) -> Self {
        Self {
            dry_run: ctx.dry_run,
            cwd: ctx.cwd,
        }
    }

    fn tmux(&self, args: &[&str]) -> Result<String> {
        Cmd::new("tmux")
            .workdir(&self.cwd)
            .args(args)
            .run_and_capture_stdout()
            .map_err(AppError::from)
    }

    fn orientation_flag(orientation: Orientation) -> &'static str {
        match orientation {
            Orientation::Horizontal => "-h",
            Orientation::Vertical => "-v",
        }
    }

    /// Query the target pane's current width and height in one round trip.
    fn query_dimensions(&self, target_real: &str) -> Result<PaneDimensions> {
        let raw = self.tmux(&[
            "display-message",
            "-p",
            "-t",
            target_real,
            "#{pane_width}x#{pane_height}",
        ])?;
        let (cols, rows) = raw
            .trim()
            .split_once('x')
            .and_then(|(c, r)| Some((c.parse().ok()?, r.parse().ok()?)))
            .ok_or_else(|| {
                AppError::execution(
                    ErrorCode::SplitSizeResolutionFailed,
                    format!("could not parse pane dimensions {raw:?}"),
                )
            })?;
        Ok(PaneDimensions { cols, rows })
    }

    /// Resolve a `dynamic-cells` request against the target pane's current
    /// width (horizontal) or height (vertical).
    fn resolve_cells(&self, target_real: &str, orientation: Orientation, requested_ratio: f64) -> Result<u32> {
        let dims = self.query_dimensions(target_real)?;
        let dimension = match orientation {
            Orientation::Horizontal => dims.cols,
            Orientation::Vertical => dims.rows,
        };
        Ok((dimension as f64 * requested_ratio).round() as u32)
    }
}

impl PaneOps for TmuxBackend {
    fn setup_window(
        &mut self,
        window_mode: WindowMode,
        window_name: Option<&str>,
        confirm_kill: &mut dyn FnMut(&[String]) -> bool,
    ) -> Result<String> {
        match window_mode {
            WindowMode::NewWindow => {
                let mut args = vec!["new-window", "-P", "-F", "#{pane_id}"];
                if let Some(name) = window_name {
                    args.push("-n");
                    args.push(name);
                }
                self.tmux(&args).map(|s| s.trim().to_string())
            }
            WindowMode::CurrentWindow => {
                let current = std::env::var("TMUX_PANE").map_err(|_| {
                    AppError::environment(
                        ErrorCode::NotInTmux,
                        "TMUX_PANE is unset; not running inside a tmux session",
                    )
                })?;
                let listing = self.tmux(&["list-panes", "-F", "#{pane_id}"])?;
                let others: Vec<String> = listing
                    .lines()
                    .map(str::trim)
                    .filter(|id| !id.is_empty() && *id != current)
                    .map(str::to_string)
                    .collect();
                if !others.is_empty() {
                    if !confirm_kill(&others) {
                        return Err(AppError::user(
                            ErrorCode::UserCancelled,
                            "user declined to close existing panes in current window",
                        ));
                    }
                    for pane in &others {
                        self.tmux(&["kill-pane", "-t", pane])?;
                    }
                }
                Ok(current)
            }
        }
    }

    fn split(&mut self, target_real: &str, orientation: Orientation, sizing: &Sizing) -> Result<String> {
        let (size_flag, size_value) = match sizing {
            Sizing::Percent { percentage } => ("-p", percentage.to_string()),
            Sizing::DynamicCells { requested_ratio } => {
                let cells = self.resolve_cells(target_real, orientation, *requested_ratio)?;
                ("-l", cells.to_string())
            }
        };
        let args = [
            "split-window",
            Self::orientation_flag(orientation),
            "-t",
            target_real,
            size_flag,
            &size_value,
            "-P",
            "-F",
            "#{pane_id}",
        ];
        self.tmux(&args).map(|s| s.trim().to_string())
    }

    fn focus(&mut self, target_real: &str) -> Result<()> {
        self.tmux(&["select-pane", "-t", target_real]).map(|_| ())
    }

    fn set_title(&mut self, pane_real: &str, title: &str) -> Result<()> {
        self.tmux(&["select-pane", "-t", pane_real, "-T", title]).map(|_| ())
    }

    fn send_line(&mut self, pane_real: &str, text: &str) -> Result<()> {
        self.tmux(&["send-keys", "-t", pane_real, text, "Enter"]).map(|_| ())
    }
}

impl Backend for TmuxBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Tmux
    }

    fn verify_environment(&self) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        if std::env::var("TMUX").unwrap_or_default().is_empty() {
            return Err(AppError::environment(
                ErrorCode::NotInTmux,
                "not running inside a tmux session",
            ));
        }
        if !Cmd::new("tmux").workdir(&self.cwd).arg("-V").run_as_check() {
            return Err(AppError::environment(
                ErrorCode::TmuxNotFound,
                "tmux binary not found on PATH or did not respond to a version query",
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
                    let size_arg = match sizing {
                        Sizing::Percent { percentage } => format!("-p {percentage}"),
                        Sizing::DynamicCells { .. } => "-l <dynamic>".to_string(),
                    };
                    DryRunLine {
                        summary: step.summary.clone(),
                        command: format!(
                            "tmux split-window {} -t {target_pane_id} {size_arg}",
                            Self::orientation_flag(*orientation)
                        ),
                    }
                }
                StepKind::Focus { target_pane_id } => DryRunLine {
                    summary: step.summary.clone(),
                    command: format!("tmux select-pane -t {target_pane_id}"),
                },
            })
            .collect();

        for terminal in super::prepare_dry_run_terminals(emission)? {
            let pane = &terminal.virtual_pane_id;
            if let Some(cwd_command) = &terminal.cwd_command {
                lines.push(DryRunLine {
                    summary: format!("send to {pane}"),
                    command: format!("tmux send-keys -t {pane} {cwd_command} Enter"),
                });
            }
            for env_command in &terminal.env_commands {
                lines.push(DryRunLine {
                    summary: format!("send to {pane}"),
                    command: format!("tmux send-keys -t {pane} {env_command} Enter"),
                });
            }
            if let Some(title) = &terminal.title {
                lines.push(DryRunLine {
                    summary: format!("title {pane}"),
                    command: format!("tmux select-pane -t {pane} -T {title}"),
                });
            }
            if let Some(command_text) = &terminal.command_text {
                lines.push(DryRunLine {
                    summary: format!("send to {pane}"),
                    command: format!("tmux send-keys -t {pane} {command_text} Enter"),
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
