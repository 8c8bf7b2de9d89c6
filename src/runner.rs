//! Plan runner (§4.5): drives emitted steps against a pane-oriented backend.
//!
//! Owns the pane-ID registry and window-mode setup; each backend only
//! supplies the primitive translations via [`PaneOps`]. A split node's first
//! child is never produced by an explicit split step (it's the pane that
//! existed before the split), so after registering a split's `createdPaneId`
//! this also aliases `<target>.0` to the target's own real pane the first
//! time a split node is divided.

use std::collections::HashMap;

use crate::backend::{ApplyOutcome, WindowMode};
use crate::emit::{PlanEmission, Sizing, StepKind};
use crate::error::{AppError, ErrorCode, Result};
use crate::preset::Orientation;
use crate::terminal_prep;

/// Primitive operations a backend must provide; the apply algorithm itself
/// is shared (this module), not duplicated per backend.
pub trait PaneOps {
    /// Prepare the target window per `window_mode` and return the real id of
    /// the pane that plays the role of virtual id `"root"`.
    fn setup_window(
        &mut self,
        window_mode: WindowMode,
        window_name: Option<&str>,
        confirm_kill: &mut dyn FnMut(&[String]) -> bool,
    ) -> Result<String>;

    /// Split `target_real`, returning the new pane's real id.
    fn split(&mut self, target_real: &str, orientation: Orientation, sizing: &Sizing) -> Result<String>;

    fn focus(&mut self, target_real: &str) -> Result<()>;

    fn set_title(&mut self, pane_real: &str, title: &str) -> Result<()>;

    /// Type a line of text into `pane_real`'s shell and press Enter.
    fn send_line(&mut self, pane_real: &str, text: &str) -> Result<()>;
}

/// Drive `emission` to completion against `backend`.
pub fn execute(
    backend: &mut impl PaneOps,
    emission: &PlanEmission,
    window_mode: WindowMode,
    window_name: Option<&str>,
    confirm_kill: &mut dyn FnMut(&[String]) -> bool,
) -> Result<ApplyOutcome> {
    let initial_real = backend.setup_window(window_mode, window_name, confirm_kill)?;

    let mut registry: HashMap<String, String> = HashMap::new();
    registry.insert(emission.summary.initial_pane_id.clone(), initial_real);

    let mut executed_steps = 0usize;
    for step in &emission.steps {
        match &step.kind {
            StepKind::Split {
                target_pane_id,
                created_pane_id,
                orientation,
                sizing,
            } => {
                let target_real = lookup(&registry, target_pane_id)?;
                let new_real = backend.split(&target_real, *orientation, sizing)?;

                // The first split of any node never touches its own child 0;
                // alias it to the (still-valid) target real pane.
                if let Some(prefix) = created_pane_id.strip_suffix(".1")
                    && prefix == target_pane_id
                {
                    registry.insert(format!("{target_pane_id}.0"), target_real.clone());
                }

                registry.insert(created_pane_id.clone(), new_real);
                executed_steps += 1;
            }
            StepKind::Focus { target_pane_id } => {
                let target_real = lookup(&registry, target_pane_id)?;
                backend.focus(&target_real)?;
                executed_steps += 1;
            }
        }
    }

    let prepared = terminal_prep::prepare(
        &emission.terminals,
        &emission.summary.focus_pane_id,
        &mut |virtual_id| registry.get(virtual_id).cloned(),
    )?;

    for terminal in &prepared.terminals {
        tracing::debug!(
            virtual_pane_id = %terminal.virtual_pane_id,
            real_pane_id = %terminal.real_pane_id,
            "replaying terminal"
        );
        if let Some(cwd_command) = &terminal.cwd_command {
            backend.send_line(&terminal.real_pane_id, cwd_command)?;
        }
        for env_command in &terminal.env_commands {
            backend.send_line(&terminal.real_pane_id, env_command)?;
        }
        if let Some(title) = &terminal.title {
            backend.set_title(&terminal.real_pane_id, title)?;
        }
        if let Some(command_text) = &terminal.command_text {
            if terminal.delay_ms > 0 {
                std::thread::sleep(std::time::Duration::from_millis(terminal.delay_ms as u64));
            }
            backend.send_line(&terminal.real_pane_id, command_text)?;
        }
    }

    backend.focus(&prepared.focus_pane_real_id)?;

    Ok(ApplyOutcome {
        executed_steps,
        focus_pane_real_id: prepared.focus_pane_real_id,
    })
}

fn lookup(registry: &HashMap<String, String>, virtual_id: &str) -> Result<String> {
    registry.get(virtual_id).cloned().ok_or_else(|| {
        AppError::execution(
            ErrorCode::MissingTarget,
            format!("no real pane registered for {virtual_id}"),
        )
        .with_path(virtual_id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::emit;
    use crate::plan::plan;
    use crate::preset::compiler::compile;
    use crate::preset::{LayoutNode, Preset, SplitNode, TerminalNode};
    use indexmap::IndexMap;
    use std::cell::RefCell;

    struct FakePanes {
        next_id: u32,
        splits: RefCell<Vec<(String, Orientation, Sizing)>>,
        sent: RefCell<Vec<(String, String)>>,
    }

    impl PaneOps for FakePanes {
        fn setup_window(
            &mut self,
            _window_mode: WindowMode,
            _window_name: Option<&str>,
            _confirm_kill: &mut dyn FnMut(&[String]) -> bool,
        ) -> Result<String> {
            Ok("%0".to_string())
        }

        fn split(&mut self, target_real: &str, orientation: Orientation, sizing: &Sizing) -> Result<String> {
            self.splits
                .borrow_mut()
                .push((target_real.to_string(), orientation, *sizing));
            self.next_id += 1;
            Ok(format!("%{}", self.next_id))
        }

        fn focus(&mut self, _target_real: &str) -> Result<()> {
            Ok(())
        }

        fn set_title(&mut self, _pane_real: &str, _title: &str) -> Result<()> {
            Ok(())
        }

        fn send_line(&mut self, pane_real: &str, text: &str) -> Result<()> {
            self.sent.borrow_mut().push((pane_real.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn two_pane_emission() -> PlanEmission {
        let preset = Preset {
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
                        command: Some("echo main".to_string()),
                        cwd: Some("/tmp".to_string()),
                        env: IndexMap::new(),
                        focus: true,
                        title: None,
                        ephemeral: false,
                        close_on_error: false,
                        delay_ms: 0,
                    }),
                    LayoutNode::Terminal(TerminalNode {
                        name: "aux".to_string(),
                        command: Some("echo aux".to_string()),
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
        };
        emit(&plan(&compile(&preset).unwrap()))
    }

    #[test]
    fn executes_splits_and_replays_terminals_in_order() {
        let emission = two_pane_emission();
        let mut panes = FakePanes {
            next_id: 0,
            splits: RefCell::new(Vec::new()),
            sent: RefCell::new(Vec::new()),
        };
        let outcome = execute(
            &mut panes,
            &emission,
            WindowMode::NewWindow,
            None,
            &mut |_| true,
        )
        .unwrap();

        assert_eq!(outcome.executed_steps, 2);
        assert_eq!(outcome.focus_pane_real_id, "%0");

        let sent = panes.sent.into_inner();
        // main (root.0 -> %0): cd then command.
        assert_eq!(sent[0], ("%0".to_string(), "cd -- '/tmp'".to_string()));
        assert_eq!(sent[1], ("%0".to_string(), "echo main".to_string()));
        // aux (root.1 -> %1): command only, no cwd.
        assert_eq!(sent[2], ("%1".to_string(), "echo aux".to_string()));
    }
}
