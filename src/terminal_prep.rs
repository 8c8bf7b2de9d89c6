//! Per-terminal command preparation (§4.4).
//!
//! Turns each [`EmittedTerminal`](crate::emit::EmittedTerminal) into the
//! concrete shell fragments a backend replays against its real pane:
//! a `cd` command, `export` commands in insertion order, a title, and a
//! token-expanded startup command. All shell values are quoted via
//! [`crate::shell::quote`]; command text itself is left un-quoted since it
//! is a full line to run, not a single argument.

use std::sync::OnceLock;

use regex::Regex;

use crate::emit::EmittedTerminal;
use crate::error::{AppError, ErrorCode, Result};
use crate::shell;
use crate::template;

fn env_key_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"))
}

#[derive(Debug, Clone)]
pub struct PreparedTerminal {
    pub virtual_pane_id: String,
    pub real_pane_id: String,
    pub cwd_command: Option<String>,
    pub env_commands: Vec<String>,
    pub title: Option<String>,
    pub command_text: Option<String>,
    pub delay_ms: i64,
}

#[derive(Debug, Clone)]
pub struct Prepared {
    pub focus_pane_real_id: String,
    pub terminals: Vec<PreparedTerminal>,
}

/// Resolve every terminal's real pane id, cwd/env/title/command fragments.
/// `resolve_real_pane_id` is also used to resolve the focus pane and any
/// `{{pane_id:NAME}}` template tokens embedded in commands.
pub fn prepare(
    terminals: &[EmittedTerminal],
    focus_pane_virtual_id: &str,
    resolve_real_pane_id: &mut impl FnMut(&str) -> Option<String>,
) -> Result<Prepared> {
    let focus_pane_real_id = resolve_real_pane_id(focus_pane_virtual_id).ok_or_else(|| {
        AppError::emission(
            ErrorCode::MissingTarget,
            format!("no real pane registered for focus pane {focus_pane_virtual_id}"),
        )
        .with_path(focus_pane_virtual_id)
    })?;

    let mut prepared = Vec::with_capacity(terminals.len());
    for t in terminals {
        let real_pane_id = resolve_real_pane_id(&t.pane_id).ok_or_else(|| {
            AppError::emission(
                ErrorCode::MissingTarget,
                format!("no real pane registered for {}", t.pane_id),
            )
            .with_path(&t.pane_id)
        })?;

        let cwd_command = t
            .cwd
            .as_ref()
            .map(|cwd| format!("cd -- {}", shell::quote(cwd)));

        let mut env_commands = Vec::with_capacity(t.env.len());
        for (key, value) in &t.env {
            if !env_key_pattern().is_match(key) {
                return Err(AppError::validation(
                    ErrorCode::InvalidEnvKey,
                    format!("invalid environment variable key: {key}"),
                )
                .with_path(&t.pane_id));
            }
            env_commands.push(format!("export {key}={}", shell::quote(value)));
        }

        let command_text = match &t.command {
            Some(raw) => {
                let mut text = template::expand(raw, &real_pane_id, &focus_pane_real_id, |name| {
                    resolve_real_pane_id(name)
                })?;
                if t.ephemeral {
                    if t.close_on_error {
                        text.push_str("; exit");
                    } else {
                        text.push_str("; [ $? -eq 0 ] && exit");
                    }
                }
                Some(text)
            }
            None => None,
        };

        prepared.push(PreparedTerminal {
            virtual_pane_id: t.pane_id.clone(),
            real_pane_id,
            cwd_command,
            env_commands,
            title: t.title.clone(),
            command_text,
            delay_ms: t.delay_ms.max(0),
        });
    }

    Ok(Prepared {
        focus_pane_real_id,
        terminals: prepared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn terminal(pane_id: &str, command: Option<&str>) -> EmittedTerminal {
        EmittedTerminal {
            pane_id: pane_id.to_string(),
            name: pane_id.to_string(),
            command: command.map(str::to_string),
            cwd: Some("/tmp/proj".to_string()),
            env: vec![("FOO".to_string(), "it's here".to_string())],
            focus: pane_id == "root.0",
            title: Some("main".to_string()),
            ephemeral: false,
            close_on_error: false,
            delay_ms: 0,
        }
    }

    fn registry() -> HashMap<String, String> {
        HashMap::from([
            ("root.0".to_string(), "%0".to_string()),
            ("root.1".to_string(), "%1".to_string()),
        ])
    }

    #[test]
    fn builds_quoted_cwd_and_env_commands() {
        let terms = vec![terminal("root.0", Some("echo hi"))];
        let reg = registry();
        let mut resolve = |id: &str| reg.get(id).cloned();
        let prepared = prepare(&terms, "root.0", &mut resolve).unwrap();

        assert_eq!(prepared.focus_pane_real_id, "%0");
        let t = &prepared.terminals[0];
        assert_eq!(t.cwd_command.as_deref(), Some("cd -- '/tmp/proj'"));
        assert_eq!(t.env_commands[0], "export FOO='it'\"'\"'s here'");
        assert_eq!(t.command_text.as_deref(), Some("echo hi"));
    }

    #[test]
    fn expands_template_tokens_in_command() {
        let terms = vec![terminal("root.1", Some("echo {{this_pane}} {{focus_pane}}"))];
        let reg = registry();
        let mut resolve = |id: &str| reg.get(id).cloned();
        let prepared = prepare(&terms, "root.0", &mut resolve).unwrap();
        assert_eq!(
            prepared.terminals[0].command_text.as_deref(),
            Some("echo %1 %0")
        );
    }

    #[test]
    fn ephemeral_appends_conditional_exit() {
        let mut t = terminal("root.0", Some("echo hi"));
        t.ephemeral = true;
        let terms = vec![t];
        let reg = registry();
        let mut resolve = |id: &str| reg.get(id).cloned();
        let prepared = prepare(&terms, "root.0", &mut resolve).unwrap();
        assert_eq!(
            prepared.terminals[0].command_text.as_deref(),
            Some("echo hi; [ $? -eq 0 ] && exit")
        );
    }

    #[test]
    fn ephemeral_close_on_error_appends_unconditional_exit() {
        let mut t = terminal("root.0", Some("echo hi"));
        t.ephemeral = true;
        t.close_on_error = true;
        let terms = vec![t];
        let reg = registry();
        let mut resolve = |id: &str| reg.get(id).cloned();
        let prepared = prepare(&terms, "root.0", &mut resolve).unwrap();
        assert_eq!(
            prepared.terminals[0].command_text.as_deref(),
            Some("echo hi; exit")
        );
    }

    #[test]
    fn missing_pane_mapping_is_missing_target() {
        let terms = vec![terminal("root.5", Some("echo hi"))];
        let reg = registry();
        let mut resolve = |id: &str| reg.get(id).cloned();
        let err = prepare(&terms, "root.0", &mut resolve).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingTarget);
    }
}
