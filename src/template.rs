//! Template token expansion (§4.4, §6, §8).
//!
//! Commands may reference `{{pane_id:NAME}}`, `{{this_pane}}`, and
//! `{{focus_pane}}`. Expansion is total over the set of valid tokens and
//! fails closed on anything else, distinguishing an unrecognized token *kind*
//! from a recognized kind naming an unknown pane.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{AppError, ErrorCode, Result};

/// A single parsed template reference, prior to resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    PaneId(String),
    ThisPane,
    FocusPane,
    /// Recognized `{{...}}` syntax but not one of the three known kinds.
    Invalid(String),
}

fn token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)(?::([^}]*))?\s*\}\}")
            .expect("token pattern is a valid regex")
    })
}

fn parse_token(kind: &str, arg: Option<&str>, raw: &str) -> Token {
    match (kind, arg) {
        ("pane_id", Some(name)) => Token::PaneId(name.to_string()),
        ("this_pane", None) => Token::ThisPane,
        ("focus_pane", None) => Token::FocusPane,
        _ => Token::Invalid(raw.to_string()),
    }
}

/// Expand every `{{...}}` token in `text`.
///
/// `resolve_pane_id` maps a leaf name from `{{pane_id:NAME}}` to its real
/// pane id; returning `None` yields `TEMPLATE_TOKEN_UNKNOWN`. A token whose
/// kind isn't `pane_id`/`this_pane`/`focus_pane` yields `TEMPLATE_TOKEN_INVALID`.
/// A string with no tokens is returned unchanged (token idempotence, §8).
pub fn expand(
    text: &str,
    this_pane_real_id: &str,
    focus_pane_real_id: &str,
    mut resolve_pane_id: impl FnMut(&str) -> Option<String>,
) -> Result<String> {
    let re = token_pattern();
    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;

    for caps in re.captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always matches");
        out.push_str(&text[last_end..whole.start()]);
        last_end = whole.end();

        let kind = &caps[1];
        let arg = caps.get(2).map(|m| m.as_str());
        let token = parse_token(kind, arg, whole.as_str());

        match token {
            Token::ThisPane => out.push_str(this_pane_real_id),
            Token::FocusPane => out.push_str(focus_pane_real_id),
            Token::PaneId(name) => match resolve_pane_id(&name) {
                Some(real_id) => out.push_str(&real_id),
                None => {
                    return Err(AppError::emission(
                        ErrorCode::TemplateTokenUnknown,
                        format!("unknown pane name in template token: {name}"),
                    )
                    .with_details(serde_json::json!({
                        "tokenType": "pane_id",
                        "raw": whole.as_str(),
                    })));
                }
            },
            Token::Invalid(raw) => {
                return Err(AppError::emission(
                    ErrorCode::TemplateTokenInvalid,
                    format!("unrecognized template token kind: {kind}"),
                )
                .with_details(serde_json::json!({
                    "tokenType": kind,
                    "raw": raw,
                })));
            }
        }
    }
    out.push_str(&text[last_end..]);
    Ok(out)
}
