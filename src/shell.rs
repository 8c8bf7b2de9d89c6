//! Single-arg shell quoting (§4.4, §9).
//!
//! Always wraps in single quotes, unconditionally — no passthrough-when-safe
//! shortcut, and no backend-dependent choice between quoting styles.

/// Quote `s` for safe use as a single shell argument: wrap in `'…'`, escaping
/// any embedded `'` as `'"'"'` (close the quote, emit a literal `'` via a
/// double-quoted segment, reopen the quote).
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'\"'\"'");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_plain_text() {
        assert_eq!(quote("hello"), "'hello'");
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn escapes_embedded_single_quotes() {
        assert_eq!(quote("it's"), "'it'\"'\"'s'");
        assert_eq!(quote("'"), "''\"'\"''");
    }

    #[test]
    fn preserves_shell_metacharacters_literally() {
        // Inside single quotes everything but ' is literal.
        assert_eq!(quote("$HOME"), "'$HOME'");
        assert_eq!(quote("a && b"), "'a && b'");
        assert_eq!(quote("`cmd`"), "'`cmd`'");
    }

    // Property: quote round-trip — feeding the quoted form through `sh -c`
    // as `printf '%s' <quoted>` yields the original string byte-for-byte.
    #[test]
    fn quote_round_trips_through_posix_shell() {
        use std::process::Command;

        let cases = [
            "hello world",
            "it's a test",
            "$(rm -rf /)",
            "a 'quoted' value",
            "",
            "newline\nin\nstring",
            "''''",
        ];

        for case in cases {
            let quoted = quote(case);
            let script = format!("printf '%s' {quoted}");
            let output = Command::new("sh")
                .arg("-c")
                .arg(&script)
                .output()
                .expect("sh should be available");
            assert_eq!(
                String::from_utf8_lossy(&output.stdout),
                case,
                "round-trip failed for {case:?}, script was {script:?}"
            );
        }
    }
}
