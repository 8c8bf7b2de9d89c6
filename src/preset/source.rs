//! Preset source URI resolution (§4.10, §6).
//!
//! `preset://<name>` resolves against `$VDE_PRESET_DIR`, falling back to
//! `~/.config/vde-layout/presets`, to `<name>.yaml`. `<name>` omitted
//! resolves to `preset://default`.

use std::path::PathBuf;

use crate::error::{AppError, ErrorCategory, ErrorCode};

use super::Preset;

const SCHEME: &str = "preset://";
const DEFAULT_NAME: &str = "default";

/// Parse a `preset://<name>` URI (or a bare name) into its logical name.
pub fn parse_uri(uri: &str) -> String {
    let name = uri.strip_prefix(SCHEME).unwrap_or(uri);
    if name.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        name.to_string()
    }
}

fn preset_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("VDE_PRESET_DIR")
        && !dir.is_empty()
    {
        return PathBuf::from(dir);
    }
    home::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("vde-layout")
        .join("presets")
}

/// Resolve a preset name (or `preset://` URI) to the YAML file it names.
pub fn resolve_path(uri: &str) -> PathBuf {
    let name = parse_uri(uri);
    preset_dir().join(format!("{name}.yaml"))
}

/// Load and parse the preset named by `uri` (bare name or `preset://name`).
pub fn load(uri: &str) -> Result<Preset, AppError> {
    let path = resolve_path(uri);
    let contents = std::fs::read_to_string(&path).map_err(|e| {
        AppError::new(
            ErrorCategory::Validation,
            ErrorCode::IoError,
            format!("failed to read preset file: {e}"),
        )
        .with_path(path.display().to_string())
    })?;

    serde_yaml::from_str(&contents).map_err(|e| {
        AppError::new(
            ErrorCategory::Validation,
            ErrorCode::ParseError,
            format!("failed to parse preset YAML: {e}"),
        )
        .with_path(path.display().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_and_uri_both_parse() {
        assert_eq!(parse_uri("preset://foo"), "foo");
        assert_eq!(parse_uri("foo"), "foo");
    }

    #[test]
    fn empty_name_resolves_to_default() {
        assert_eq!(parse_uri("preset://"), "default");
        assert_eq!(parse_uri(""), "default");
    }
}
