//! CLI entry point (§4.9, §6).
//!
//! Thin wiring around the core pipeline: load preset, resolve backend,
//! compile → plan → emit, then either render a dry-run preview or drive the
//! plan runner. This module owns argument parsing and process wiring only.

use std::collections::HashMap;
use std::io::{self, Write};

use anyhow::{Context as _, Result};
use clap::Parser;

use crate::backend::{self, BackendKind, Context as BackendContext, WindowMode};
use crate::emit;
use crate::error::{AppError, ErrorCode};
use crate::plan;
use crate::preset::{compiler, source};

#[derive(Parser, Debug)]
#[command(
    name = "vde-layout",
    version,
    about = "Compile a declarative terminal-multiplexer layout and apply it to tmux or WezTerm"
)]
struct CliArgs {
    /// Preset name or `preset://` URI.
    #[arg(default_value = "default")]
    preset: String,

    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// Render the steps that would be issued without any subprocess side effects.
    #[arg(long)]
    dry_run: bool,

    /// Reuse the active window, closing any pre-existing extra panes.
    #[arg(long)]
    current_window: bool,

    /// Create a fresh window/tab instead of reusing the active one.
    #[arg(long)]
    new_window: bool,

    #[arg(long)]
    window_name: Option<String>,

    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Tmux,
    Wezterm,
}

impl From<BackendArg> for BackendKind {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Tmux => BackendKind::Tmux,
            BackendArg::Wezterm => BackendKind::Wezterm,
        }
    }
}

pub fn run() -> Result<()> {
    let args = CliArgs::parse();

    if args.current_window && args.new_window {
        return Err(AppError::user(
            ErrorCode::CliConflictingFlags,
            "--current-window and --new-window are mutually exclusive",
        )
        .into());
    }

    if args.verbose {
        tracing::debug!("verbose mode enabled");
    }

    let preset = source::load(&args.preset).context("failed to load preset")?;

    let env: HashMap<String, String> = std::env::vars().collect();
    let backend_kind = backend::resolve_backend_kind(
        args.backend.map(Into::into),
        preset.backend.as_deref(),
        &env,
    )?;

    let compiled = compiler::compile(&preset)?;
    tracing::info!(preset = %compiled.name, backend = %backend_kind.as_str(), "preset compiled");
    let layout_plan = plan::plan(&compiled);
    let emission = emit::emit(&layout_plan);

    let ctx = BackendContext {
        dry_run: args.dry_run,
        cwd: std::env::current_dir().context("failed to read current directory")?,
        pane_id: env.get("WEZTERM_PANE").cloned(),
    };
    let mut backend_impl = backend::create_backend(backend_kind, ctx);
    backend_impl.verify_environment()?;

    if args.dry_run {
        render_dry_run(backend_impl.kind(), &backend_impl.dry_run_steps(&emission)?);
        return Ok(());
    }

    let window_mode = if args.current_window {
        WindowMode::CurrentWindow
    } else {
        WindowMode::NewWindow
    };

    let mut confirm_kill = |pane_ids: &[String]| -> bool { prompt_confirm_kill(pane_ids) };
    let outcome = backend_impl.apply_plan(
        &emission,
        window_mode,
        args.window_name.as_deref(),
        &mut confirm_kill,
    )?;
    tracing::info!(
        executed_steps = outcome.executed_steps,
        focus_pane = %outcome.focus_pane_real_id,
        "plan applied"
    );

    Ok(())
}

/// §6's dry-run textual format: header line, then one line per step,
/// `<1-based index, right-aligned to width 2>. [<backend>] <summary>: <command>`.
fn render_dry_run(backend_kind: BackendKind, lines: &[backend::DryRunLine]) {
    println!("Planned terminal steps (dry-run)");
    for (i, line) in lines.iter().enumerate() {
        println!(
            " {:>2}. [{}] {}: {}",
            i + 1,
            backend_kind.as_str(),
            line.summary,
            line.command
        );
    }
}

fn prompt_confirm_kill(pane_ids: &[String]) -> bool {
    print!(
        "Close {} existing pane(s) in the current window? [y/N] ",
        pane_ids.len()
    );
    let _ = io::stdout().flush();
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}
