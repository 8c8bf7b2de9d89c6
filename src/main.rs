mod backend;
mod cli;
mod cmd;
mod emit;
mod error;
mod logger;
mod plan;
mod preset;
mod runner;
mod shell;
mod template;
mod terminal_prep;

use anyhow::Result;
use tracing::{error, info};

fn main() -> Result<()> {
    let verbose = std::env::args().any(|a| a == "--verbose" || a == "-v");
    logger::init(verbose)?;
    info!(args = ?std::env::args().collect::<Vec<_>>(), "vde-layout start");

    match cli::run() {
        Ok(()) => {
            info!("vde-layout finished successfully");
            Ok(())
        }
        Err(err) => {
            error!(error = ?err, "vde-layout failed");
            Err(err)
        }
    }
}
