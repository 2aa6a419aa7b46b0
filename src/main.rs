//! spiram - Host tool for external quad-SPI RAM bring-up
//!
//! Runs the same bring-up sequence the firmware runs, against a simulated
//! controller and pseudo-SRAM, with failures injected per step or per mapped
//! load. The report uses the firmware's console wording.

mod board;
mod cli;
mod commands;
mod report;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logger, RUST_LOG still wins over -v
    let default_filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Faults => {
            commands::faults::list();
            Ok(())
        }
        Commands::Board => {
            let board = board::load(cli.board.as_deref())?;
            commands::board::show(&board);
            Ok(())
        }
        Commands::Bringup(args) => {
            let board = board::load(cli.board.as_deref())?;
            commands::bringup::run(&board, &args)
        }
    }
}
