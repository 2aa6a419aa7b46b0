//! CLI argument parsing

use clap::{Parser, Subcommand};
use spiram_core::controller::AccessWidth;
use spiram_dummy::{Injection, MemoryFault};
use std::path::PathBuf;
use thiserror::Error;

/// Errors parsing a `--fault` or `--fail` argument
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgError {
    /// Not of the form `addr:width:value`
    #[error("expected <addr>:<width>:<value>, got {0:?}")]
    FaultSyntax(String),

    /// Width is not 8, 16, 32 or `any`
    #[error("invalid access width {0:?} (expected 8, 16, 32 or any)")]
    Width(String),

    /// Number did not parse
    #[error("invalid number {0:?}")]
    Number(String),

    /// Unknown step name
    #[error("unknown step {0:?} (see `spiram faults`)")]
    Step(String),
}

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, ArgError> {
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(&hex.replace('_', ""), 16)
    } else {
        s.replace('_', "").parse::<u32>()
    };
    parsed.map_err(|_| ArgError::Number(s.to_string()))
}

/// Parse `addr:width:value` into a mapped-load fault
pub fn parse_fault(s: &str) -> Result<MemoryFault, ArgError> {
    let mut parts = s.split(':');
    let (Some(addr), Some(width), Some(value), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ArgError::FaultSyntax(s.to_string()));
    };

    let width = match width.to_ascii_lowercase().as_str() {
        "8" | "byte" => Some(AccessWidth::Byte),
        "16" | "half" => Some(AccessWidth::Half),
        "32" | "word" => Some(AccessWidth::Word),
        "any" | "*" => None,
        _ => return Err(ArgError::Width(width.to_string())),
    };

    Ok(MemoryFault {
        address: parse_hex_u32(addr)?,
        width,
        read_back: parse_hex_u32(value)?,
    })
}

/// Parse a bring-up step name
pub fn parse_injection(s: &str) -> Result<Injection, ArgError> {
    Injection::from_name(s).ok_or_else(|| ArgError::Step(s.to_string()))
}

#[derive(Parser)]
#[command(name = "spiram")]
#[command(author, version, about = "External quad-SPI RAM bring-up", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Board profile (RON format)
    /// Defaults to boards/stm32h7a3-esp-psram64h.ron, then to built-in values
    #[arg(long, global = true)]
    pub board: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options for a simulated bring-up
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BringupArgs {
    /// Make a bring-up step fail (repeatable, see `spiram faults`)
    #[arg(long = "fail", value_parser = parse_injection)]
    pub fail: Vec<Injection>,

    /// Make mapped loads from one address return a value: <addr>:<8|16|32|any>:<value>
    #[arg(long = "fault", value_parser = parse_fault)]
    pub fault: Vec<MemoryFault>,

    /// Start with the device already in QPI mode
    #[arg(long)]
    pub warm: bool,

    /// Skip the identifier read and the self-test
    #[arg(long)]
    pub no_self_test: bool,

    /// Skip the pre-mapping clear
    #[arg(long)]
    pub no_clear: bool,

    /// Override the device size (hex or decimal, a power of two)
    #[arg(long, value_parser = parse_hex_u32)]
    pub size: Option<u32>,

    /// Print the simulated bus log
    #[arg(long)]
    pub events: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bring-up sequence against the simulated device
    Bringup(BringupArgs),

    /// Show the board profile and the window it maps
    Board,

    /// List the bring-up steps that can be made to fail
    Faults,
}
