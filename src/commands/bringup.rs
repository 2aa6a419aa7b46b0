//! Simulated bring-up

use indicatif::{ProgressBar, ProgressStyle};
use spiram_core::{Spiram, SpiramConfig};
use spiram_dummy::{BusEvent, DeviceMode, DummyConfig, DummySpiram};
use std::time::Duration;

use crate::board::Board;
use crate::cli::BringupArgs;
use crate::report::{describe_mismatch, ConsoleReporter};

/// Profile for this run: the board's values with the command-line overrides
pub fn effective_config(board: &Board, args: &BringupArgs) -> SpiramConfig {
    let mut config = board.spiram.clone();
    if args.no_self_test {
        config.read_identifier = false;
        config.startup_test = false;
    }
    if args.no_clear {
        config.clear_on_init = false;
    }
    if let Some(size) = args.size {
        config.device_size = size;
    }
    config
}

/// Simulated device matching `config`, with the requested failures armed
pub fn build_device(config: &SpiramConfig, args: &BringupArgs) -> DummySpiram {
    let mut dummy = DummySpiram::new(DummyConfig {
        map_base: config.map_base,
        size: config.device_size as usize,
        power_on: if args.warm {
            DeviceMode::Qpi
        } else {
            DeviceMode::Spi
        },
        ..Default::default()
    });
    for &injection in &args.fail {
        log::info!("Injecting failure: {}", injection.description());
        dummy.inject(injection);
    }
    for &fault in &args.fault {
        log::info!(
            "Injecting fault: loads from {:#010x} return {:#x}",
            fault.address,
            fault.read_back
        );
        dummy.add_memory_fault(fault);
    }
    dummy
}

fn create_spinner(message: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Run the bring-up and print its report
pub fn run(board: &Board, args: &BringupArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = effective_config(board, args);
    if !config.device_size.is_power_of_two() {
        return Err(format!("Device size {:#x} is not a power of two", config.device_size).into());
    }
    config.validate()?;

    println!(
        "Board: {} ({} KiB at {:#010x})",
        board.name,
        config.device_size / 1024,
        config.map_base
    );

    let dummy = build_device(&config, args);
    let mut ram = Spiram::new(dummy, config);

    let spinner = create_spinner("Bringing up external RAM...")?;
    let ok = ram.initialize();
    spinner.finish_and_clear();

    ram.report_diagnostics(&mut ConsoleReporter);

    match (ram.window_start(), ram.window_end()) {
        (Some(start), Some(end)) => println!("Window: {:#010x} - {:#010x}", start, end),
        _ => println!("Window: not mapped"),
    }

    if let Some(report) = ram.last_self_test() {
        let line = |name: &str, result: Option<spiram_core::Mismatch>| match result {
            Some(m) => format!("  {:<8} {}", name, describe_mismatch(&m)),
            None => format!("  {:<8} pass", name),
        };
        println!("Self-test:");
        println!("{}", line("32-bit", report.word));
        println!("{}", line("16-bit", report.half));
        println!("{}", line("8-bit", report.byte));
    }

    let counters = ram.bus().counters();
    if counters.access_violations + counters.write_faults + counters.corrupted_writes > 0 {
        println!(
            "Simulator: {} access violations, {} dropped writes, {} corrupted writes",
            counters.access_violations, counters.write_faults, counters.corrupted_writes
        );
    }

    if args.events {
        println!("Bus log:");
        for event in ram.bus().events() {
            print_event(event);
        }
    }

    if ok {
        Ok(())
    } else {
        Err("Bring-up failed".into())
    }
}

fn print_event(event: &BusEvent) {
    match event {
        BusEvent::Init => println!("  init"),
        BusEvent::Transaction {
            operation,
            instruction,
            lines,
            data_strobe,
            dummy_cycles,
        } => println!(
            "  {:?} 0x{:02x} {} dummy={} dqs={}",
            operation, instruction, lines, dummy_cycles, data_strobe
        ),
        BusEvent::MemoryMap(config) => {
            println!("  mmap cs-release={}", config.timeout_period)
        }
        BusEvent::Protection(regions) => {
            for region in regions {
                if region.enabled {
                    println!(
                        "  mpu region {} {:#010x}+{:#x} {:?} tex={} {:?}",
                        region.number,
                        region.base,
                        region.size,
                        region.access,
                        region.tex,
                        region.flags
                    );
                } else {
                    println!("  mpu region {} off", region.number);
                }
            }
        }
    }
}
