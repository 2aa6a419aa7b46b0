//! Board profile display

use crate::board::Board;

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}

/// Print the profile and the window it would map
pub fn show(board: &Board) {
    let config = &board.spiram;
    let ctrl = &config.controller;

    println!("Board Profile");
    println!("=============");
    println!();
    println!("Name:            {}", board.name);
    if !board.description.is_empty() {
        println!("Description:     {}", board.description);
    }
    println!(
        "Device size:     {} bytes ({})",
        config.device_size,
        format_size(config.device_size)
    );
    match config.window_end() {
        Some(end) => println!("Window:          {:#010x} - {:#010x}", config.map_base, end),
        None => println!("Window:          {:#010x} (wraps)", config.map_base),
    }
    println!(
        "Fence:           region {} over {:#010x}+{}",
        config.block_region,
        config.map_base,
        format_size(config.block_size)
    );
    println!("Window region:   {}", config.window_region);
    println!("Read dummies:    {}", config.read_dummy_cycles);
    println!("CS release:      {} cycles", config.cs_release_period);
    println!("Read ID:         {}", config.read_identifier);
    println!("Startup test:    {}", config.startup_test);
    if config.clear_on_init {
        println!("Clear:           {:#010x}", config.clear_pattern);
    } else {
        println!("Clear:           off");
    }
    println!();
    println!("Controller:");
    println!("  Memory type:   {:?}", ctrl.memory_type);
    println!("  Prescaler:     {}", ctrl.clock_prescaler);
    println!("  Clock mode:    {:?}", ctrl.clock_mode);
    println!("  Sampling:      {:?}", ctrl.sample_shifting);
    println!("  FIFO thresh:   {}", ctrl.fifo_threshold);
    println!("  CS high time:  {} cycles", ctrl.chip_select_high_time);
    match ctrl.chip_select_boundary {
        0 => println!("  CS boundary:   off"),
        b => match 1u32.checked_shl(u32::from(b)) {
            Some(bytes) => println!("  CS boundary:   {}", format_size(bytes)),
            None => println!("  CS boundary:   2^{}", b),
        },
    }
    println!("  Poll budget:   {}", ctrl.timeout_polls);

    if let Err(e) = config.validate() {
        println!();
        println!("Warning: profile is not usable: {}", e);
    }
}
