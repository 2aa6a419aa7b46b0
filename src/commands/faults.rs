//! Fault listing

use spiram_dummy::Injection;

/// List every step `--fail` accepts
pub fn list() {
    println!("Injectable bring-up steps:");
    println!();
    for injection in Injection::ALL {
        println!("  {:<18} - {}", injection.name(), injection.description());
    }
    println!();
    println!("Mapped-load faults: --fault <addr>:<8|16|32|any>:<value>");
}
