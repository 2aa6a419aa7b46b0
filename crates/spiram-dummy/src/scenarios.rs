//! End-to-end bring-up against the simulated device

use super::*;
use spiram_core::diagnostics::{Diagnostics, Failure, Mismatch, Outcome};
use spiram_core::memory_map::MappedWindow;
use spiram_core::protection::{self, RegionFlags, WindowAttributes};
use spiram_core::protocol::{transport, Device};
use spiram_core::selftest;
use spiram_core::{error::InvalidTransaction, Spiram, SpiramConfig};

const BASE: u32 = 0x9000_0000;
const SMALL: u32 = 0x1_0000;

fn dummy(size: u32, power_on: DeviceMode) -> DummySpiram {
    DummySpiram::new(DummyConfig {
        size: size as usize,
        power_on,
        ..Default::default()
    })
}

fn config(size: u32) -> SpiramConfig {
    SpiramConfig {
        device_size: size,
        read_identifier: true,
        startup_test: true,
        ..Default::default()
    }
}

fn ram(size: u32) -> Spiram<DummySpiram> {
    Spiram::new(dummy(size, DeviceMode::Spi), config(size))
}

fn position(events: &[BusEvent], f: impl Fn(&BusEvent) -> bool) -> usize {
    events.iter().position(f).unwrap()
}

#[test]
fn test_bringup_with_passing_self_test() {
    let mut ram = ram(SMALL);
    assert!(ram.initialize());

    assert_eq!(ram.diagnostics().outcome(), Some(Outcome::SelfTestPass));
    let id = ram.diagnostics().identifier().unwrap();
    assert!(id.iter().all(|&b| b != 0));
    assert_eq!(id[1], opcodes::KGD_PASS);
    assert_eq!(ram.window_start(), Some(BASE));
    assert_eq!(ram.window_end(), Some(BASE + SMALL));

    let counters = ram.bus().counters();
    assert_eq!(counters, &Counters::default());
}

#[test]
fn test_half_word_fault_reported_exactly() {
    let size = 0x80_0000;
    let mut ram = Spiram::new(
        dummy(size, DeviceMode::Spi),
        SpiramConfig {
            clear_on_init: false,
            ..config(size)
        },
    );
    ram.bus_mut().add_memory_fault(MemoryFault {
        address: 0x903E_2070,
        width: Some(AccessWidth::Half),
        read_back: 0x0000,
    });

    assert!(!ram.initialize());
    let expected = Mismatch::Half {
        address: 0x903E_2070,
        expected: 0x5A5A,
        observed: 0x0000,
    };
    assert_eq!(
        ram.diagnostics().failure(),
        Some(Failure::SelfTest(expected))
    );

    let report = ram.last_self_test().unwrap();
    assert_eq!(report.word, None);
    assert_eq!(report.half, Some(expected));
    assert_eq!(report.byte, None);
}

#[test]
fn test_activation_failure_leaves_window_unmapped() {
    let mut ram = ram(SMALL);
    ram.bus_mut().inject(Injection::MemoryMap);

    assert!(!ram.initialize());
    assert_eq!(ram.window_start(), None);
    assert_eq!(ram.window_end(), None);
    assert_eq!(
        ram.diagnostics().failure(),
        Some(Failure::MappingActivation)
    );
    assert!(ram.last_self_test().is_none());
    // No mapped load or store was attempted
    assert_eq!(ram.bus().counters(), &Counters::default());
}

#[test]
fn test_write_path_without_strobe() {
    let mut dummy = dummy(SMALL, DeviceMode::Spi);

    // The transport refuses it outright
    let err = transport::execute(
        &mut dummy,
        &mut BusTransaction::write_path(opcodes::QUAD_WRITE).with_data_strobe(false),
    )
    .unwrap_err();
    assert_eq!(
        err,
        Error::InvalidTransaction(InvalidTransaction::StrobeRequired)
    );
    assert!(dummy.events().is_empty());

    // Driving the controller directly shows why
    let config = config(SMALL);
    let mut diag = Diagnostics::new();
    Device::new()
        .reset(&mut dummy, &mut diag)
        .enable_quad(&mut dummy, &mut diag);
    protection::block_all(&mut dummy, &config).unwrap();
    dummy
        .execute(&mut BusTransaction::write_path(opcodes::QUAD_WRITE).with_data_strobe(false))
        .unwrap();
    dummy
        .execute(&mut BusTransaction::read_path(opcodes::QUAD_READ, 6))
        .unwrap();
    dummy.memory_map(&MemoryMapConfig::cs_release(1)).unwrap();

    let window = MappedWindow::new(BASE, SMALL, WindowAttributes::VERIFIED);
    dummy
        .configure_protection(&[
            protection::block_region(&config),
            ProtectionRegion::window(config.window_region, &window),
        ])
        .unwrap();

    let report = selftest::run(&mut dummy, &window, &mut diag);
    assert!(!report.passed());
    assert_eq!(
        report.word,
        Some(Mismatch::Word {
            address: BASE,
            expected: 0xA5A5_A5A5,
            observed: 0,
        })
    );
    assert!(dummy.counters().write_faults > 0);
}

#[test]
fn test_fence_ordering_in_bus_log() {
    let mut ram = ram(SMALL);
    assert!(ram.initialize());
    let events = ram.bus().events();

    let block = position(events, |e| matches!(e, BusEvent::Protection(_)));
    let write_path = position(events, |e| {
        matches!(
            e,
            BusEvent::Transaction {
                operation: Operation::ConfigureWritePath,
                ..
            }
        )
    });
    let read_path = position(events, |e| {
        matches!(
            e,
            BusEvent::Transaction {
                operation: Operation::ConfigureReadPath,
                ..
            }
        )
    });
    let map = position(events, |e| matches!(e, BusEvent::MemoryMap(_)));
    let enable = events
        .iter()
        .rposition(|e| matches!(e, BusEvent::Protection(_)))
        .unwrap();

    assert!(block < write_path);
    assert!(write_path < read_path);
    assert!(read_path < map);
    assert!(map < enable);
    assert_eq!(ram.bus().counters().unguarded_configs, 0);

    let window = ram.bus().region(2).unwrap();
    assert_eq!(window.base, BASE);
    assert_eq!(window.size, SMALL);
    assert_eq!(window.tex, 1);
    assert!(window.flags.is_empty());
}

#[test]
fn test_mode_controller_attempts_every_step() {
    let mut ram = ram(SMALL);
    ram.bus_mut().inject(Injection::QspiReset);
    ram.bus_mut().inject(Injection::QuadOn);

    // The device never reaches QPI, so the mapped reads come back wrong
    assert!(!ram.initialize());

    let commands: Vec<_> = ram
        .bus()
        .events()
        .iter()
        .filter_map(|e| match *e {
            BusEvent::Transaction {
                operation: Operation::Common,
                instruction,
                lines,
                ..
            } if instruction != opcodes::QUAD_WRITE => Some((instruction, lines)),
            _ => None,
        })
        .collect();
    assert_eq!(
        commands,
        [
            (opcodes::RESET_ENABLE, LineWidth::Quad),
            (opcodes::RESET, LineWidth::Quad),
            (opcodes::RESET_ENABLE, LineWidth::Single),
            (opcodes::RESET, LineWidth::Single),
            (opcodes::READ_ID, LineWidth::Single),
            (opcodes::QUAD_ON, LineWidth::Single),
        ]
    );
    assert_eq!(
        ram.diagnostics().failure(),
        Some(Failure::Reset {
            lines: LineWidth::Quad
        })
    );
    assert_eq!(ram.bus().mode(), DeviceMode::Spi);
}

#[test]
fn test_first_failure_wins_across_phases() {
    let mut ram = ram(SMALL);
    ram.bus_mut().inject(Injection::ReadIdData);
    ram.bus_mut().inject(Injection::ReadPath);

    assert!(!ram.initialize());
    assert_eq!(ram.diagnostics().failure(), Some(Failure::ReadIdData));
    assert!(ram.diagnostics().identifier().is_none());
    // Activation was still attempted
    assert!(ram
        .bus()
        .events()
        .iter()
        .any(|e| matches!(e, BusEvent::MemoryMap(_))));
}

#[test]
fn test_warm_start_in_qpi_mode() {
    let mut ram = Spiram::new(dummy(SMALL, DeviceMode::Qpi), config(SMALL));
    assert!(ram.initialize());
    assert_eq!(ram.diagnostics().outcome(), Some(Outcome::SelfTestPass));
    assert_eq!(ram.bus().mode(), DeviceMode::Qpi);
    assert!(ram.diagnostics().identifier().is_some());
}

#[test]
fn test_protection_failure_blocks_configuration() {
    let mut ram = ram(SMALL);
    ram.bus_mut().inject(Injection::Protection);

    assert!(!ram.initialize());
    assert_eq!(ram.diagnostics().failure(), Some(Failure::Protection));
    assert!(ram.bus().write_path().is_none());
    assert!(ram.bus().read_path().is_none());
    assert!(!ram.bus().is_mapped());
}

#[test]
fn test_explicit_access_before_mapping() {
    let mut ram = Spiram::new(
        dummy(SMALL, DeviceMode::Spi),
        SpiramConfig {
            startup_test: false,
            ..config(SMALL)
        },
    );
    ram.bus_mut().inject(Injection::MemoryMap);
    assert!(!ram.initialize());

    // The clear ran before mapping
    assert!(ram
        .bus()
        .data()
        .chunks_exact(4)
        .all(|w| w == 0xDEAD_BEEFu32.to_le_bytes()));

    ram.write_bytes(0x100, b"psram").unwrap();
    let mut buf = [0u8; 5];
    ram.read_bytes(0x100, &mut buf).unwrap();
    assert_eq!(&buf, b"psram");
    assert_eq!(
        ram.read_bytes(SMALL, &mut buf),
        Err(Error::OutOfBounds)
    );
}

#[test]
fn test_reinitialize_after_mapping() {
    let mut ram = ram(SMALL);
    assert!(ram.initialize());
    let before = ram.bus().events().len();

    assert!(ram.initialize());
    let events = &ram.bus().events()[before..];
    match &events[0] {
        BusEvent::Protection(regions) => {
            assert_eq!(regions[0].access, RegionAccess::NoAccess);
            assert!(!regions[1].enabled);
        }
        other => panic!("expected fence first, got {:?}", other),
    }
    assert_eq!(events[1], BusEvent::Init);
    assert_eq!(ram.bus().counters().unguarded_configs, 0);
    assert_eq!(ram.diagnostics().outcome(), Some(Outcome::SelfTestPass));
}

#[test]
fn test_corrupting_attributes_lose_writes() {
    let mut dummy = dummy(SMALL, DeviceMode::Spi);
    let mut diag = Diagnostics::new();
    let config = config(SMALL);
    let device = Device::new()
        .reset(&mut dummy, &mut diag)
        .enable_quad(&mut dummy, &mut diag);
    let blocked = protection::block_all(&mut dummy, &config).unwrap();
    let mapped = spiram_core::memory_map::activate(&mut dummy, device, blocked, &config, &mut diag)
        .unwrap();

    // The core refuses to open this window
    let bad = MappedWindow::new(
        BASE,
        SMALL,
        WindowAttributes {
            tex: 0b001,
            flags: RegionFlags::CACHEABLE | RegionFlags::BUFFERABLE,
        },
    );
    let region = ProtectionRegion::window(config.window_region, &bad);
    assert_eq!(region.validate(), Err(Error::UnsafeWindowAttributes));

    dummy
        .configure_protection(&[protection::block_region(&config), region])
        .unwrap();
    let report = selftest::run(&mut dummy, mapped.window(), &mut diag);
    assert!(!report.passed());
    assert!(dummy.counters().corrupted_writes > 0);
}
