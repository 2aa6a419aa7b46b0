//! Bring-up object

use crate::config::SpiramConfig;
use crate::controller::{BusController, MappedMemory};
use crate::diagnostics::{Diagnostics, DiagnosticsReporter, Failure, Outcome};
use crate::error::{Error, Result};
use crate::memory_map::{self, Mapped, MappedWindow, Unmapped};
use crate::protection;
use crate::protocol::{Device, QuadLine};
use crate::selftest::{self, SelfTestReport};

/// How far bring-up got
#[derive(Debug)]
enum Stage {
    /// Nothing done yet
    Idle,
    /// Device in quad mode, controller in indirect mode
    Negotiated(Device<QuadLine>),
    /// Window mapped and open
    Mapped(Mapped),
    /// Controller state unknown, everything stays fenced off
    Locked,
}

/// External RAM behind a bus controller
///
/// Owns the controller handle and the diagnostics of the last run. Hardware
/// is only touched by [`initialize`](Self::initialize), the self-test and the
/// explicit read/write helpers.
pub struct Spiram<B> {
    bus: B,
    config: SpiramConfig,
    diagnostics: Diagnostics,
    stage: Stage,
    last_self_test: Option<SelfTestReport>,
}

impl<B: BusController + MappedMemory> Spiram<B> {
    /// Wrap a controller; nothing is issued until [`initialize`](Self::initialize)
    pub fn new(bus: B, config: SpiramConfig) -> Self {
        Self {
            bus,
            config,
            diagnostics: Diagnostics::new(),
            stage: Stage::Idle,
            last_self_test: None,
        }
    }

    /// Bring the device up and map it
    ///
    /// Runs controller init, mode negotiation, the optional identifier read
    /// and clear, the protection fence, both path configurations, mapping
    /// activation, the window opening and, if configured, the self-test.
    /// A failing step is recorded and the remaining steps still run, except
    /// that nothing touches the path configuration without the fence in
    /// place.
    ///
    /// Returns true if the window is usable and the startup self-test, when
    /// it ran, passed. Calling this again starts a fresh run with fresh
    /// diagnostics.
    pub fn initialize(&mut self) -> bool {
        self.diagnostics = Diagnostics::new();
        self.last_self_test = None;

        let previous = core::mem::replace(&mut self.stage, Stage::Idle);
        if matches!(previous, Stage::Mapped(_) | Stage::Locked) {
            log::debug!("re-initialising a mapped controller");
            if let Err(e) = protection::block_all(&mut self.bus, &self.config) {
                log::error!("cannot fence controller space: {}", e);
                self.diagnostics.record_if_absent(Failure::Protection);
                self.stage = Stage::Locked;
                return false;
            }
        }

        let bus = &mut self.bus;
        let config = &self.config;
        let diag = &mut self.diagnostics;

        log::info!(
            "spiram {:#010x}+{:#x}, prescaler {}",
            config.map_base,
            config.device_size,
            config.controller.clock_prescaler
        );
        if let Err(e) = config
            .validate()
            .and_then(|()| bus.init_controller(&config.controller))
        {
            log::warn!("controller init: {}", e);
            diag.record_if_absent(Failure::ControllerInit);
        }

        let device = Device::new().reset(bus, diag);
        if config.read_identifier {
            device.read_identifier(bus, diag);
        }
        let device = device.enable_quad(bus, diag);
        if config.clear_on_init {
            device.clear(bus, config.device_size, config.clear_pattern, diag);
        }

        let blocked = match protection::block_all(bus, config) {
            Ok(blocked) => blocked,
            Err(e) => {
                log::error!("cannot fence controller space: {}", e);
                diag.record_if_absent(Failure::Protection);
                self.stage = Stage::Negotiated(device);
                return false;
            }
        };

        let mapped = match memory_map::activate(bus, device, blocked, config, diag) {
            Ok(mapped) => mapped,
            Err(Unmapped::Indirect(device)) => {
                self.stage = Stage::Negotiated(device);
                return false;
            }
            Err(Unmapped::Stranded) => {
                self.stage = Stage::Locked;
                return false;
            }
        };

        if let Err(e) = protection::enable_window(bus, config, &mapped) {
            log::error!("cannot open window: {}", e);
            diag.record_if_absent(Failure::Protection);
            self.stage = Stage::Locked;
            return false;
        }
        self.stage = Stage::Mapped(mapped);

        if self.config.startup_test {
            return self.run_self_test(false);
        }
        true
    }

    /// The mapped window, if bring-up succeeded
    pub fn window(&self) -> Option<&MappedWindow> {
        match &self.stage {
            Stage::Mapped(mapped) => Some(mapped.window()),
            _ => None,
        }
    }

    /// First mapped address
    pub fn window_start(&self) -> Option<u32> {
        self.window().map(MappedWindow::start)
    }

    /// First address past the mapped window
    pub fn window_end(&self) -> Option<u32> {
        self.window().map(MappedWindow::end)
    }

    /// Returns true if the window is mapped and open
    pub fn is_mapped(&self) -> bool {
        self.window().is_some()
    }

    /// Run the destructive pattern test over the window
    ///
    /// `_fast` is accepted for callers that distinguish a quick check; every
    /// run covers the whole window. Returns false without touching memory
    /// when nothing is mapped, and false when an earlier step of this run
    /// already failed even if every pass is clean.
    pub fn run_self_test(&mut self, _fast: bool) -> bool {
        let window = match &self.stage {
            Stage::Mapped(mapped) => *mapped.window(),
            _ => {
                log::warn!("self-test skipped, window not mapped");
                return false;
            }
        };
        let report = selftest::run(&mut self.bus, &window, &mut self.diagnostics);
        self.last_self_test = Some(report);
        report.passed() && self.diagnostics.outcome() == Some(Outcome::SelfTestPass)
    }

    /// Per-width result of the most recent self-test in this run
    pub fn last_self_test(&self) -> Option<&SelfTestReport> {
        self.last_self_test.as_ref()
    }

    /// Quad read at device address `addr`, before memory mapping only
    pub fn read_bytes(&mut self, addr: u32, dest: &mut [u8]) -> Result<()> {
        match &self.stage {
            Stage::Negotiated(device) => {
                check_bounds(&self.config, addr, dest.len())?;
                device.read(&mut self.bus, addr, dest)
            }
            Stage::Idle => Err(Error::NotNegotiated),
            Stage::Mapped(_) | Stage::Locked => Err(Error::WindowMapped),
        }
    }

    /// Quad write at device address `addr`, before memory mapping only
    pub fn write_bytes(&mut self, addr: u32, src: &[u8]) -> Result<()> {
        match &self.stage {
            Stage::Negotiated(device) => {
                check_bounds(&self.config, addr, src.len())?;
                device.write(&mut self.bus, addr, src)
            }
            Stage::Idle => Err(Error::NotNegotiated),
            Stage::Mapped(_) | Stage::Locked => Err(Error::WindowMapped),
        }
    }

    /// Hand the identifier and outcome to `reporter`
    pub fn report_diagnostics<R: DiagnosticsReporter + ?Sized>(&self, reporter: &mut R) {
        reporter.report(&self.diagnostics);
    }
}

impl<B> Spiram<B> {
    /// Diagnostics of the current run
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Board profile
    pub fn config(&self) -> &SpiramConfig {
        &self.config
    }

    /// Controller handle
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutable controller handle, bypassing the bring-up state
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Give the controller handle back
    pub fn into_inner(self) -> B {
        self.bus
    }
}

fn check_bounds(config: &SpiramConfig, addr: u32, len: usize) -> Result<()> {
    let end = u64::from(addr) + len as u64;
    if end > u64::from(config.device_size) {
        return Err(Error::OutOfBounds);
    }
    Ok(())
}
