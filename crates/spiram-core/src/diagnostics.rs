//! Bring-up diagnostics
//!
//! A run records at most one outcome: the first failure, or a self-test pass
//! when nothing failed. Later failures never replace an earlier one, so the
//! report always names the step that broke first.

use crate::bus::{opcodes, LineWidth};

/// A setup step or self-test pass that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Failure {
    /// Controller peripheral could not be initialised
    ControllerInit,
    /// Reset-enable command failed in the given mode
    ResetEnable {
        /// Mode the command was issued in
        lines: LineWidth,
    },
    /// Reset command failed in the given mode
    Reset {
        /// Mode the command was issued in
        lines: LineWidth,
    },
    /// Read-ID instruction phase failed
    ReadIdCommand,
    /// Read-ID data phase failed
    ReadIdData,
    /// Quad-on command failed
    QuadEnable,
    /// Pre-mapping fill failed
    Clear,
    /// Protection unit could not be programmed
    Protection,
    /// Memory-mapped write path rejected
    WritePathConfig,
    /// Memory-mapped read path rejected
    ReadPathConfig,
    /// Memory-mapped mode could not be entered
    MappingActivation,
    /// A self-test pass read back something else
    SelfTest(Mismatch),
}

/// First mismatch seen by one self-test pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mismatch {
    /// 8-bit pass
    Byte {
        /// CPU address of the faulting byte
        address: u32,
        /// Pattern written
        expected: u8,
        /// Value read back
        observed: u8,
    },
    /// 16-bit pass
    Half {
        /// CPU address of the faulting halfword
        address: u32,
        /// Pattern written
        expected: u16,
        /// Value read back
        observed: u16,
    },
    /// 32-bit pass
    Word {
        /// CPU address of the faulting word
        address: u32,
        /// Pattern written
        expected: u32,
        /// Value read back
        observed: u32,
    },
}

impl Mismatch {
    /// Access width of the pass, in bits
    pub const fn bits(&self) -> u32 {
        match self {
            Self::Byte { .. } => 8,
            Self::Half { .. } => 16,
            Self::Word { .. } => 32,
        }
    }

    /// Faulting CPU address
    pub const fn address(&self) -> u32 {
        match *self {
            Self::Byte { address, .. }
            | Self::Half { address, .. }
            | Self::Word { address, .. } => address,
        }
    }

    /// Pattern written, widened
    pub const fn expected(&self) -> u32 {
        match *self {
            Self::Byte { expected, .. } => expected as u32,
            Self::Half { expected, .. } => expected as u32,
            Self::Word { expected, .. } => expected,
        }
    }

    /// Value read back, widened
    pub const fn observed(&self) -> u32 {
        match *self {
            Self::Byte { observed, .. } => observed as u32,
            Self::Half { observed, .. } => observed as u32,
            Self::Word { observed, .. } => observed,
        }
    }
}

/// Retained result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Every self-test pass ran clean and nothing failed before
    SelfTestPass,
    /// The first thing that went wrong
    Failed(Failure),
}

impl From<Failure> for Outcome {
    fn from(failure: Failure) -> Self {
        Self::Failed(failure)
    }
}

/// Identifier and outcome of one bring-up run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostics {
    identifier: Option<[u8; opcodes::IDENTIFIER_LEN]>,
    outcome: Option<Outcome>,
}

impl Diagnostics {
    /// Fresh state: no identifier, nothing recorded
    pub const fn new() -> Self {
        Self {
            identifier: None,
            outcome: None,
        }
    }

    /// Record `outcome` unless something is already recorded
    ///
    /// Returns true if it was recorded.
    pub fn record_if_absent(&mut self, outcome: impl Into<Outcome>) -> bool {
        let outcome = outcome.into();
        match self.outcome {
            Some(previous) => {
                log::debug!("ignoring {:?} after {:?}", outcome, previous);
                false
            }
            None => {
                match outcome {
                    Outcome::SelfTestPass => log::info!("self-test passed"),
                    Outcome::Failed(failure) => log::warn!("bring-up failed: {:?}", failure),
                }
                self.outcome = Some(outcome);
                true
            }
        }
    }

    /// Store the device identifier
    ///
    /// Write-once: a second identifier is ignored.
    pub fn set_identifier(&mut self, id: [u8; opcodes::IDENTIFIER_LEN]) {
        if self.identifier.is_none() {
            self.identifier = Some(id);
        }
    }

    /// Identifier read during bring-up, if any
    pub fn identifier(&self) -> Option<&[u8; opcodes::IDENTIFIER_LEN]> {
        self.identifier.as_ref()
    }

    /// Retained outcome, `None` while everything is ok
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Recorded failure, if any
    pub fn failure(&self) -> Option<Failure> {
        match self.outcome {
            Some(Outcome::Failed(f)) => Some(f),
            _ => None,
        }
    }

    /// Returns true if no failure has been recorded
    pub fn is_ok(&self) -> bool {
        self.failure().is_none()
    }
}

/// Sink for the end-of-run report
///
/// The core hands over the recorded state and never formats the report
/// itself. Firmware forwards it to its console, the host tool prints it.
pub trait DiagnosticsReporter {
    /// Render the diagnostics of one run
    fn report(&mut self, diagnostics: &Diagnostics);
}

impl<T: DiagnosticsReporter + ?Sized> DiagnosticsReporter for &mut T {
    fn report(&mut self, diagnostics: &Diagnostics) {
        (**self).report(diagnostics)
    }
}
