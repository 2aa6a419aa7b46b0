//! Bus line widths

/// Number of data lines used for one phase of a transaction
///
/// The controller and the device support exactly two widths, so every phase
/// width is one of these by construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineWidth {
    /// One data line (SPI)
    #[default]
    Single,
    /// Four data lines (QPI)
    Quad,
}

impl LineWidth {
    /// Returns the number of lines
    pub const fn lines(&self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Quad => 4,
        }
    }

    /// Clock cycles needed to shift one byte
    pub const fn cycles_per_byte(&self) -> u8 {
        8 / self.lines()
    }
}

impl core::fmt::Display for LineWidth {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Single => write!(f, "spi"),
            Self::Quad => write!(f, "qspi"),
        }
    }
}
