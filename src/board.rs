//! Board profile loading
//!
//! Profiles are RON files holding a [`SpiramConfig`] plus a name, loaded the
//! same way from a path given on the command line or from the default
//! location.

use serde::{Deserialize, Serialize};
use spiram_core::SpiramConfig;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Profile used when `--board` is not given
pub const DEFAULT_BOARD: &str = "boards/stm32h7a3-esp-psram64h.ron";

/// Errors loading a board profile
#[derive(Debug, Error)]
pub enum BoardError {
    /// Profile file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Profile file is not valid RON for a board
    #[error("Failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: ron::error::SpannedError,
    },

    /// Profile parsed but its values are out of range
    #[error("Invalid board profile {name}: {source}")]
    Invalid {
        name: String,
        #[source]
        source: spiram_core::Error,
    },
}

/// A named board profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Short board name
    pub name: String,
    /// One-line description
    #[serde(default)]
    pub description: String,
    /// RAM and controller parameters
    #[serde(default)]
    pub spiram: SpiramConfig,
}

impl Board {
    /// Profile compiled into the binary
    pub fn builtin() -> Self {
        Self {
            name: "builtin".into(),
            description: "Built-in STM32H7A3 / ESP-PSRAM64H defaults".into(),
            spiram: SpiramConfig::default(),
        }
    }

    /// Parse a profile from RON text
    pub fn from_ron(content: &str, origin: &str) -> Result<Self, BoardError> {
        let board: Board = ron::from_str(content).map_err(|source| BoardError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        board.validate()?;
        Ok(board)
    }

    /// Load a profile from a file
    pub fn load_file(path: &Path) -> Result<Self, BoardError> {
        let content = fs::read_to_string(path).map_err(|source| BoardError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&content, &path.display().to_string())
    }

    /// Check the profile's values
    pub fn validate(&self) -> Result<(), BoardError> {
        self.spiram.validate().map_err(|source| BoardError::Invalid {
            name: self.name.clone(),
            source,
        })
    }
}

/// Load the profile at `path`, or the default one
///
/// An explicit path must exist. Without one, the default profile is used if
/// present and the built-in values otherwise.
pub fn load(path: Option<&Path>) -> Result<Board, BoardError> {
    if let Some(path) = path {
        let board = Board::load_file(path)?;
        log::debug!("Loaded board {} from {}", board.name, path.display());
        return Ok(board);
    }

    let default = Path::new(DEFAULT_BOARD);
    if default.is_file() {
        let board = Board::load_file(default)?;
        log::debug!("Loaded board {} from {}", board.name, default.display());
        Ok(board)
    } else {
        log::warn!("No board profile at {}, using built-in defaults", DEFAULT_BOARD);
        Ok(Board::builtin())
    }
}
