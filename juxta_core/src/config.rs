//! Configuration loaded from `juxta.toml`.
//!
//! ```toml
//! [excerpt]
//! chunk_size = 20
//!
//! [diff]
//! max_lines = 1000
//! max_line_chars = 5000
//! max_files = 100
//! whitespace = "show-all"
//! ```

use std::fs;

use camino::Utf8Path;
use juxta_api::WhitespaceMode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Collapsed-region expansion.
    #[serde(default)]
    pub excerpt: ExcerptSection,
    /// Diff rendering limits.
    #[serde(default)]
    pub diff: DiffSection,
}

/// `[excerpt]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcerptSection {
    /// Lines revealed per expansion step.
    pub chunk_size: u32,
}

impl Default for ExcerptSection {
    fn default() -> Self {
        Self { chunk_size: 20 }
    }
}

/// `[diff]` section. Zero disables a limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffSection {
    /// Lines rendered per file.
    pub max_lines: usize,
    /// Characters allowed on a single line before a file is elided.
    pub max_line_chars: usize,
    /// Files rendered per diff.
    pub max_files: usize,
    /// Default whitespace handling.
    pub whitespace: WhitespaceMode,
}

impl Default for DiffSection {
    fn default() -> Self {
        Self {
            max_lines: 1000,
            max_line_chars: 5000,
            max_files: 100,
            whitespace: WhitespaceMode::ShowAll,
        }
    }
}

impl Config {
    /// Read and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read and [`Error::Config`]
    /// when it does not parse or fails validation.
    pub fn load(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        debug!(path = %path, "loaded configuration");
        Ok(config)
    }

    /// Parse and validate configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the text does not parse or fails validation.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(|err| Error::Config {
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.excerpt.chunk_size == 0 {
            return Err(Error::Config {
                message: "excerpt.chunk_size must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}
