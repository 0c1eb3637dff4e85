//! Configuration for writing ODIM_H5 products.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Version of the convention a file declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OdimVersion {
    pub major: u32,
    pub minor: u32,
}

impl Default for OdimVersion {
    fn default() -> Self {
        Self::V2_2
    }
}

impl OdimVersion {
    pub const V2_0: Self = Self::new(2, 0);
    pub const V2_1: Self = Self::new(2, 1);
    pub const V2_2: Self = Self::new(2, 2);
    pub const V2_3: Self = Self::new(2, 3);
    pub const V2_4: Self = Self::new(2, 4);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Value of `what/version`, e.g. `H5rad 2.2`.
    pub fn version_string(&self) -> String {
        format!("H5rad {}.{}", self.major, self.minor)
    }

    /// Value of the root `Conventions` attribute, e.g. `ODIM_H5/V2_2`.
    pub fn conventions_string(&self) -> String {
        format!("ODIM_H5/V{}_{}", self.major, self.minor)
    }

    /// Parse `H5rad 2.2`.
    pub fn parse_version(s: &str) -> Option<Self> {
        let (major, minor) = s.trim().strip_prefix("H5rad ")?.split_once('.')?;
        Some(Self::new(major.parse().ok()?, minor.parse().ok()?))
    }

    /// Parse `ODIM_H5/V2_2`.
    pub fn parse_conventions(s: &str) -> Option<Self> {
        let (major, minor) = s.trim().strip_prefix("ODIM_H5/V")?.split_once('_')?;
        Some(Self::new(major.parse().ok()?, minor.parse().ok()?))
    }

    /// Parse a bare `2.2`, as used in environment variables.
    pub fn parse_short(s: &str) -> Option<Self> {
        let (major, minor) = s.trim().split_once('.')?;
        Some(Self::new(major.parse().ok()?, minor.parse().ok()?))
    }
}

impl fmt::Display for OdimVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Configuration applied when creating files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OdimConfig {
    /// Convention version written into new files.
    pub odim_version: OdimVersion,

    /// Deflate level (0-9) for new data layers, `None` to store them
    /// uncompressed.
    pub compression_level: Option<u8>,

    /// Turn off the storage library's own error printing.
    pub silence_library_errors: bool,
}

impl Default for OdimConfig {
    fn default() -> Self {
        Self {
            odim_version: OdimVersion::default(),
            compression_level: Some(6),
            silence_library_errors: true,
        }
    }
}

impl OdimConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ODIM_VERSION") {
            if let Some(version) = OdimVersion::parse_short(&val) {
                config.odim_version = version;
            }
        }

        if let Ok(val) = std::env::var("ODIM_COMPRESSION_LEVEL") {
            if val.eq_ignore_ascii_case("none") {
                config.compression_level = None;
            } else if let Ok(level) = val.parse() {
                config.compression_level = Some(level);
            }
        }

        if let Ok(val) = std::env::var("ODIM_SILENCE_ERRORS") {
            config.silence_library_errors = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(level) = self.compression_level {
            if level > 9 {
                return Err(format!("compression_level must be 0-9, got {}", level));
            }
        }

        if self.odim_version.major != 2 {
            return Err(format!(
                "odim_version {} is not supported, expected 2.x",
                self.odim_version
            ));
        }

        Ok(())
    }
}
