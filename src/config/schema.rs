//! Configuration schema for crossforge
//!
//! Configuration is stored at `~/.config/crossforge/config.toml`.
//! Every section has defaults; CLI flags override file values.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build defaults
    pub build: BuildSection,

    /// Mirror overrides
    pub mirrors: MirrorsSection,

    /// Packaging defaults
    pub package: PackageSection,
}

/// Defaults applied to every build
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    /// Job-parallelism hint; unset means CPU count + 1
    pub jobs: Option<u32>,

    /// Back scratch directories with tmpfs when privileges allow
    pub tmpfs: bool,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            jobs: None,
            tmpfs: true,
        }
    }
}

/// Mirror bases for archive retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorsSection {
    /// GNU mirror base for official releases
    pub gnu: String,
}

impl Default for MirrorsSection {
    fn default() -> Self {
        Self {
            gnu: crate::resolver::table::DEFAULT_GNU_MIRROR.to_string(),
        }
    }
}

/// Packaging defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageSection {
    /// Default compression format (gz, bz2, zst); unset means no package
    pub format: Option<String>,
}
