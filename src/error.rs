//! Error types for crossforge
//!
//! All modules use `ForgeResult<T>` as their return type. Every error is
//! fatal to the run: there is no partial-success mode and no retry of any
//! stage. Scratch-mount cleanup still runs on every failure path.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for crossforge operations
pub type ForgeResult<T> = Result<T, ForgeError>;

/// All errors that can occur in crossforge
#[derive(Error, Debug)]
pub enum ForgeError {
    // Configuration resolution errors (detected before any I/O)
    #[error("Unknown target architecture: {0}. Supported: arm, arm64, i686, x86_64")]
    InvalidArchitecture(String),

    #[error("GCC {version} is not a pinned release for the {flavor} flavor")]
    UnsupportedVersion { flavor: String, version: u32 },

    #[error("GCC {version} ({flavor} flavor) is discontinued: {reason}")]
    DiscontinuedVersion {
        flavor: String,
        version: u32,
        reason: String,
    },

    #[error(
        "GCC {version} cannot target {arch}: releases before {floor} produce \
         a compiler that mis-links {arch} binaries. Use {floor} or newer."
    )]
    VersionFloor {
        arch: String,
        version: u32,
        floor: u32,
    },

    // Configuration file errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Workspace errors
    #[error("Workspace not clean: {path} is left over from a previous run")]
    WorkspaceNotClean { path: PathBuf },

    // Source acquisition errors
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Failed to extract {archive}: {reason}")]
    Extract { archive: String, reason: String },

    // Patch errors
    #[error("Source patch {patch} did not apply cleanly: {reason}")]
    Patch { patch: String, reason: String },

    // Helper bootstrap errors
    #[error("Failed to build helper tool {name}: {reason}")]
    HelperBuild { name: String, reason: String },

    // Pipeline errors
    #[error("Build stage '{stage}' failed (exit code {code}): {summary}")]
    Stage {
        stage: String,
        code: i32,
        summary: String,
    },

    #[error("Build interrupted")]
    Aborted,

    #[error("Pipeline finished but {0} is missing; the toolchain is incomplete")]
    PostBuildVerification(PathBuf),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed to start: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ForgeError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a fetch error
    pub fn fetch(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::WorkspaceNotClean { .. } => Some("Run: crossforge clean"),
            Self::DiscontinuedVersion { .. } => Some("Use --flavor official for this release"),
            Self::PostBuildVerification(_) => {
                Some("Re-run with -v to see the external build output")
            }
            _ => None,
        }
    }
}
