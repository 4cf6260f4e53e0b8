//! Packaging and reporting
//!
//! Verifies the finished toolchain, optionally archives the install tree
//! with one of the parallel compression helpers, and assembles the final
//! run report. A missing compiler binary is a pipeline failure even when
//! every stage exited zero.

use crate::error::{ForgeError, ForgeResult};
use crate::resolver::{BuildConfig, SourceFlavor};
use crate::workspace::Workspace;
use chrono::{NaiveDate, Utc};
use clap::ValueEnum;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::info;

/// Requested post-build compression format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PackageFormat {
    Gz,
    Bz2,
    Zst,
}

impl PackageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Gz => "gz",
            Self::Bz2 => "bz2",
            Self::Zst => "zst",
        }
    }

    /// Compression filter handed to `tar -I`; all three come from the
    /// prebuilt helper cache
    pub fn tar_filter(self) -> &'static str {
        match self {
            Self::Gz => "pigz",
            Self::Bz2 => "pbzip2",
            Self::Zst => "pzstd",
        }
    }
}

/// Deterministic artifact name: target triple, requested major, source
/// flavor, and the UTC build date.
pub fn artifact_name(
    triple: &str,
    major: u32,
    flavor: SourceFlavor,
    format: PackageFormat,
    date: NaiveDate,
) -> String {
    format!(
        "{triple}-{major}.x-{flavor}-{}.tar.{}",
        date.format("%Y%m%d"),
        format.extension()
    )
}

/// Outcome of a completed run, for the final human-readable summary
pub struct BuildReport {
    pub duration: Duration,
    /// First line of `<triple>-gcc --version` from the fresh compiler
    pub compiler_version: String,
    pub install_prefix: PathBuf,
    /// Package path and size, when packaging was requested
    pub artifact: Option<(PathBuf, u64)>,
}

/// Confirm the expected compiler binary exists and report its version
pub async fn verify(config: &BuildConfig, ws: &Workspace) -> ForgeResult<String> {
    let compiler = ws
        .install_prefix
        .join("bin")
        .join(format!("{}-gcc", config.triple));
    if !compiler.exists() {
        return Err(ForgeError::PostBuildVerification(compiler));
    }

    let output = Command::new(&compiler)
        .arg("--version")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await
        .map_err(|e| ForgeError::command_failed(format!("{} --version", compiler.display()), e))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or_default().to_string())
}

/// Archive the install tree with the requested helper compressor
pub async fn package(
    config: &BuildConfig,
    ws: &Workspace,
    format: PackageFormat,
    path_env: &str,
) -> ForgeResult<(PathBuf, u64)> {
    let name = artifact_name(
        &config.triple,
        config.version,
        config.flavor,
        format,
        Utc::now().date_naive(),
    );
    info!("Packaging {name}");

    let output = Command::new("tar")
        .args(["-I", format.tar_filter(), "-cf", &name, &config.triple])
        .current_dir(&ws.root)
        .env("PATH", path_env)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| ForgeError::command_failed("tar -cf", e))?;

    if !output.status.success() {
        return Err(ForgeError::Internal(format!(
            "packaging failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let artifact = ws.root.join(&name);
    let size = tokio::fs::metadata(&artifact)
        .await
        .map_err(|e| ForgeError::io(format!("inspecting {}", artifact.display()), e))?
        .len();
    Ok((artifact, size))
}

/// Render a byte count the way the report prints it
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
