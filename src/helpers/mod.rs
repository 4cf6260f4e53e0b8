//! Build helper bootstrapper
//!
//! Ensures the auxiliary native tools used for fast decompression and
//! packaging exist, building them from source on first use and caching
//! the results under `prebuilts/` for reuse across runs. Later components
//! never learn how a helper was obtained; they only see it on PATH.

use crate::error::{ForgeError, ForgeResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// The four auxiliary tools the pipeline depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelperTool {
    /// Parallel gzip, used for .gz archives and gz packaging
    Pigz,
    /// Parallel bzip2, used for .bz2 archives and bz2 packaging
    Pbzip2,
    /// The zstd static library, a build input for pzstd
    Libzstd,
    /// Parallel zstd, used for zst packaging; linked against Libzstd
    Pzstd,
}

impl HelperTool {
    pub const ALL: [Self; 4] = [Self::Pigz, Self::Pbzip2, Self::Libzstd, Self::Pzstd];

    pub fn name(self) -> &'static str {
        match self {
            Self::Pigz => "pigz",
            Self::Pbzip2 => "pbzip2",
            Self::Libzstd => "libzstd",
            Self::Pzstd => "pzstd",
        }
    }

    /// Cached artifact path relative to `prebuilts/`
    pub fn artifact(self) -> &'static str {
        match self {
            Self::Pigz => "bin/pigz",
            Self::Pbzip2 => "bin/pbzip2",
            Self::Libzstd => "lib/libzstd.a",
            Self::Pzstd => "bin/pzstd",
        }
    }

    /// Source repository and pinned tag
    fn origin(self) -> (&'static str, &'static str) {
        match self {
            Self::Pigz => ("https://github.com/madler/pigz.git", "v2.8"),
            Self::Pbzip2 => ("https://git.launchpad.net/pbzip2", "v1.1.13"),
            // libzstd and pzstd share one clone
            Self::Libzstd | Self::Pzstd => ("https://github.com/facebook/zstd.git", "v1.5.5"),
        }
    }

    /// Clone directory name under `prebuilts/src/`
    fn src_dir(self) -> &'static str {
        match self {
            Self::Pigz => "pigz",
            Self::Pbzip2 => "pbzip2",
            Self::Libzstd | Self::Pzstd => "zstd",
        }
    }

    /// Path of the freshly built artifact inside the clone
    fn built_path(self) -> &'static str {
        match self {
            Self::Pigz => "pigz",
            Self::Pbzip2 => "pbzip2",
            Self::Libzstd => "lib/libzstd.a",
            Self::Pzstd => "contrib/pzstd/pzstd",
        }
    }
}

/// Resolves helper tools against the persistent `prebuilts/` cache
pub struct Helpers {
    prebuilts: PathBuf,
    jobs: u32,
    resolved: HashMap<HelperTool, PathBuf>,
}

impl Helpers {
    pub fn new(prebuilts: PathBuf, jobs: u32) -> Self {
        Self {
            prebuilts,
            jobs,
            resolved: HashMap::new(),
        }
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.prebuilts.join("bin")
    }

    /// PATH value with the prebuilt cache prepended; the only interface
    /// later components use to reach helpers
    pub fn search_path(&self) -> String {
        let system = std::env::var("PATH").unwrap_or_default();
        format!("{}:{}", self.bin_dir().display(), system)
    }

    /// Ensure all four helpers, in dependency order
    pub async fn ensure_all(&mut self) -> ForgeResult<()> {
        for tool in HelperTool::ALL {
            self.ensure(tool).await?;
        }
        Ok(())
    }

    /// Ensure one helper exists in the cache, building it on first use.
    /// Memoized in-process; across runs the cached artifact is the memo.
    pub async fn ensure(&mut self, tool: HelperTool) -> ForgeResult<PathBuf> {
        if let Some(path) = self.resolved.get(&tool) {
            return Ok(path.clone());
        }

        let artifact = self.prebuilts.join(tool.artifact());
        if artifact.exists() {
            debug!("{} already cached at {}", tool.name(), artifact.display());
            self.resolved.insert(tool, artifact.clone());
            return Ok(artifact);
        }

        // pzstd links against the cached library; build that first
        if tool == HelperTool::Pzstd && !self.prebuilts.join(HelperTool::Libzstd.artifact()).exists()
        {
            self.build(HelperTool::Libzstd).await?;
        }

        self.build(tool).await?;
        self.resolved.insert(tool, artifact.clone());
        Ok(artifact)
    }

    async fn build(&self, tool: HelperTool) -> ForgeResult<()> {
        tokio::fs::create_dir_all(&self.prebuilts)
            .await
            .map_err(|e| ForgeError::io(format!("creating {}", self.prebuilts.display()), e))?;
        let src = self.prebuilts.join("src").join(tool.src_dir());
        if !src.exists() {
            let (repo, tag) = tool.origin();
            info!("Cloning {} ({tag})", tool.name());
            self.run(
                tool,
                self.prebuilts.as_path(),
                "git",
                &[
                    "clone",
                    "--depth",
                    "1",
                    "--branch",
                    tag,
                    repo,
                    &src.display().to_string(),
                ],
            )
            .await?;
        }

        info!("Building {}", tool.name());
        let jobs = self.jobs.to_string();
        match tool {
            HelperTool::Pigz | HelperTool::Pbzip2 => {
                self.run(tool, &src, "make", &["-j", &jobs]).await?;
            }
            HelperTool::Libzstd => {
                self.run(tool, &src, "make", &["-C", "lib", "-j", &jobs, "libzstd.a"])
                    .await?;
            }
            HelperTool::Pzstd => {
                self.run(tool, &src, "make", &["-C", "contrib/pzstd", "-j", &jobs])
                    .await?;
            }
        }

        let built = src.join(tool.built_path());
        let artifact = self.prebuilts.join(tool.artifact());
        if let Some(parent) = artifact.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ForgeError::io(format!("creating {}", parent.display()), e))?;
        }
        tokio::fs::copy(&built, &artifact)
            .await
            .map_err(|e| ForgeError::HelperBuild {
                name: tool.name().to_string(),
                reason: format!("installing {}: {e}", built.display()),
            })?;

        info!("{} installed to {}", tool.name(), artifact.display());
        Ok(())
    }

    async fn run(
        &self,
        tool: HelperTool,
        cwd: &Path,
        program: &str,
        args: &[&str],
    ) -> ForgeResult<()> {
        debug!("{}: {program} {args:?}", tool.name());
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ForgeError::command_failed(format!("{program} {args:?}"), e))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ForgeError::HelperBuild {
                name: tool.name().to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn recipe_table_shape() {
        assert_eq!(HelperTool::ALL.len(), 4);
        assert_eq!(HelperTool::Pigz.artifact(), "bin/pigz");
        assert_eq!(HelperTool::Libzstd.artifact(), "lib/libzstd.a");
        // The library and its consumer come from the same clone
        assert_eq!(
            HelperTool::Libzstd.src_dir(),
            HelperTool::Pzstd.src_dir()
        );
    }

    #[test]
    fn search_path_prepends_cache() {
        let helpers = Helpers::new(PathBuf::from("/work/prebuilts"), 4);
        assert!(helpers.search_path().starts_with("/work/prebuilts/bin:"));
    }

    #[tokio::test]
    async fn cached_artifact_short_circuits() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/pigz"), b"#!/bin/sh\n").unwrap();

        let mut helpers = Helpers::new(dir.path().to_path_buf(), 4);
        // Would attempt a git clone if the cache were consulted wrongly
        let path = helpers.ensure(HelperTool::Pigz).await.unwrap();
        assert_eq!(path, dir.path().join("bin/pigz"));

        // Memoized second call
        let again = helpers.ensure(HelperTool::Pigz).await.unwrap();
        assert_eq!(path, again);
    }
}
