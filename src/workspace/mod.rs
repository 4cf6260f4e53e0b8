//! Workspace management
//!
//! Prepares the scratch build tree for one run: a mandatory clean-slate
//! check, scratch directories (tmpfs-backed where possible), symbolic
//! links wiring GCC to its numeric-library dependencies, and the
//! version-era source patch. The clean-slate check is a correctness
//! guard against mixing artifacts from a previous, possibly different
//! configuration.

pub mod scratch;

use crate::error::{ForgeError, ForgeResult};
use crate::resolver::BuildConfig;
use scratch::ScratchMounts;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

const BUILD_DIRS: [&str; 3] = ["build-binutils", "build-gcc", "build-glibc"];

/// Marker left in the GCC tree once the era patch has been applied, so a
/// rerun over a cached tree does not re-apply it
const PATCH_MARKER: &str = ".crossforge-patched";

/// The prepared working tree for one build run
#[derive(Debug)]
pub struct Workspace {
    pub root: PathBuf,
    pub sources_dir: PathBuf,
    pub build_binutils: PathBuf,
    pub build_gcc: PathBuf,
    pub build_glibc: PathBuf,
    /// Install prefix, named after the target triple
    pub install_prefix: PathBuf,
    pub prebuilts: PathBuf,
    scratch: ScratchMounts,
}

impl Workspace {
    /// Prepare a pristine workspace under `root`, or fail loudly if
    /// leftovers from a previous run would be mixed in.
    pub async fn prepare(
        config: &BuildConfig,
        root: &Path,
        use_tmpfs: bool,
    ) -> ForgeResult<Self> {
        check_clean(config, root)?;

        let build_dirs: Vec<PathBuf> = BUILD_DIRS.iter().map(|d| root.join(d)).collect();
        let install_prefix = root.join(&config.triple);

        for dir in build_dirs.iter().chain([&install_prefix]) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| ForgeError::io(format!("creating {}", dir.display()), e))?;
        }

        let scratch = ScratchMounts::acquire(&build_dirs, use_tmpfs).await;
        if scratch.is_ephemeral() {
            info!("Scratch directories are tmpfs-backed");
        }

        Ok(Self {
            root: root.to_path_buf(),
            sources_dir: root.join("sources"),
            build_binutils: root.join(BUILD_DIRS[0]),
            build_gcc: root.join(BUILD_DIRS[1]),
            build_glibc: root.join(BUILD_DIRS[2]),
            install_prefix,
            prebuilts: root.join("prebuilts"),
            scratch,
        })
    }

    pub fn is_ephemeral(&self) -> bool {
        self.scratch.is_ephemeral()
    }

    /// Wire GCC's configure step to its numeric-library dependencies
    /// without physically nesting them. The ISL link target differs when
    /// the fork snapshot ships ISL pre-extracted inside the GCC tree.
    pub async fn link_gcc_deps(&self, config: &BuildConfig) -> ForgeResult<()> {
        let gcc_dir = self.root.join(&config.gcc_dir);

        let mut links = vec![
            ("gmp", format!("../gmp-{}", config.versions.gmp)),
            ("mpfr", format!("../mpfr-{}", config.versions.mpfr)),
        ];
        if config.isl_bundled {
            links.push(("isl", format!("isl-{}", config.versions.isl)));
        } else {
            links.push(("isl", format!("../isl-{}", config.versions.isl)));
        }

        for (name, target) in links {
            let link = gcc_dir.join(name);
            if tokio::fs::symlink_metadata(&link).await.is_ok() {
                debug!("link {} already present", link.display());
                continue;
            }
            tokio::fs::symlink(&target, &link)
                .await
                .map_err(|e| ForgeError::io(format!("linking {} -> {target}", link.display()), e))?;
            debug!("linked {} -> {target}", link.display());
        }
        Ok(())
    }

    /// Apply the era-selected patch to the GCC tree. Failure is fatal and
    /// aborts before any compilation begins.
    pub async fn apply_patch(&self, config: &BuildConfig) -> ForgeResult<()> {
        let gcc_dir = self.root.join(&config.gcc_dir);
        let marker = gcc_dir.join(PATCH_MARKER);
        if marker.exists() {
            debug!("{} already patched", config.gcc_dir);
            return Ok(());
        }

        let name = config.patch.patch_name();
        info!("Applying {name}");

        let mut child = Command::new("patch")
            .args(["-p1", "-N", "-s"])
            .current_dir(&gcc_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ForgeError::command_failed("patch -p1", e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ForgeError::Internal("patch stdin unavailable".to_string()))?;
        stdin
            .write_all(config.patch.patch_text().as_bytes())
            .await
            .map_err(|e| ForgeError::io("writing patch to stdin", e))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ForgeError::command_failed("patch -p1", e))?;

        if !output.status.success() {
            return Err(ForgeError::Patch {
                patch: name.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tokio::fs::write(&marker, name)
            .await
            .map_err(|e| ForgeError::io("writing patch marker", e))?;
        Ok(())
    }

    /// Release tmpfs mounts. Idempotent; called on every exit path.
    pub async fn release_scratch(&mut self) {
        self.scratch.release().await;
    }

    /// Remove run-local intermediates after a successful build. The
    /// `sources/` archive cache and `prebuilts/` survive for later runs.
    pub async fn remove_intermediates(&self, config: &BuildConfig) -> ForgeResult<()> {
        let mut doomed: Vec<PathBuf> = BUILD_DIRS.iter().map(|d| self.root.join(d)).collect();
        for spec in &config.sources {
            doomed.push(self.root.join(&spec.dir_name));
        }

        for dir in doomed {
            if dir.exists() {
                tokio::fs::remove_dir_all(&dir)
                    .await
                    .map_err(|e| ForgeError::io(format!("removing {}", dir.display()), e))?;
                debug!("removed {}", dir.display());
            }
        }
        Ok(())
    }
}

/// Fail if any scratch directory, the triple-named install directory, or
/// a stray top-level archive would collide with this run. Performs no
/// filesystem mutation.
fn check_clean(config: &BuildConfig, root: &Path) -> ForgeResult<()> {
    for dir in BUILD_DIRS.iter().map(|d| root.join(d)) {
        if dir.exists() {
            return Err(ForgeError::WorkspaceNotClean { path: dir });
        }
    }

    let install = root.join(&config.triple);
    if install.exists() {
        return Err(ForgeError::WorkspaceNotClean { path: install });
    }

    if let Ok(entries) = std::fs::read_dir(root) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if entry.path().is_file() && name.contains(".tar.") {
                return Err(ForgeError::WorkspaceNotClean { path: entry.path() });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{resolve, Arch, ResolveOverrides, SourceFlavor};
    use tempfile::tempdir;

    fn config() -> BuildConfig {
        resolve(
            Arch::Arm64,
            SourceFlavor::Official,
            10,
            &ResolveOverrides::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn stale_build_dir_blocks_prepare() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("build-gcc")).unwrap();

        let err = Workspace::prepare(&config(), dir.path(), false)
            .await
            .unwrap_err();
        match err {
            ForgeError::WorkspaceNotClean { path } => {
                assert!(path.ends_with("build-gcc"));
            }
            other => panic!("expected WorkspaceNotClean, got: {other}"),
        }
        // No further mutation happened
        assert!(!dir.path().join("build-binutils").exists());
        assert!(!dir.path().join("aarch64-linux-gnu").exists());
    }

    #[tokio::test]
    async fn stale_install_dir_blocks_prepare() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("aarch64-linux-gnu")).unwrap();

        assert!(matches!(
            Workspace::prepare(&config(), dir.path(), false).await,
            Err(ForgeError::WorkspaceNotClean { .. })
        ));
    }

    #[tokio::test]
    async fn stray_archive_blocks_prepare() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("gcc-10.5.0.tar.xz"), b"stray").unwrap();

        assert!(matches!(
            Workspace::prepare(&config(), dir.path(), false).await,
            Err(ForgeError::WorkspaceNotClean { .. })
        ));
    }

    #[tokio::test]
    async fn prepare_creates_layout() {
        let dir = tempdir().unwrap();
        let ws = Workspace::prepare(&config(), dir.path(), false)
            .await
            .unwrap();
        assert!(ws.build_binutils.is_dir());
        assert!(ws.build_gcc.is_dir());
        assert!(ws.build_glibc.is_dir());
        assert!(ws.install_prefix.ends_with("aarch64-linux-gnu"));
        assert!(!ws.is_ephemeral());
    }

    // `prepare` results must stay debug-formattable; `unwrap_err` and
    // assertion output in this module depend on it
    #[tokio::test]
    async fn prepare_result_is_debuggable() {
        let dir = tempdir().unwrap();
        let ws = Workspace::prepare(&config(), dir.path(), false).await;
        assert!(format!("{ws:?}").contains("Workspace"));
    }

    #[tokio::test]
    async fn link_targets_follow_isl_provenance() {
        let dir = tempdir().unwrap();
        let config = config();
        std::fs::create_dir(dir.path().join(&config.gcc_dir)).unwrap();

        let ws = Workspace::prepare(&config, dir.path(), false)
            .await
            .unwrap();
        ws.link_gcc_deps(&config).await.unwrap();

        let isl = dir.path().join(&config.gcc_dir).join("isl");
        let target = std::fs::read_link(&isl).unwrap();
        assert_eq!(target, PathBuf::from("../isl-0.22.1"));

        // Idempotent on rerun
        ws.link_gcc_deps(&config).await.unwrap();
    }
}
