//! Ephemeral scratch storage
//!
//! Build scratch directories are tmpfs-backed when the run can mount
//! them, with a transparent fallback to persistent storage when it
//! cannot. The fallback is performance-only. Mounts are a scoped
//! resource: released exactly once on success, failure, or interrupt,
//! with a `Drop` backstop for paths that skip the explicit release.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

const TMPFS_SIZE: &str = "size=80%";

/// Mount capability of the current process, probed once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Effective uid 0; mount directly
    Root,
    /// Passwordless sudo available; mount through `sudo -n`
    Sudo,
    /// No elevation; scratch stays on persistent storage
    None,
}

impl Privilege {
    /// Probe non-interactively. The result is branched on permanently
    /// for the remainder of the run.
    pub async fn probe() -> Self {
        // SAFETY: geteuid has no failure modes and touches no memory.
        if unsafe { libc::geteuid() } == 0 {
            return Self::Root;
        }

        let sudo = Command::new("sudo")
            .args(["-n", "true"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false);

        if sudo {
            Self::Sudo
        } else {
            Self::None
        }
    }

    pub fn can_mount(self) -> bool {
        self != Self::None
    }

    fn command(self, args: &[&str]) -> Command {
        match self {
            Self::Sudo => {
                let mut cmd = Command::new("sudo");
                cmd.arg("-n").args(args);
                cmd
            }
            _ => {
                let mut cmd = Command::new(args[0]);
                cmd.args(&args[1..]);
                cmd
            }
        }
    }
}

/// The set of tmpfs mounts backing this run's scratch directories
#[derive(Debug)]
pub struct ScratchMounts {
    privilege: Privilege,
    mounted: Vec<PathBuf>,
}

impl ScratchMounts {
    /// No ephemeral backing; plain directories
    pub fn disabled() -> Self {
        Self {
            privilege: Privilege::None,
            mounted: Vec::new(),
        }
    }

    /// Try to back each directory with tmpfs. Any failure falls back to
    /// persistent storage for the remaining directories.
    pub async fn acquire(dirs: &[PathBuf], enabled: bool) -> Self {
        if !enabled {
            debug!("Ephemeral scratch disabled by request");
            return Self::disabled();
        }

        let privilege = Privilege::probe().await;
        if !privilege.can_mount() {
            info!("No mount privilege; scratch directories stay on disk");
            return Self::disabled();
        }

        let mut mounted = Vec::with_capacity(dirs.len());
        for dir in dirs {
            if mount_tmpfs(privilege, dir).await {
                debug!("tmpfs mounted at {}", dir.display());
                mounted.push(dir.clone());
            } else {
                warn!(
                    "tmpfs mount failed for {}; continuing on disk",
                    dir.display()
                );
                break;
            }
        }

        Self { privilege, mounted }
    }

    /// Whether any scratch directory is tmpfs-backed
    pub fn is_ephemeral(&self) -> bool {
        !self.mounted.is_empty()
    }

    /// Release every mount. Draining the list makes a second call a no-op,
    /// so cleanup runs exactly once no matter which exit path reaches it.
    pub async fn release(&mut self) {
        for dir in std::mem::take(&mut self.mounted) {
            let status = self
                .privilege
                .command(&["umount", &dir.display().to_string()])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            match status {
                Ok(s) if s.success() => debug!("Unmounted {}", dir.display()),
                _ => warn!("Failed to unmount {}", dir.display()),
            }
        }
    }
}

impl Drop for ScratchMounts {
    fn drop(&mut self) {
        // Backstop only; the normal paths call release() first
        for dir in std::mem::take(&mut self.mounted) {
            let mut cmd = match self.privilege {
                Privilege::Sudo => {
                    let mut c = std::process::Command::new("sudo");
                    c.arg("-n").arg("umount");
                    c
                }
                _ => std::process::Command::new("umount"),
            };
            let _ = cmd
                .arg(&dir)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
        }
    }
}

async fn mount_tmpfs(privilege: Privilege, dir: &Path) -> bool {
    privilege
        .command(&[
            "mount",
            "-t",
            "tmpfs",
            "-o",
            TMPFS_SIZE,
            "tmpfs",
            &dir.display().to_string(),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}
