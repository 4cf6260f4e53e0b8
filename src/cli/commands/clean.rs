//! Clean command: remove run-local state from the working directory

use crate::cli::args::CleanArgs;
use crate::error::{ForgeError, ForgeResult};
use crate::resolver::Arch;
use crate::ui::{self, UiContext};
use std::path::{Path, PathBuf};

/// Directories a build run creates or reuses at the workspace root
const BUILD_DIRS: [&str; 3] = ["build-binutils", "build-gcc", "build-glibc"];

pub async fn execute(args: CleanArgs, workdir: PathBuf) -> ForgeResult<()> {
    let ui = UiContext::detect();
    ui::intro(&ui, "crossforge clean");

    let mut removed = 0usize;

    for dir in BUILD_DIRS {
        removed += remove_dir(&ui, &workdir.join(dir)).await?;
    }
    for arch in Arch::ALL {
        removed += remove_dir(&ui, &workdir.join(arch.triple())).await?;
    }
    removed += remove_stray_archives(&ui, &workdir).await?;

    if args.all {
        removed += remove_dir(&ui, &workdir.join("sources")).await?;
        removed += remove_dir(&ui, &workdir.join("prebuilts")).await?;
    }

    if removed == 0 {
        ui::outro_success(&ui, "Nothing to clean");
    } else {
        ui::outro_success(&ui, &format!("Removed {removed} item(s)"));
    }
    Ok(())
}

async fn remove_dir(ui: &UiContext, path: &Path) -> ForgeResult<usize> {
    if !path.is_dir() {
        return Ok(0);
    }
    tokio::fs::remove_dir_all(path)
        .await
        .map_err(|e| ForgeError::io(format!("removing {}", path.display()), e))?;
    ui::step_ok(ui, &format!("removed {}", path.display()));
    Ok(1)
}

/// Top-level `*.tar.*` files are build artifacts or interrupted downloads
async fn remove_stray_archives(ui: &UiContext, workdir: &Path) -> ForgeResult<usize> {
    let mut removed = 0usize;
    let mut entries = tokio::fs::read_dir(workdir)
        .await
        .map_err(|e| ForgeError::io(format!("reading {}", workdir.display()), e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ForgeError::io(format!("reading {}", workdir.display()), e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_file() && name.contains(".tar.") {
            tokio::fs::remove_file(entry.path())
                .await
                .map_err(|e| ForgeError::io(format!("removing {name}"), e))?;
            ui::step_ok(ui, &format!("removed {name}"));
            removed += 1;
        }
    }
    Ok(removed)
}
