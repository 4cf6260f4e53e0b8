//! Status command: report host prerequisites and mount privileges

use crate::error::ForgeResult;
use crate::ui::{self, UiContext};
use crate::workspace::scratch::Privilege;
use std::process::Stdio;
use tokio::process::Command;

/// Host programs every build shells out to. Helper compressors are
/// bootstrapped automatically and are deliberately not listed here.
const HOST_TOOLS: [(&str, &str); 10] = [
    ("make", "install GNU make"),
    ("gcc", "install a host C compiler"),
    ("g++", "install a host C++ compiler"),
    ("patch", "install patch"),
    ("tar", "install GNU tar"),
    ("git", "install git (used to fetch helper tool sources)"),
    ("xz", "install xz-utils"),
    ("makeinfo", "install texinfo (required by binutils)"),
    ("bison", "install bison (required by glibc)"),
    ("gawk", "install gawk (required by glibc)"),
];

pub async fn execute() -> ForgeResult<()> {
    let ui = UiContext::detect();
    ui::intro(&ui, "crossforge status");

    let mut missing = 0usize;
    for (name, hint) in HOST_TOOLS {
        if probe_tool(name).await {
            ui::step_ok(&ui, name);
        } else {
            ui::step_warn(&ui, &format!("{name} not found: {hint}"));
            missing += 1;
        }
    }

    match Privilege::probe().await {
        Privilege::Root => ui::step_ok(&ui, "tmpfs scratch available (root)"),
        Privilege::Sudo => ui::step_ok(&ui, "tmpfs scratch available (passwordless sudo)"),
        Privilege::None => ui::step_warn(
            &ui,
            "tmpfs scratch unavailable; builds fall back to persistent storage",
        ),
    }

    if missing == 0 {
        ui::outro_success(&ui, "Host is ready");
    } else {
        ui::outro_error(&ui, &format!("{missing} host tool(s) missing"));
    }
    Ok(())
}

/// A tool counts as present when it can be spawned at all; `--version`
/// exit codes vary across these programs and are not checked.
async fn probe_tool(name: &str) -> bool {
    Command::new(name)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .is_ok()
}
