//! Interactive vs CI environment detection

use std::io::IsTerminal;

/// Decides whether output uses spinners and framing or plain text
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    interactive: bool,
}

impl UiContext {
    /// Detect the current environment once, at startup
    pub fn detect() -> Self {
        let interactive = std::io::stdout().is_terminal()
            && std::io::stderr().is_terminal()
            && std::env::var_os("CI").is_none();
        Self { interactive }
    }

    /// Plain-text context for tests and explicit CI mode
    pub fn plain() -> Self {
        Self { interactive: false }
    }

    pub fn use_fancy_output(self) -> bool {
        self.interactive
    }
}
