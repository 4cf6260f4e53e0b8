//! Terminal output
//!
//! Fancy output (spinners, intro/outro framing) in interactive terminals,
//! plain line-oriented text in CI. Output always goes through this module
//! so verbosity and redirection stay orthogonal to control flow.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{intro, note, outro_error, outro_success, step_ok, step_warn};
pub use progress::{fetch_bar, TaskSpinner};
