//! crossforge - reproducible from-source GNU cross toolchains
//!
//! Resolves a (target architecture, source flavor, GCC major) request
//! into a fully pinned build configuration, acquires the upstream
//! archives, bootstraps parallel-compression helper tools, runs the
//! staged binutils/headers/gcc/glibc pipeline, and optionally packages
//! the finished toolchain.

pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod helpers;
pub mod package;
pub mod pipeline;
pub mod resolver;
pub mod ui;
pub mod workspace;

pub use error::{ForgeError, ForgeResult};
