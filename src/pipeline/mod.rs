//! Stage pipeline execution
//!
//! Runs the ordered, architecture-branching bootstrap stages against the
//! prepared workspace. Each stage delegates to an external build system;
//! the executor's job is sequencing, working-directory management, and
//! fail-fast error propagation. It never interprets tool output beyond
//! the exit status, and no stage is ever retried.

pub mod stages;

use crate::error::{ForgeError, ForgeResult};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// One external command invocation within a stage
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl CommandSpec {
    pub fn new(program: &str, args: &[String], cwd: PathBuf) -> Self {
        Self {
            program: program.to_string(),
            args: args.to_vec(),
            cwd,
        }
    }

    fn display(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

/// One bootstrap stage: a named unit of work with declared prerequisites
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: &'static str,
    pub deps: &'static [&'static str],
    /// Human-readable summary used when the stage fails
    pub summary: &'static str,
    pub commands: Vec<CommandSpec>,
}

/// Topological execution order over the declared dependency graph,
/// stable with respect to declaration order. Unknown prerequisites and
/// cycles are programming errors in the stage table.
pub fn execution_order(stages: &[Stage]) -> ForgeResult<Vec<usize>> {
    for stage in stages {
        for dep in stage.deps {
            if !stages.iter().any(|s| s.name == *dep) {
                return Err(ForgeError::Internal(format!(
                    "stage '{}' depends on unknown stage '{dep}'",
                    stage.name
                )));
            }
        }
    }

    let mut order = Vec::with_capacity(stages.len());
    let mut done = vec![false; stages.len()];

    while order.len() < stages.len() {
        let next = stages.iter().enumerate().position(|(i, stage)| {
            !done[i]
                && stage.deps.iter().all(|dep| {
                    stages
                        .iter()
                        .position(|s| s.name == *dep)
                        .map(|j| done[j])
                        .unwrap_or(false)
                })
        });
        match next {
            Some(i) => {
                done[i] = true;
                order.push(i);
            }
            None => {
                return Err(ForgeError::Internal(
                    "stage dependency cycle detected".to_string(),
                ));
            }
        }
    }

    Ok(order)
}

/// Sequential, blocking, fail-fast stage runner
pub struct Executor {
    /// PATH for every child: install prefix bin + prebuilt helpers first
    path_env: String,
    verbose: bool,
}

impl Executor {
    pub fn new(path_env: String, verbose: bool) -> Self {
        Self { path_env, verbose }
    }

    /// Run all stages in topological order. The first failure aborts the
    /// pipeline; later stages consume files produced by earlier ones, so
    /// there is no parallelism between stages.
    pub async fn run(&self, stages: &[Stage]) -> ForgeResult<()> {
        let order = execution_order(stages)?;
        for idx in order {
            let stage = &stages[idx];
            info!("Stage: {}", stage.name);
            for command in &stage.commands {
                self.run_command(stage, command).await?;
            }
        }
        Ok(())
    }

    async fn run_command(&self, stage: &Stage, spec: &CommandSpec) -> ForgeResult<()> {
        debug!("[{}] {}", stage.name, spec.display());

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .env("PATH", &self.path_env)
            // An aborted run drops this future mid-stage; the external
            // build must die with it or scratch mounts stay busy
            .kill_on_drop(true);

        if self.verbose {
            command
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        } else {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let status = command
            .status()
            .await
            .map_err(|e| ForgeError::command_failed(spec.display(), e))?;

        if status.success() {
            Ok(())
        } else {
            Err(ForgeError::Stage {
                stage: stage.name.to_string(),
                code: status.code().unwrap_or(-1),
                summary: stage.summary.to_string(),
            })
        }
    }
}
