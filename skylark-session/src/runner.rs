//! Tool runner seam
//!
//! Everything Skylark does to the system goes through an external tool
//! (iw, iwconfig, airmon-ng, airodump-ng, aireplay-ng, aircrack-ng, ...).
//! `ToolRunner` is the single seam those calls pass through, so the attack
//! state machines can be driven by a scripted fake in tests.

use crate::supervisor::ProcessSupervisor;
use async_trait::async_trait;
use skylark_core::{Error, Result};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;
use uuid::Uuid;

/// Conventional shell exit code for a killed-by-timeout command
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Captured result of a bounded foreground command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0 && !self.timed_out
    }
}

/// Seam for running external tools
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run a command to completion, bounded by `limit` when given.
    ///
    /// A timeout is a normal negative outcome, not an error: the command is
    /// killed and the output is returned with `timed_out = true` and exit
    /// code 124.
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        limit: Option<Duration>,
    ) -> Result<CommandOutput>;

    /// Start a background tool under supervision
    fn spawn(&self, program: &str, args: &[&str]) -> Result<Uuid>;

    /// Whether a spawned tool is still running
    async fn is_alive(&self, id: Uuid) -> bool;

    /// Stop a spawned tool; true when a live process was stopped
    async fn terminate(&self, id: Uuid) -> bool;

    /// Stop every spawned tool; returns how many were actually stopped
    async fn terminate_all(&self) -> usize;
}

/// Real implementation over tokio::process and the supervisor
pub struct SystemRunner {
    supervisor: Arc<ProcessSupervisor>,
}

impl SystemRunner {
    pub fn new(supervisor: Arc<ProcessSupervisor>) -> Self {
        Self { supervisor }
    }

    pub fn supervisor(&self) -> &Arc<ProcessSupervisor> {
        &self.supervisor
    }
}

#[async_trait]
impl ToolRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        limit: Option<Duration>,
    ) -> Result<CommandOutput> {
        debug!(tool = %program, ?args, "running command");

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let output_future = command.output();
        let output = match limit {
            Some(limit) => match timeout(limit, output_future).await {
                Ok(result) => result,
                // Dropping the future kills the child (kill_on_drop)
                Err(_) => {
                    debug!(tool = %program, seconds = limit.as_secs(), "command timed out");
                    return Ok(CommandOutput {
                        code: TIMEOUT_EXIT_CODE,
                        stdout: String::new(),
                        stderr: String::new(),
                        timed_out: true,
                    });
                }
            },
            None => output_future.await,
        };

        let output = output.map_err(|e| Error::spawn(program.to_string(), e.to_string()))?;

        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            timed_out: false,
        })
    }

    fn spawn(&self, program: &str, args: &[&str]) -> Result<Uuid> {
        self.supervisor.spawn(program, args)
    }

    async fn is_alive(&self, id: Uuid) -> bool {
        self.supervisor.is_alive(id).await
    }

    async fn terminate(&self, id: Uuid) -> bool {
        self.supervisor.terminate(id).await
    }

    async fn terminate_all(&self) -> usize {
        self.supervisor.terminate_all().await
    }
}
