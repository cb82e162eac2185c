//! Background process supervision
//!
//! Every external tool Skylark starts in the background is placed in its own
//! process group and tracked here, so that teardown can stop the whole group
//! (airodump-ng and friends fork helpers) and so that no capture tool can
//! outlive the session.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use skylark_core::{Error, Result};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Grace period after SIGTERM before escalating
const TERM_GRACE: Duration = Duration::from_secs(5);
/// Wait after SIGKILL for the kernel to reap
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Lifecycle state of a supervised process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Terminated,
    Killed,
}

/// Snapshot of a supervised process
#[derive(Debug, Clone)]
pub struct ManagedProcess {
    pub id: Uuid,
    pub tool: String,
    pub args: Vec<String>,
    pub pid: u32,
    pub state: ProcessState,
    pub started_at: DateTime<Utc>,
}

struct TrackedProcess {
    id: Uuid,
    tool: String,
    args: Vec<String>,
    pid: u32,
    started_at: DateTime<Utc>,
    state: Mutex<ProcessState>,
    // Held only across short try_wait/wait windows
    child: tokio::sync::Mutex<Option<Child>>,
}

impl TrackedProcess {
    async fn is_alive(&self) -> bool {
        let mut guard = self.child.lock().await;
        let Some(child) = guard.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) => {
                *self.state.lock() = ProcessState::Terminated;
                *guard = None;
                false
            }
            Err(_) => false,
        }
    }

    /// Stop the process group. Returns true only when a live process was
    /// actually brought down by this call.
    async fn stop(&self) -> bool {
        if *self.state.lock() != ProcessState::Running {
            return false;
        }

        let mut guard = self.child.lock().await;
        let Some(child) = guard.as_mut() else {
            return false;
        };

        // Already exited on its own
        if let Ok(Some(_)) = child.try_wait() {
            *self.state.lock() = ProcessState::Terminated;
            *guard = None;
            return false;
        }

        let pgid = Pid::from_raw(self.pid as i32);
        if let Err(e) = killpg(pgid, Signal::SIGTERM) {
            debug!(id = %self.id, tool = %self.tool, error = %e, "SIGTERM to process group failed");
        }

        match timeout(TERM_GRACE, child.wait()).await {
            Ok(_) => {
                *self.state.lock() = ProcessState::Terminated;
                debug!(id = %self.id, tool = %self.tool, "process terminated");
            }
            Err(_) => {
                warn!(id = %self.id, tool = %self.tool, "process ignored SIGTERM, escalating");
                if let Err(e) = killpg(pgid, Signal::SIGKILL) {
                    debug!(id = %self.id, error = %e, "SIGKILL to process group failed");
                }
                let _ = timeout(KILL_GRACE, child.wait()).await;
                *self.state.lock() = ProcessState::Killed;
            }
        }

        *guard = None;
        true
    }
}

/// Tracks and terminates background tool processes
pub struct ProcessSupervisor {
    processes: Arc<DashMap<Uuid, Arc<TrackedProcess>>>,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self {
            processes: Arc::new(DashMap::new()),
        }
    }

    /// Spawn a background tool in its own process group and track it.
    ///
    /// The child is registered before this function returns, so a teardown
    /// racing with the spawn still sees it.
    pub fn spawn(&self, program: &str, args: &[&str]) -> Result<Uuid> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::spawn(program.to_string(), e.to_string()))?;

        let pid = child
            .id()
            .ok_or_else(|| Error::spawn(program.to_string(), "exited before pid read".to_string()))?;

        let id = Uuid::now_v7();
        let tracked = Arc::new(TrackedProcess {
            id,
            tool: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            pid,
            started_at: Utc::now(),
            state: Mutex::new(ProcessState::Running),
            child: tokio::sync::Mutex::new(Some(child)),
        });
        self.processes.insert(id, tracked);

        info!(id = %id, tool = %program, pid = pid, "spawned background process");
        Ok(id)
    }

    /// Whether a tracked process is still running
    pub async fn is_alive(&self, id: Uuid) -> bool {
        let tracked = match self.processes.get(&id) {
            Some(entry) => Arc::clone(entry.value()),
            None => return false,
        };
        tracked.is_alive().await
    }

    /// SIGTERM the process group, escalate to SIGKILL after a bounded grace
    /// wait. Idempotent; unknown or already-exited processes are a no-op.
    ///
    /// Returns true when a live process was actually stopped.
    pub async fn terminate(&self, id: Uuid) -> bool {
        let tracked = match self.processes.get(&id) {
            Some(entry) => Arc::clone(entry.value()),
            None => return false,
        };
        tracked.stop().await
    }

    /// Terminate every tracked process. Failures on individual processes are
    /// logged and skipped. Returns the number actually stopped.
    pub async fn terminate_all(&self) -> usize {
        let ids: Vec<Uuid> = self.processes.iter().map(|e| *e.key()).collect();
        let mut stopped = 0;
        for id in ids {
            if self.terminate(id).await {
                stopped += 1;
            }
        }
        if stopped > 0 {
            info!(count = stopped, "stopped background processes");
        }
        stopped
    }

    /// Snapshot of all tracked processes
    pub fn list(&self) -> Vec<ManagedProcess> {
        self.processes
            .iter()
            .map(|entry| {
                let t = entry.value();
                ManagedProcess {
                    id: t.id,
                    tool: t.tool.clone(),
                    args: t.args.clone(),
                    pid: t.pid,
                    state: *t.state.lock(),
                    started_at: t.started_at,
                }
            })
            .collect()
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}
