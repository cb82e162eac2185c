//! Session state
//!
//! One `Session` exists per engine run. It owns the process supervisor, the
//! cancellation token, and everything teardown needs to put the machine back
//! the way it found it.

use crate::cancel::CancelToken;
use crate::supervisor::ProcessSupervisor;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use skylark_core::{AttackMode, Network, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub struct Session {
    pub id: Uuid,
    pub mode: AttackMode,
    pub started_at: DateTime<Utc>,
    pub output_dir: PathBuf,
    /// Settle delay between interface mode steps
    pub settle: Duration,
    base_interface: String,
    monitor_interface: Mutex<Option<String>>,
    stopped_services: Mutex<Vec<String>>,
    /// Temp files to remove during teardown. Capture artifacts worth keeping
    /// are never tracked here.
    artifacts: Mutex<Vec<PathBuf>>,
    target: Mutex<Option<Network>>,
    supervisor: Arc<ProcessSupervisor>,
    cancel: CancelToken,
    torn_down: AtomicBool,
}

impl Session {
    /// The supervisor is shared with the tool runner so that every spawned
    /// process, whoever started it, is visible to teardown.
    pub fn new(
        interface: &str,
        mode: AttackMode,
        output_dir: &Path,
        settle: Duration,
        supervisor: Arc<ProcessSupervisor>,
    ) -> Result<Self> {
        std::fs::create_dir_all(output_dir)?;
        Ok(Self {
            id: Uuid::now_v7(),
            mode,
            started_at: Utc::now(),
            output_dir: output_dir.to_path_buf(),
            settle,
            base_interface: interface.to_string(),
            monitor_interface: Mutex::new(None),
            stopped_services: Mutex::new(Vec::new()),
            artifacts: Mutex::new(Vec::new()),
            target: Mutex::new(None),
            supervisor,
            cancel: CancelToken::new(),
            torn_down: AtomicBool::new(false),
        })
    }

    pub fn supervisor(&self) -> &Arc<ProcessSupervisor> {
        &self.supervisor
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn base_interface(&self) -> &str {
        &self.base_interface
    }

    /// Interface to run capture tools on: the monitor name when one was
    /// established, otherwise the base name.
    pub fn active_interface(&self) -> String {
        self.monitor_interface
            .lock()
            .clone()
            .unwrap_or_else(|| self.base_interface.clone())
    }

    pub fn set_monitor_interface(&self, name: String) {
        *self.monitor_interface.lock() = Some(name);
    }

    pub fn monitor_interface(&self) -> Option<String> {
        self.monitor_interface.lock().clone()
    }

    pub fn record_stopped_services(&self, services: Vec<String>) {
        self.stopped_services.lock().extend(services);
    }

    pub fn stopped_services(&self) -> Vec<String> {
        self.stopped_services.lock().clone()
    }

    pub fn set_target(&self, target: Network) {
        *self.target.lock() = Some(target);
    }

    pub fn target(&self) -> Option<Network> {
        self.target.lock().clone()
    }

    /// Register a temp file for teardown removal. Call before any suspension
    /// point that could observe cancellation, so nothing is orphaned.
    pub fn track_artifact(&self, path: PathBuf) {
        self.artifacts.lock().push(path);
    }

    /// Remove a file from the teardown list, keeping it on disk
    pub fn preserve_artifact(&self, path: &Path) {
        self.artifacts.lock().retain(|p| p != path);
    }

    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.artifacts.lock().clone()
    }

    /// Timestamped path prefix for capture files, scoped to this session
    pub fn capture_prefix(&self, label: &str) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        self.output_dir.join(format!("{label}_{stamp}"))
    }

    /// Claim teardown. True exactly once per session.
    pub(crate) fn begin_teardown(&self) -> bool {
        !self.torn_down.swap(true, Ordering::SeqCst)
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(dir: &Path) -> Session {
        Session::new(
            "wlan0",
            AttackMode::Handshake,
            dir,
            Duration::ZERO,
            Arc::new(ProcessSupervisor::new()),
        )
        .unwrap()
    }

    #[test]
    fn active_interface_follows_rename() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path());
        assert_eq!(s.active_interface(), "wlan0");
        s.set_monitor_interface("wlan0mon".to_string());
        assert_eq!(s.active_interface(), "wlan0mon");
        assert_eq!(s.base_interface(), "wlan0");
    }

    #[test]
    fn preserve_removes_from_teardown_list() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path());
        let keep = dir.path().join("keep.cap");
        let toss = dir.path().join("toss.csv");
        s.track_artifact(keep.clone());
        s.track_artifact(toss.clone());
        s.preserve_artifact(&keep);
        assert_eq!(s.artifacts(), vec![toss]);
    }

    #[test]
    fn teardown_claim_is_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path());
        assert!(s.begin_teardown());
        assert!(!s.begin_teardown());
        assert!(s.is_torn_down());
    }

    #[test]
    fn capture_prefix_lives_under_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path());
        let prefix = s.capture_prefix("HomeNet");
        assert!(prefix.starts_with(dir.path()));
        assert!(prefix
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("HomeNet_"));
    }
}
