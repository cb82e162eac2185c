//! Guaranteed session teardown
//!
//! Runs exactly once per session, in a fixed order: processes first (nothing
//! may hold the interface), then interface restore, then temp files, then
//! service restart. Every step is best effort; a failure is logged and the
//! remaining steps still run.

use crate::monitor;
use crate::runner::ToolRunner;
use crate::session::Session;
use chrono::Utc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

const CMD_TIMEOUT: Duration = Duration::from_secs(15);

/// What teardown did, for the end-of-run report
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub reason: String,
    pub duration_secs: i64,
    pub interface: String,
    pub target: Option<String>,
    pub processes_stopped: usize,
    pub artifacts_removed: usize,
    pub services_restarted: usize,
    /// False when this was a repeat call that did no work
    pub performed: bool,
}

/// Tear the session down. Safe to call from any state, any number of times;
/// only the first call does work.
pub async fn teardown(session: &Session, runner: &dyn ToolRunner, reason: &str) -> SessionSummary {
    let duration_secs = (Utc::now() - session.started_at).num_seconds();
    let target = session.target().map(|t| t.display_essid().to_string());

    if !session.begin_teardown() {
        return SessionSummary {
            session_id: session.id,
            reason: reason.to_string(),
            duration_secs,
            interface: session.base_interface().to_string(),
            target,
            processes_stopped: 0,
            artifacts_removed: 0,
            services_restarted: 0,
            performed: false,
        };
    }

    info!(session = %session.id, reason = %reason, "tearing down session");

    // 1. Stop every tracked process before touching the interface
    let processes_stopped = runner.terminate_all().await;

    // 2. Restore managed mode on whichever name the interface ended up with
    let restore_iface = session.active_interface();
    if let Err(e) = monitor::disable_monitor_mode(runner, &restore_iface, session.settle).await {
        warn!(interface = %restore_iface, error = %e, "could not restore managed mode");
    }
    if restore_iface != session.base_interface() {
        // airmon-ng renamed the interface; force the base name up too
        let _ = runner
            .run(
                "ip",
                &["link", "set", session.base_interface(), "up"],
                Some(CMD_TIMEOUT),
            )
            .await;
    }

    // 3. Remove temp artifacts, skipping any that resist
    let mut artifacts_removed = 0;
    for path in session.artifacts() {
        match std::fs::remove_file(&path) {
            Ok(()) => artifacts_removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "could not remove temp file"),
        }
    }

    // 4. Bring back the services stopped on the way in
    let services = session.stopped_services();
    monitor::restart_services(runner, &services).await;

    let summary = SessionSummary {
        session_id: session.id,
        reason: reason.to_string(),
        duration_secs,
        interface: session.base_interface().to_string(),
        target,
        processes_stopped,
        artifacts_removed,
        services_restarted: services.len(),
        performed: true,
    };

    info!(
        session = %session.id,
        duration_secs = summary.duration_secs,
        processes = summary.processes_stopped,
        artifacts = summary.artifacts_removed,
        "session closed"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::SystemRunner;
    use crate::supervisor::ProcessSupervisor;
    use skylark_core::AttackMode;
    use std::sync::Arc;

    fn harness(dir: &std::path::Path) -> (Session, SystemRunner) {
        let supervisor = Arc::new(ProcessSupervisor::new());
        let session = Session::new(
            "wlan0",
            AttackMode::Handshake,
            dir,
            Duration::ZERO,
            Arc::clone(&supervisor),
        )
        .unwrap();
        let runner = SystemRunner::new(supervisor);
        (session, runner)
    }

    #[tokio::test]
    async fn second_teardown_stops_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (session, runner) = harness(dir.path());
        session.supervisor().spawn("sleep", &["30"]).unwrap();
        session.supervisor().spawn("sleep", &["30"]).unwrap();

        let first = teardown(&session, &runner, "finished").await;
        assert!(first.performed);
        assert_eq!(first.processes_stopped, 2);

        let second = teardown(&session, &runner, "finished").await;
        assert!(!second.performed);
        assert_eq!(second.processes_stopped, 0);
    }

    #[tokio::test]
    async fn temp_artifacts_are_removed_and_kept_ones_survive() {
        let dir = tempfile::tempdir().unwrap();
        let (session, runner) = harness(dir.path());

        let temp = dir.path().join("scan.csv");
        let kept = dir.path().join("capture.cap");
        std::fs::write(&temp, "x").unwrap();
        std::fs::write(&kept, "x").unwrap();
        session.track_artifact(temp.clone());
        session.track_artifact(kept.clone());
        session.preserve_artifact(&kept);

        let summary = teardown(&session, &runner, "finished").await;
        assert_eq!(summary.artifacts_removed, 1);
        assert!(!temp.exists());
        assert!(kept.exists());
    }

    #[tokio::test]
    async fn empty_session_teardown_is_safe() {
        let dir = tempfile::tempdir().unwrap();
        let (session, runner) = harness(dir.path());
        let summary = teardown(&session, &runner, "cancelled").await;
        assert!(summary.performed);
        assert_eq!(summary.processes_stopped, 0);
        assert_eq!(summary.artifacts_removed, 0);
    }

    #[tokio::test]
    async fn missing_temp_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (session, runner) = harness(dir.path());
        session.track_artifact(dir.path().join("never-created.csv"));
        let summary = teardown(&session, &runner, "finished").await;
        assert_eq!(summary.artifacts_removed, 0);
    }
}
