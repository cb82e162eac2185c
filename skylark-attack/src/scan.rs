//! Network discovery and target selection

use crate::parser;
use skylark_core::{Error, Network, Result};
use skylark_session::{CancelToken, Session, ToolRunner};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Sort keys for the selection view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Power,
    Channel,
    Encryption,
    Essid,
}

/// Files a scan leaves behind
#[derive(Debug, Clone)]
pub struct ScanFiles {
    pub csv: PathBuf,
    pub cap: PathBuf,
}

fn scan_files(session: &Session) -> ScanFiles {
    let prefix = session.capture_prefix("scan");
    let prefix = prefix.to_string_lossy();
    // airodump-ng appends a run index to the prefix
    ScanFiles {
        csv: PathBuf::from(format!("{prefix}-01.csv")),
        cap: PathBuf::from(format!("{prefix}-01.cap")),
    }
}

/// Run a timed discovery scan on the session's monitor interface.
///
/// The scan file pair is tracked for teardown before the wait begins, so a
/// cancelled scan never orphans files. Results come back sorted by
/// descending power.
pub async fn scan(
    runner: &dyn ToolRunner,
    session: &Session,
    cancel: &CancelToken,
    duration: Duration,
    channel: Option<i32>,
) -> Result<Vec<Network>> {
    cancel.check("scan")?;

    let files = scan_files(session);
    session.track_artifact(files.csv.clone());
    session.track_artifact(files.cap.clone());

    let iface = session.active_interface();
    let prefix = files
        .csv
        .to_string_lossy()
        .trim_end_matches("-01.csv")
        .to_string();

    let mut args = vec![
        "-w".to_string(),
        prefix,
        "--output-format".to_string(),
        "pcap,csv".to_string(),
        "--write-interval".to_string(),
        "1".to_string(),
    ];
    if let Some(channel) = channel {
        args.push("--channel".to_string());
        args.push(channel.to_string());
    }
    args.push(iface.clone());
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

    info!(interface = %iface, seconds = duration.as_secs(), "starting discovery scan");
    let id = runner.spawn("airodump-ng", &arg_refs)?;

    let completed = cancel.sleep(duration).await;
    runner.terminate(id).await;
    if !completed {
        return Err(Error::Cancelled("scan".to_string()));
    }

    let mut networks = parser::parse_networks(&files.csv);
    if networks.is_empty() {
        warn!(path = %files.csv.display(), "scan produced no WPA-family networks");
    }
    // stable, so equal-power networks keep discovery order
    networks.sort_by_key(|n| std::cmp::Reverse(n.power));
    info!(count = networks.len(), "scan complete");
    Ok(networks)
}

/// Candidate list with re-sorting, destructive filters, and 1-based pick.
///
/// Filters narrow the list permanently; getting candidates back means
/// scanning again.
#[derive(Debug, Clone)]
pub struct SelectionView {
    networks: Vec<Network>,
}

impl SelectionView {
    /// Build a view, defaulting to strongest signal first
    pub fn new(mut networks: Vec<Network>) -> Self {
        networks.sort_by_key(|n| std::cmp::Reverse(n.power));
        Self { networks }
    }

    pub fn sort(&mut self, key: SortKey) {
        match key {
            SortKey::Power => self.networks.sort_by_key(|n| std::cmp::Reverse(n.power)),
            SortKey::Channel => self.networks.sort_by_key(|n| n.channel),
            SortKey::Encryption => {
                // strongest encryption first
                self.networks
                    .sort_by(|a, b| b.encryption.cmp(&a.encryption))
            }
            SortKey::Essid => self
                .networks
                .sort_by(|a, b| a.display_essid().to_lowercase().cmp(&b.display_essid().to_lowercase())),
        }
    }

    pub fn retain_wpa_only(&mut self) {
        self.networks.retain(|n| n.encryption.is_wpa_family());
    }

    pub fn retain_min_power(&mut self, min_power: i32) {
        self.networks.retain(|n| n.power >= min_power);
    }

    pub fn retain_channel(&mut self, channel: i32) {
        self.networks.retain(|n| n.channel == channel);
    }

    /// 1-based selection; 0 or out of range picks nothing
    pub fn select(&self, k: usize) -> Option<&Network> {
        if k == 0 {
            return None;
        }
        self.networks.get(k - 1)
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Network> {
        self.networks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptedRunner;
    use skylark_core::{AttackMode, Encryption, MacAddr};
    use skylark_session::ProcessSupervisor;
    use std::sync::Arc;

    fn net(bssid: &str, essid: &str, channel: i32, power: i32, enc: Encryption) -> Network {
        Network {
            bssid: bssid.parse::<MacAddr>().unwrap(),
            essid: essid.to_string(),
            channel,
            power,
            encryption: enc,
            clients: Vec::new(),
        }
    }

    fn candidates() -> Vec<Network> {
        vec![
            net("AA:00:00:00:00:01", "weak", 1, -80, Encryption::Wpa2),
            net("AA:00:00:00:00:02", "strong", 6, -40, Encryption::Wpa),
            net("AA:00:00:00:00:03", "mid", 11, -60, Encryption::Wpa3),
        ]
    }

    #[test]
    fn default_order_is_non_increasing_power() {
        let view = SelectionView::new(candidates());
        let powers: Vec<i32> = view.iter().map(|n| n.power).collect();
        assert_eq!(powers, vec![-40, -60, -80]);
        assert!(powers.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn select_is_one_based_and_zero_is_none() {
        let view = SelectionView::new(candidates());
        assert_eq!(view.select(1).unwrap().essid, "strong");
        assert_eq!(view.select(3).unwrap().essid, "weak");
        assert!(view.select(0).is_none());
        assert!(view.select(4).is_none());
    }

    #[test]
    fn filters_are_destructive() {
        let mut view = SelectionView::new(candidates());
        view.retain_min_power(-70);
        assert_eq!(view.len(), 2);
        view.retain_channel(6);
        assert_eq!(view.len(), 1);
        assert_eq!(view.select(1).unwrap().essid, "strong");
        // narrowing is permanent
        view.retain_channel(11);
        assert!(view.is_empty());
    }

    #[test]
    fn sort_by_encryption_puts_strongest_first() {
        let mut view = SelectionView::new(candidates());
        view.sort(SortKey::Encryption);
        assert_eq!(view.select(1).unwrap().encryption, Encryption::Wpa3);
        assert_eq!(view.select(3).unwrap().encryption, Encryption::Wpa);
    }

    #[tokio::test]
    async fn scan_tracks_files_terminates_tool_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(
            "wlan0mon",
            AttackMode::Scan,
            dir.path(),
            Duration::ZERO,
            Arc::new(ProcessSupervisor::new()),
        )
        .unwrap();
        let runner = ScriptedRunner::new();
        runner.on_spawn("airodump-ng", |args| {
            // write the record file where the tool was pointed
            let prefix = args
                .iter()
                .position(|a| a == "-w")
                .map(|i| args[i + 1].clone())
                .unwrap();
            let csv = "\
BSSID, First time seen, Last time seen, channel, Speed, Privacy, Cipher, Authentication, Power, # beacons, # IV, LAN IP, ID-length, ESSID, Key\n\
AA:00:00:00:00:01, t, t,  1, 54, WPA2, CCMP, PSK, -80, 1, 0, ip, 4, weak, \n\
AA:00:00:00:00:02, t, t,  6, 54, WPA2, CCMP, PSK, -40, 1, 0, ip, 6, strong, \n";
            std::fs::write(format!("{prefix}-01.csv"), csv).unwrap();
        });

        let cancel = CancelToken::new();
        let networks = scan(&runner, &session, &cancel, Duration::from_millis(10), None)
            .await
            .unwrap();

        assert_eq!(networks.len(), 2);
        assert_eq!(networks[0].essid, "strong");
        assert_eq!(runner.live_count(), 0);
        assert_eq!(session.artifacts().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_scan_stops_tool_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(
            "wlan0mon",
            AttackMode::Scan,
            dir.path(),
            Duration::ZERO,
            Arc::new(ProcessSupervisor::new()),
        )
        .unwrap();
        let runner = ScriptedRunner::new();
        let cancel = CancelToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let err = scan(&runner, &session, &cancel, Duration::from_secs(30), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
        // the capture tool was stopped on the way out
        assert_eq!(runner.live_count(), 0);
        // files were tracked before the wait, so teardown can remove them
        assert_eq!(session.artifacts().len(), 2);
    }
}
