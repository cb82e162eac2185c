//! Interface mode management
//!
//! Monitor mode is entered through an ordered chain of methods (iw, iwconfig,
//! airmon-ng), each followed by the same external verification. The recorded
//! mode is never assumed from a command having exited zero; only the verify
//! step counts.

use crate::runner::ToolRunner;
use skylark_core::iface::is_wireless_name;
use skylark_core::{Error, InterfaceMode, Result, WirelessInterface};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bound on every foreground mode-management command
const CMD_TIMEOUT: Duration = Duration::from_secs(15);

/// Services that grab wireless interfaces back while we work
const INTERFERING_SERVICES: &[&str] = &["NetworkManager", "wpa_supplicant", "dhclient", "dhcpcd"];

/// Result of a successful transition into monitor mode
#[derive(Debug, Clone)]
pub struct MonitorTransition {
    /// Final interface name; airmon-ng may have renamed it
    pub monitor_interface: String,
    /// Services stopped on the way in, to restart during teardown
    pub stopped_services: Vec<String>,
}

/// Check the live mode of an interface by asking iwconfig
pub async fn verify_monitor(runner: &dyn ToolRunner, iface: &str) -> bool {
    match runner.run("iwconfig", &[iface], Some(CMD_TIMEOUT)).await {
        Ok(out) => {
            let text = format!("{}{}", out.stdout, out.stderr).to_lowercase();
            out.code == 0 && text.contains("monitor")
        }
        Err(_) => false,
    }
}

/// Fail fast when the phy does not advertise monitor mode.
///
/// An unparseable wiphy index is treated as unknown and lets the method
/// chain decide.
async fn check_capability(runner: &dyn ToolRunner, iface: &str) -> Result<()> {
    let info = runner
        .run("iw", &["dev", iface, "info"], Some(CMD_TIMEOUT))
        .await?;
    if info.code != 0 {
        return Err(Error::InterfaceNotFound(iface.to_string()));
    }

    let wiphy = info
        .stdout
        .lines()
        .find_map(|line| {
            let line = line.trim();
            line.strip_prefix("wiphy ")
                .and_then(|rest| rest.trim().parse::<u32>().ok())
        });
    let Some(wiphy) = wiphy else {
        debug!(interface = %iface, "wiphy index not found, skipping capability check");
        return Ok(());
    };

    let phy = format!("phy{wiphy}");
    let phy_info = runner
        .run("iw", &["phy", &phy, "info"], Some(CMD_TIMEOUT))
        .await?;
    if phy_info.code == 0 && !phy_info.stdout.to_lowercase().contains("monitor") {
        return Err(Error::capability(
            iface.to_string(),
            format!("{phy} does not support monitor mode"),
        ));
    }
    Ok(())
}

/// Stop services known to flip interfaces back to managed mode.
///
/// Only services that were actually active are recorded for restart.
async fn stop_interfering_services(runner: &dyn ToolRunner) -> Vec<String> {
    let mut stopped = Vec::new();
    for service in INTERFERING_SERVICES {
        let active = runner
            .run("systemctl", &["is-active", service], Some(CMD_TIMEOUT))
            .await
            .map(|out| out.code == 0)
            .unwrap_or(false);
        if !active {
            continue;
        }
        match runner
            .run("systemctl", &["stop", service], Some(CMD_TIMEOUT))
            .await
        {
            Ok(out) if out.code == 0 => {
                info!(service = %service, "stopped interfering service");
                stopped.push(service.to_string());
            }
            Ok(_) | Err(_) => {
                debug!(service = %service, "could not stop service");
            }
        }
    }
    // airmon-ng sweeps up anything systemctl missed
    let _ = runner
        .run("airmon-ng", &["check", "kill"], Some(CMD_TIMEOUT))
        .await;
    stopped
}

/// Restart services stopped during monitor-mode entry. Best effort.
pub async fn restart_services(runner: &dyn ToolRunner, services: &[String]) {
    for service in services {
        match runner
            .run("systemctl", &["start", service], Some(CMD_TIMEOUT))
            .await
        {
            Ok(out) if out.code == 0 => info!(service = %service, "restarted service"),
            Ok(_) | Err(_) => warn!(service = %service, "failed to restart service"),
        }
    }
}

async fn link_down_up(runner: &dyn ToolRunner, iface: &str, state: &str) {
    let _ = runner
        .run("ip", &["link", "set", iface, state], Some(CMD_TIMEOUT))
        .await;
}

/// One strategy in the mode-change fallback chain. All strategies share the
/// same verify step; only the command they issue differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModeMethod {
    Iw,
    Iwconfig,
    Airmon,
}

const METHOD_CHAIN: &[ModeMethod] = &[ModeMethod::Iw, ModeMethod::Iwconfig, ModeMethod::Airmon];

impl ModeMethod {
    fn name(&self) -> &'static str {
        match self {
            ModeMethod::Iw => "iw",
            ModeMethod::Iwconfig => "iwconfig",
            ModeMethod::Airmon => "airmon-ng",
        }
    }

    /// Issue the mode change and return the interface names the verify step
    /// should probe; airmon-ng may rename the interface.
    async fn apply(
        &self,
        runner: &dyn ToolRunner,
        iface: &str,
        monitor: bool,
    ) -> Vec<String> {
        match self {
            ModeMethod::Iw => {
                let ty = if monitor { "monitor" } else { "managed" };
                link_down_up(runner, iface, "down").await;
                let _ = runner
                    .run("iw", &["dev", iface, "set", "type", ty], Some(CMD_TIMEOUT))
                    .await;
                link_down_up(runner, iface, "up").await;
                vec![iface.to_string()]
            }
            ModeMethod::Iwconfig => {
                let mode = if monitor { "monitor" } else { "managed" };
                link_down_up(runner, iface, "down").await;
                let _ = runner
                    .run("iwconfig", &[iface, "mode", mode], Some(CMD_TIMEOUT))
                    .await;
                link_down_up(runner, iface, "up").await;
                vec![iface.to_string()]
            }
            ModeMethod::Airmon => {
                let action = if monitor { "start" } else { "stop" };
                let _ = runner
                    .run("airmon-ng", &[action, iface], Some(CMD_TIMEOUT))
                    .await;
                if monitor {
                    vec![format!("{iface}mon"), "mon0".to_string(), iface.to_string()]
                } else {
                    // stopping strips a "mon" suffix when one was added
                    let base = iface.strip_suffix("mon").unwrap_or(iface);
                    vec![base.to_string(), iface.to_string()]
                }
            }
        }
    }
}

/// Put an interface into monitor mode.
///
/// Fast path first, then the ordered strategy chain with a shared verify
/// step, short-circuiting on the first verified success. Returns the
/// verified monitor interface name (airmon-ng may have renamed it) and the
/// services stopped along the way.
pub async fn enable_monitor_mode(
    runner: &dyn ToolRunner,
    iface: &str,
    settle: Duration,
) -> Result<MonitorTransition> {
    if verify_monitor(runner, iface).await {
        debug!(interface = %iface, "already in monitor mode");
        return Ok(MonitorTransition {
            monitor_interface: iface.to_string(),
            stopped_services: Vec::new(),
        });
    }

    check_capability(runner, iface).await?;
    let stopped_services = stop_interfering_services(runner).await;

    for method in METHOD_CHAIN {
        let candidates = method.apply(runner, iface, true).await;
        tokio::time::sleep(settle).await;
        for candidate in &candidates {
            if verify_monitor(runner, candidate).await {
                info!(
                    interface = %iface,
                    monitor = %candidate,
                    method = method.name(),
                    "monitor mode enabled"
                );
                return Ok(MonitorTransition {
                    monitor_interface: candidate.clone(),
                    stopped_services,
                });
            }
        }
    }

    Err(Error::mode_transition(
        iface.to_string(),
        "all monitor mode methods exhausted".to_string(),
    ))
}

/// Return an interface to managed mode.
///
/// Mirrors the enable chain and always forces the link up afterwards, even
/// when every method failed.
pub async fn disable_monitor_mode(
    runner: &dyn ToolRunner,
    iface: &str,
    settle: Duration,
) -> Result<()> {
    let mut restored = !verify_monitor(runner, iface).await;

    for method in METHOD_CHAIN {
        if restored {
            break;
        }
        method.apply(runner, iface, false).await;
        tokio::time::sleep(settle).await;
        restored = !verify_monitor(runner, iface).await;
    }

    // The link comes back up no matter what happened above
    link_down_up(runner, iface, "up").await;

    if restored {
        info!(interface = %iface, "managed mode restored");
        Ok(())
    } else {
        Err(Error::mode_transition(
            iface.to_string(),
            "could not restore managed mode".to_string(),
        ))
    }
}

/// Enumerate wireless interfaces confirmed by an `iw dev <if> info` query
pub async fn detect_wireless_interfaces(runner: &dyn ToolRunner) -> Vec<WirelessInterface> {
    let mut confirmed = Vec::new();
    for mut candidate in WirelessInterface::list_candidates() {
        let info = match runner
            .run("iw", &["dev", &candidate.name, "info"], Some(CMD_TIMEOUT))
            .await
        {
            Ok(out) if out.code == 0 => out,
            _ => continue,
        };
        let text = info.stdout.to_lowercase();
        if text.contains("type monitor") {
            candidate.mode = InterfaceMode::Monitor;
        }
        candidate.supports_monitor = check_capability(runner, &candidate.name).await.is_ok();
        confirmed.push(candidate);
    }
    debug_assert!(confirmed.iter().all(|i| is_wireless_name(&i.name)));
    confirmed
}
