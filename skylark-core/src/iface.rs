//! Wireless interface model and enumeration helpers

use crate::{Error, MacAddr, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Operating mode of a wireless interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterfaceMode {
    Managed,
    Monitor,
}

impl fmt::Display for InterfaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceMode::Managed => write!(f, "managed"),
            InterfaceMode::Monitor => write!(f, "monitor"),
        }
    }
}

/// A wireless network interface
///
/// `mode` reflects the last externally verified state, never an assumption
/// made after issuing a mode-change command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirelessInterface {
    /// Interface name (e.g., "wlan0", "wlp3s0")
    pub name: String,
    /// MAC address
    pub mac_address: MacAddr,
    /// Verified operating mode
    pub mode: InterfaceMode,
    /// Kernel driver name, when readable from sysfs
    pub driver: Option<String>,
    /// Whether the underlying phy advertises monitor mode
    pub supports_monitor: bool,
}

impl WirelessInterface {
    /// Look up an interface by name via the datalink layer.
    ///
    /// Mode starts as `Managed`; callers verify and update it through the
    /// session layer.
    pub fn by_name(name: &str) -> Result<Self> {
        let interfaces = pnet_datalink::interfaces();
        let iface = interfaces
            .into_iter()
            .find(|i| i.name == name)
            .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))?;

        let mac_bytes = if let Some(mac) = iface.mac {
            [mac.0, mac.1, mac.2, mac.3, mac.4, mac.5]
        } else {
            [0, 0, 0, 0, 0, 0]
        };

        Ok(Self {
            name: iface.name,
            mac_address: MacAddr(mac_bytes),
            mode: InterfaceMode::Managed,
            driver: read_driver(name),
            supports_monitor: false,
        })
    }

    /// Enumerate interfaces whose names look like wireless NICs.
    ///
    /// This is a pre-filter only; confirmation requires an `iw <if> info`
    /// query, which lives in the session layer next to the other tool calls.
    pub fn list_candidates() -> Vec<Self> {
        pnet_datalink::interfaces()
            .into_iter()
            .filter(|i| is_wireless_name(&i.name))
            .map(|iface| {
                let mac_bytes = if let Some(mac) = iface.mac {
                    [mac.0, mac.1, mac.2, mac.3, mac.4, mac.5]
                } else {
                    [0, 0, 0, 0, 0, 0]
                };
                let driver = read_driver(&iface.name);
                Self {
                    name: iface.name,
                    mac_address: MacAddr(mac_bytes),
                    mode: InterfaceMode::Managed,
                    driver,
                    supports_monitor: false,
                }
            })
            .collect()
    }
}

impl fmt::Display for WirelessInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) [{}]", self.name, self.mac_address, self.mode)?;
        if let Some(driver) = &self.driver {
            write!(f, " driver={driver}")?;
        }
        Ok(())
    }
}

/// Heuristic match on conventional wireless interface naming
pub fn is_wireless_name(name: &str) -> bool {
    name.starts_with("wlan")
        || name.starts_with("wlp")
        || name.starts_with("wlx")
        || name.starts_with("ath")
        || name.starts_with("ra")
        || name.ends_with("mon")
}

/// Read the kernel driver name from sysfs, if available
pub fn read_driver(name: &str) -> Option<String> {
    let link = Path::new("/sys/class/net")
        .join(name)
        .join("device/driver");
    let target = std::fs::read_link(link).ok()?;
    target
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
}
