//! Access point and client station models

use crate::{Encryption, MacAddr};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder rendered for access points that do not broadcast an ESSID
pub const HIDDEN_ESSID: &str = "<hidden>";

/// A client station associated with an access point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub mac: MacAddr,
}

impl Client {
    pub fn new(mac: MacAddr) -> Self {
        Self { mac }
    }
}

/// An access point observed during discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Access point BSSID
    pub bssid: MacAddr,
    /// Broadcast name; empty when the AP hides its ESSID
    pub essid: String,
    /// Operating channel
    pub channel: i32,
    /// Signal power in dBm (more negative is weaker)
    pub power: i32,
    /// Encryption class
    pub encryption: Encryption,
    /// Known associated clients
    pub clients: Vec<Client>,
}

impl Network {
    /// ESSID for display, substituting a sentinel for hidden networks
    pub fn display_essid(&self) -> &str {
        if self.essid.is_empty() {
            HIDDEN_ESSID
        } else {
            &self.essid
        }
    }

    /// ESSID safe for use in file names
    pub fn file_essid(&self) -> String {
        if self.essid.is_empty() {
            return "hidden".to_string();
        }
        self.essid
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) ch {} {} dBm {}",
            self.display_essid(),
            self.bssid,
            self.channel,
            self.power,
            self.encryption
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Network {
        Network {
            bssid: "AA:BB:CC:DD:EE:FF".parse().unwrap(),
            essid: String::new(),
            channel: 6,
            power: -47,
            encryption: Encryption::Wpa2,
            clients: Vec::new(),
        }
    }

    #[test]
    fn hidden_essid_sentinel() {
        let net = sample();
        assert_eq!(net.display_essid(), HIDDEN_ESSID);
        assert_eq!(net.file_essid(), "hidden");
    }

    #[test]
    fn file_essid_sanitized() {
        let mut net = sample();
        net.essid = "Cafe Wifi/5G".to_string();
        assert_eq!(net.file_essid(), "Cafe_Wifi_5G");
    }
}
