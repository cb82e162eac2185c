//! Common types used throughout Skylark

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// MAC Address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Create a new MAC address
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Broadcast MAC address (ff:ff:ff:ff:ff:ff)
    pub const fn broadcast() -> Self {
        Self([0xff, 0xff, 0xff, 0xff, 0xff, 0xff])
    }

    /// Zero MAC address (00:00:00:00:00:00)
    pub const fn zero() -> Self {
        Self([0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
    }

    /// Get bytes as slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to array
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 6 {
            return Err(crate::Error::Parse(format!(
                "invalid MAC address format: {s}"
            )));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = u8::from_str_radix(part, 16)
                .map_err(|_| crate::Error::Parse(format!("invalid MAC address hex: {s}")))?;
        }

        Ok(MacAddr(bytes))
    }
}

/// Encryption class of an access point.
///
/// Ordered weakest to strongest, so `Ord` can rank candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Encryption {
    Open,
    Wep,
    Wpa,
    Wpa2,
    Wpa3,
}

impl Encryption {
    /// Classify an airodump-ng privacy field (e.g. "WPA2 WPA", "OPN").
    ///
    /// Mixed-mode fields classify as the strongest generation present.
    pub fn from_privacy_field(field: &str) -> Self {
        let upper = field.to_uppercase();
        if upper.contains("WPA3") {
            Encryption::Wpa3
        } else if upper.contains("WPA2") {
            Encryption::Wpa2
        } else if upper.contains("WPA") {
            Encryption::Wpa
        } else if upper.contains("WEP") {
            Encryption::Wep
        } else {
            Encryption::Open
        }
    }

    /// WPA-family networks are the only valid capture targets
    pub fn is_wpa_family(&self) -> bool {
        matches!(self, Encryption::Wpa | Encryption::Wpa2 | Encryption::Wpa3)
    }
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Encryption::Open => "OPN",
            Encryption::Wep => "WEP",
            Encryption::Wpa => "WPA",
            Encryption::Wpa2 => "WPA2",
            Encryption::Wpa3 => "WPA3",
        };
        write!(f, "{s}")
    }
}

/// Attack modes supported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackMode {
    Handshake,
    Pmkid,
    WpsPin,
    WpsPixie,
    Scan,
}

impl AttackMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            AttackMode::Handshake => "Handshake Capture",
            AttackMode::Pmkid => "PMKID Capture",
            AttackMode::WpsPin => "WPS PIN Bruteforce",
            AttackMode::WpsPixie => "WPS Pixie Dust",
            AttackMode::Scan => "Network Scan",
        }
    }
}

impl fmt::Display for AttackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_roundtrip() {
        let mac: MacAddr = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        assert_eq!(mac.to_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn mac_rejects_short() {
        assert!("aa:bb:cc".parse::<MacAddr>().is_err());
        assert!("zz:bb:cc:dd:ee:ff".parse::<MacAddr>().is_err());
    }

    #[test]
    fn encryption_classification() {
        assert_eq!(Encryption::from_privacy_field("WPA2"), Encryption::Wpa2);
        assert_eq!(
            Encryption::from_privacy_field("WPA2 WPA"),
            Encryption::Wpa2
        );
        assert_eq!(Encryption::from_privacy_field("WPA3 WPA2"), Encryption::Wpa3);
        assert_eq!(Encryption::from_privacy_field("WEP"), Encryption::Wep);
        assert_eq!(Encryption::from_privacy_field("OPN"), Encryption::Open);
    }

    #[test]
    fn wpa_family_membership() {
        assert!(Encryption::Wpa.is_wpa_family());
        assert!(Encryption::Wpa3.is_wpa_family());
        assert!(!Encryption::Wep.is_wpa_family());
        assert!(!Encryption::Open.is_wpa_family());
    }
}
