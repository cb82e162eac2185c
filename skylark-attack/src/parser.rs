//! airodump-ng record file parsing
//!
//! The record file has two comma-separated sections: access points, then a
//! client section introduced by a `Station MAC` header. Capture tools get
//! killed mid-write, so parsing is tolerant by construction: bytes are
//! decoded lossily and any row that does not parse is skipped. A malformed
//! file yields an empty list, never an error.

use skylark_core::{Client, Encryption, MacAddr, Network};
use std::path::Path;
use tracing::debug;

/// Minimum comma-separated fields in an access point row
const AP_MIN_FIELDS: usize = 14;
/// Minimum comma-separated fields in a client row
const CLIENT_MIN_FIELDS: usize = 6;

const F_BSSID: usize = 0;
const F_CHANNEL: usize = 3;
const F_PRIVACY: usize = 5;
const F_POWER: usize = 8;
const F_ESSID: usize = 13;
const F_CLIENT_BSSID: usize = 5;

/// Parse the access point section.
///
/// Only WPA-family rows are returned; open, WEP, and unparseable rows are
/// dropped. Hidden ESSIDs stay empty in the model.
pub fn parse_networks(path: &Path) -> Vec<Network> {
    let Ok(raw) = std::fs::read(path) else {
        debug!(path = %path.display(), "record file unreadable");
        return Vec::new();
    };
    let text = String::from_utf8_lossy(&raw);

    let mut networks = Vec::new();
    for line in text.lines() {
        if line.contains("Station MAC") {
            break;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < AP_MIN_FIELDS {
            continue;
        }
        let Ok(bssid) = fields[F_BSSID].trim().parse::<MacAddr>() else {
            continue;
        };
        let Ok(channel) = fields[F_CHANNEL].trim().parse::<i32>() else {
            continue;
        };
        let Ok(power) = fields[F_POWER].trim().parse::<i32>() else {
            continue;
        };
        let encryption = Encryption::from_privacy_field(fields[F_PRIVACY].trim());
        if !encryption.is_wpa_family() {
            continue;
        }
        let essid = fields[F_ESSID].trim().to_string();

        networks.push(Network {
            bssid,
            essid,
            channel,
            power,
            encryption,
            clients: Vec::new(),
        });
    }
    networks
}

/// Parse the client section, keeping only stations associated with `bssid`.
///
/// File order is preserved and duplicates are kept; callers that deauth per
/// client want exactly what the capture tool saw.
pub fn parse_clients(path: &Path, bssid: &MacAddr) -> Vec<MacAddr> {
    let Ok(raw) = std::fs::read(path) else {
        return Vec::new();
    };
    let text = String::from_utf8_lossy(&raw);

    let mut in_clients = false;
    let mut clients = Vec::new();
    for line in text.lines() {
        if line.contains("Station MAC") {
            in_clients = true;
            continue;
        }
        if !in_clients {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < CLIENT_MIN_FIELDS {
            continue;
        }
        let Ok(associated) = fields[F_CLIENT_BSSID].trim().parse::<MacAddr>() else {
            // unassociated stations carry "(not associated)" here
            continue;
        };
        if associated != *bssid {
            continue;
        }
        if let Ok(station) = fields[0].trim().parse::<MacAddr>() {
            clients.push(station);
        }
    }
    clients
}

/// Convenience: attach parsed clients to a network in place
pub fn refresh_clients(path: &Path, network: &mut Network) {
    network.clients = parse_clients(path, &network.bssid)
        .into_iter()
        .map(Client::new)
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
BSSID, First time seen, Last time seen, channel, Speed, Privacy, Cipher, Authentication, Power, # beacons, # IV, LAN IP, ID-length, ESSID, Key\r\n\
AA:BB:CC:DD:EE:FF, 2026-08-23 10:00:00, 2026-08-23 10:00:30,  6,  130, WPA2, CCMP, PSK, -45,  100,  12,  0.  0.  0.  0,   4, Home, \r\n\
DE:AD:BE:EF:00:01, 2026-08-23 10:00:02, 2026-08-23 10:00:28, 11,   54, OPN,     ,    , -60,   40,   0,  0.  0.  0.  0,   8, CoffeeAP, \r\n\
DE:AD:BE:EF:00:02, 2026-08-23 10:00:03, 2026-08-23 10:00:29,  1,   54, WEP, WEP,    , -70,   20,   5,  0.  0.  0.  0,   6, OldNet, \r\n\
DE:AD:BE:EF:00:03, 2026-08-23 10:00:04, 2026-08-23 10:00:27, 36,  866, WPA3 WPA2, CCMP, SAE, -52,   80,   0,  0.  0.  0.  0,   0, , \r\n\
garbage line that should be skipped\r\n\
\r\n\
Station MAC, First time seen, Last time seen, Power, # packets, BSSID, Probed ESSIDs\r\n\
11:22:33:44:55:66, 2026-08-23 10:00:05, 2026-08-23 10:00:25, -50,  120, AA:BB:CC:DD:EE:FF, Home\r\n\
77:88:99:AA:BB:CC, 2026-08-23 10:00:06, 2026-08-23 10:00:26, -55,   30, (not associated), \r\n\
DD:EE:FF:00:11:22, 2026-08-23 10:00:07, 2026-08-23 10:00:24, -61,   10, DE:AD:BE:EF:00:03, \r\n\
11:22:33:44:55:66, 2026-08-23 10:00:08, 2026-08-23 10:00:27, -49,   44, AA:BB:CC:DD:EE:FF, Home\r\n";

    fn write_sample(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("scan-01.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn only_wpa_family_rows_survive() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, SAMPLE);
        let networks = parse_networks(&path);
        assert_eq!(networks.len(), 2);
        assert!(networks.iter().all(|n| n.encryption.is_wpa_family()));
    }

    #[test]
    fn example_row_parses_exactly() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, SAMPLE);
        let networks = parse_networks(&path);
        let home = &networks[0];
        assert_eq!(home.bssid, "AA:BB:CC:DD:EE:FF".parse().unwrap());
        assert_eq!(home.channel, 6);
        assert_eq!(home.power, -45);
        assert_eq!(home.encryption, Encryption::Wpa2);
        assert_eq!(home.essid, "Home");
    }

    #[test]
    fn hidden_essid_stays_empty() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, SAMPLE);
        let networks = parse_networks(&path);
        let hidden = networks.iter().find(|n| n.channel == 36).unwrap();
        assert_eq!(hidden.essid, "");
        assert_eq!(hidden.encryption, Encryption::Wpa3);
        assert_eq!(hidden.display_essid(), skylark_core::HIDDEN_ESSID);
    }

    #[test]
    fn clients_filtered_by_bssid_in_file_order_with_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, SAMPLE);
        let bssid: MacAddr = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let clients = parse_clients(&path, &bssid);
        let station: MacAddr = "11:22:33:44:55:66".parse().unwrap();
        assert_eq!(clients, vec![station, station]);
    }

    #[test]
    fn unassociated_stations_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, SAMPLE);
        let other: MacAddr = "DE:AD:BE:EF:00:03".parse().unwrap();
        let clients = parse_clients(&path, &other);
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0], "DD:EE:FF:00:11:22".parse().unwrap());
    }

    #[test]
    fn malformed_file_yields_empty_not_error() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, "complete nonsense\nwith, a, few, commas\n");
        assert!(parse_networks(&path).is_empty());
        let bssid: MacAddr = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert!(parse_clients(&path, &bssid).is_empty());
    }

    #[test]
    fn missing_file_yields_empty() {
        let path = Path::new("/nonexistent/scan-01.csv");
        assert!(parse_networks(path).is_empty());
    }

    #[test]
    fn truncated_mid_row_is_tolerated() {
        let dir = TempDir::new().unwrap();
        // tool killed mid-write: last row cut short of the field minimum
        let truncated = format!("{SAMPLE}FF:FF:00:00:11:22, 2026-08-23 10:00:09");
        let path = write_sample(&dir, &truncated);
        let bssid: MacAddr = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(parse_clients(&path, &bssid).len(), 2);
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan-01.csv");
        let mut bytes = SAMPLE.as_bytes().to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, 0x00]);
        std::fs::write(&path, &bytes).unwrap();
        assert_eq!(parse_networks(&path).len(), 2);
    }
}
