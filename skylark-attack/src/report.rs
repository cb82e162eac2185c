//! Structured capture reports

use chrono::{DateTime, Utc};
use serde::Serialize;
use skylark_core::{Error, Network, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// What the verification step found in the capture file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeQuality {
    /// Full 4-way exchange present
    Complete,
    /// Clientless material usable for offline cracking
    Pmkid,
    NotFound,
}

/// Record of a successful capture, serialized next to the artifact
#[derive(Debug, Clone, Serialize)]
pub struct CaptureReport {
    pub session_id: Uuid,
    pub essid: String,
    pub bssid: String,
    pub channel: i32,
    pub encryption: String,
    pub quality: HandshakeQuality,
    pub capture_file: PathBuf,
    pub capture_size: u64,
    pub rounds_used: u32,
    pub duration_secs: i64,
    pub completed_at: DateTime<Utc>,
}

impl CaptureReport {
    pub fn new(
        session_id: Uuid,
        target: &Network,
        quality: HandshakeQuality,
        capture_file: PathBuf,
        capture_size: u64,
        rounds_used: u32,
        duration_secs: i64,
    ) -> Self {
        Self {
            session_id,
            essid: target.display_essid().to_string(),
            bssid: target.bssid.to_string(),
            channel: target.channel,
            encryption: target.encryption.to_string(),
            quality,
            capture_file,
            capture_size,
            rounds_used,
            duration_secs,
            completed_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Write the report as JSON beside the capture artifact
    pub fn write_beside_artifact(&self) -> Result<PathBuf> {
        let path = self.capture_file.with_extension("report.json");
        std::fs::write(&path, self.to_json()?)?;
        Ok(path)
    }
}

/// Size floor below which a capture file cannot hold a handshake
pub const MIN_CAPTURE_SIZE: u64 = 1024;

/// Whether a file clears the minimum-size floor
pub fn meets_size_floor(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.len() >= MIN_CAPTURE_SIZE)
        .unwrap_or(false)
}
