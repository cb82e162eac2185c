//! Engine configuration with defaults and JSON file override

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine configuration.
///
/// All durations are in seconds. A JSON config file may override any subset;
/// CLI flags override the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Duration of the discovery scan
    pub scan_time: u64,
    /// Deauthentication frames per burst
    pub deauth_count: u32,
    /// Maximum deauthentication rounds before the extended wait
    pub max_deauth_rounds: u32,
    /// Extended passive wait for a handshake after all rounds
    pub handshake_timeout: u64,
    /// Bound on a WPS bruteforce run
    pub wps_timeout: u64,
    /// Bound on a PMKID capture run
    pub pmkid_timeout: u64,
    /// Pause after starting a capture tool before checking on it
    pub capture_settle: u64,
    /// Pause between deauth bursts aimed at different clients
    pub client_gap: u64,
    /// Pause after a deauth round before re-checking for a handshake
    pub round_settle: u64,
    /// Directory for capture artifacts and reports
    pub output_dir: PathBuf,
    /// Candidate wordlist locations, checked in order
    pub wordlist_paths: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan_time: 30,
            deauth_count: 20,
            max_deauth_rounds: 5,
            handshake_timeout: 300,
            wps_timeout: 600,
            pmkid_timeout: 120,
            capture_settle: 5,
            client_gap: 2,
            round_settle: 10,
            output_dir: PathBuf::from("skylark-captures"),
            wordlist_paths: vec![
                PathBuf::from("/usr/share/wordlists/rockyou.txt"),
                PathBuf::from("/usr/share/wordlists/rockyou.txt.gz"),
                PathBuf::from("/usr/share/dict/words"),
            ],
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, filling missing fields with
    /// defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)
            .map_err(|e| crate::Error::Parse(format!("config {}: {e}", path.display())))?;
        Ok(config)
    }

    /// First wordlist candidate that exists on disk
    pub fn find_wordlist(&self) -> Option<&Path> {
        self.wordlist_paths
            .iter()
            .map(PathBuf::as_path)
            .find(|p| p.exists())
    }
}
