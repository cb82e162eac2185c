//! Command-line argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "skylark",
    about = "Wireless network capture orchestration for authorized security assessments",
    version
)]
pub struct Args {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Directory for capture artifacts and reports
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List detected wireless interfaces
    Interfaces,

    /// Scan for WPA-family networks
    Scan {
        /// Wireless interface to use
        #[arg(short, long)]
        interface: String,

        /// Scan duration in seconds
        #[arg(long)]
        scan_time: Option<u64>,
    },

    /// Capture a WPA handshake from a target network
    Handshake {
        /// Wireless interface to use
        #[arg(short, long)]
        interface: String,

        /// Target BSSID; omit to pick interactively after a scan
        #[arg(short, long)]
        bssid: Option<String>,

        /// Target channel (required with --bssid)
        #[arg(short, long)]
        channel: Option<i32>,

        /// Target ESSID label for artifacts
        #[arg(long)]
        essid: Option<String>,

        /// Scan duration in seconds
        #[arg(long)]
        scan_time: Option<u64>,

        /// Deauthentication frames per burst
        #[arg(long)]
        deauth_count: Option<u32>,

        /// Extended wait for a handshake, in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Clientless PMKID capture
    Pmkid {
        /// Wireless interface to use
        #[arg(short, long)]
        interface: String,

        /// Capture window in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// WPS survey and PIN attacks
    Wps {
        /// Wireless interface to use
        #[arg(short, long)]
        interface: String,

        /// Target BSSID; omit to survey and list WPS-enabled networks
        #[arg(short, long)]
        bssid: Option<String>,

        /// Target channel (required with --bssid)
        #[arg(short, long)]
        channel: Option<i32>,

        /// Use the offline Pixie Dust attack
        #[arg(long)]
        pixie: bool,

        /// Attack window in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

impl Command {
    pub fn interface(&self) -> Option<&str> {
        match self {
            Command::Interfaces => None,
            Command::Scan { interface, .. }
            | Command::Handshake { interface, .. }
            | Command::Pmkid { interface, .. }
            | Command::Wps { interface, .. } => Some(interface),
        }
    }
}
