//! Skylark Core - shared types for the wireless audit toolkit
//!
//! This crate provides the foundational types used across Skylark:
//! - Error handling
//! - MAC addresses and encryption classification
//! - Access point and client models
//! - Wireless interface model
//! - Engine configuration

pub mod config;
pub mod error;
pub mod iface;
pub mod network;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use iface::{InterfaceMode, WirelessInterface};
pub use network::{Client, Network, HIDDEN_ESSID};
pub use types::{AttackMode, Encryption, MacAddr};
