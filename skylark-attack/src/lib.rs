//! Skylark Attack - discovery, selection, and capture state machines
//!
//! Everything in this crate drives external capture tools through the
//! `ToolRunner` seam and reads their record files back; nothing here touches
//! the system directly.

pub mod handshake;
pub mod parser;
pub mod pmkid;
pub mod report;
pub mod scan;
pub mod wps;

#[cfg(test)]
pub(crate) mod testutil;

pub use handshake::{CaptureState, FailureHint, HandshakeMachine, HandshakeOutcome};
pub use parser::{parse_clients, parse_networks, refresh_clients};
pub use pmkid::{capture_pmkid, PmkidCapture};
pub use report::{CaptureReport, HandshakeQuality, MIN_CAPTURE_SIZE};
pub use scan::{scan, ScanFiles, SelectionView, SortKey};
pub use wps::{parse_wash_output, pin_attack, survey, WpsNetwork, WpsOutcome};
