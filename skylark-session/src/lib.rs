//! Skylark Session - process supervision and system state management
//!
//! This crate owns everything that touches the machine's state: spawning and
//! terminating external tools, moving interfaces in and out of monitor mode,
//! cooperative cancellation, and the teardown that restores the system no
//! matter how the run ended.

pub mod cancel;
pub mod monitor;
pub mod runner;
pub mod session;
pub mod supervisor;
pub mod teardown;

pub use cancel::CancelToken;
pub use monitor::{
    detect_wireless_interfaces, disable_monitor_mode, enable_monitor_mode, MonitorTransition,
};
pub use runner::{CommandOutput, SystemRunner, ToolRunner, TIMEOUT_EXIT_CODE};
pub use session::Session;
pub use supervisor::{ManagedProcess, ProcessState, ProcessSupervisor};
pub use teardown::{teardown, SessionSummary};
