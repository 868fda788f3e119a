//! Filesystem and process helpers for a render pipeline.
//!
//! The centerpiece is [`monitor::Monitor`], which supervises an external
//! program launched through [`launcher`]: it streams the program's output to
//! a log sink, checks in with the caller at a fixed interval, and kills the
//! program when a check-in fails or its time budget runs out.

pub mod config;
pub mod env;
pub mod fsutil;
pub mod launcher;
pub mod monitor;
pub mod platform;

pub use config::Settings;
pub use launcher::{spawn, LaunchError, LaunchOptions, LaunchedProcess, ProcessHandle};
pub use monitor::{LogSink, Monitor, MonitorOutcome};
pub use platform::ProcessInspector;
