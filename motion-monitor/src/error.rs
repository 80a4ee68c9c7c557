//! # Monitor error kinds
//!
//! All fallible operations in this crate return [`anyhow::Result`]. When the failure is one of
//! the monitor's own conditions, the error carries a [`MonitorError`] which can be recovered with
//! `err.downcast_ref::<MonitorError>()`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// `start` (or `calibrate`) was called while the sampling loop is active.
    #[error("motion monitor is already running")]
    AlreadyRunning,
    /// `stop` was called without a preceding `start`.
    #[error("motion monitor is not running")]
    NotRunning,
    /// No motion threshold has been calibrated or configured.
    #[error("motion monitor has not been calibrated")]
    NotCalibrated,
    /// Configuration values cannot be used to run the monitor.
    #[error("invalid monitor configuration: {0}")]
    InvalidConfig(String),
    /// The sensor failed too many times in a row while sampling.
    #[error("sensor failed {failures} consecutive reads")]
    SensorFault { failures: usize },
    /// A transition handler returned an error.
    #[error("transition handler failed")]
    HandlerFailed,
}
