//! # Monitor configuration

use crate::prelude::v1::*;
use crate::properties::{Properties, PropertyMut};
use std::time::Duration;

/// Longest accepted transition time, in seconds.
pub const MAX_TRANSITION_SECS: f64 = 600.0;

/// Tunables of the motion monitor.
///
/// All fields have working defaults, so a partial JSON document is enough to override a
/// subset of them.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize),
    serde(default)
)]
pub struct MonitorConfig {
    /// Sampling loop period in milliseconds.
    pub tick_interval_ms: usize,
    /// Number of samples in the rolling average window.
    pub window_size: usize,
    /// How long a new state must persist before it is accepted, in seconds.
    pub transition_time_secs: f64,
    /// Margin added to the ambient average when calibrating.
    pub calibration_margin: f64,
    /// Consecutive failed reads after which the sampling loop gives up.
    pub max_read_failures: usize,
    /// Fixed motion threshold. When set, the monitor can start without calibration.
    pub threshold: Option<f64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            window_size: 20,
            transition_time_secs: 3.0,
            calibration_margin: 25.0,
            max_read_failures: 10,
            threshold: None,
        }
    }
}

impl MonitorConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms as u64)
    }

    pub fn transition_time(&self) -> Duration {
        Duration::from_secs_f64(self.transition_time_secs)
    }

    /// Check that the monitor can run with these values.
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: &str) -> Result<()> {
            Err(MonitorError::InvalidConfig(msg.into()).into())
        }

        if self.tick_interval_ms == 0 {
            return invalid("tick interval must be non-zero");
        }

        if self.window_size == 0 {
            return invalid("window size must be non-zero");
        }

        if !(0.0..=MAX_TRANSITION_SECS).contains(&self.transition_time_secs) {
            return invalid("transition time must be between 0 and 600 seconds");
        }

        if !self.calibration_margin.is_finite() || self.calibration_margin < 0.0 {
            return invalid("calibration margin must be non-negative");
        }

        if self.max_read_failures == 0 {
            return invalid("read failure bound must be non-zero");
        }

        if matches!(self.threshold, Some(t) if !t.is_finite()) {
            return invalid("threshold must be finite");
        }

        Ok(())
    }
}

impl Properties for MonitorConfig {
    fn props_mut(&mut self) -> Vec<(&str, PropertyMut)> {
        vec![
            (
                "tick_interval_ms",
                PropertyMut::usize(&mut self.tick_interval_ms, 1, 10_000),
            ),
            (
                "window_size",
                PropertyMut::usize(&mut self.window_size, 1, 1000),
            ),
            (
                "transition_time_secs",
                PropertyMut::float(&mut self.transition_time_secs, 0.0, MAX_TRANSITION_SECS),
            ),
            (
                "calibration_margin",
                PropertyMut::float(&mut self.calibration_margin, 0.0, 1e6),
            ),
            (
                "max_read_failures",
                PropertyMut::usize(&mut self.max_read_failures, 1, 10_000),
            ),
        ]
    }
}
