//! # Motion State Monitor
//!
//! This library turns a stream of noisy accelerometer readings into a stable "parked / moving"
//! signal. Samples are smoothed over a sliding window, compared against a calibrated threshold,
//! and debounced so that a state change is only reported once it has persisted.
//!
//! The easiest way to use the library is to import its prelude:
//!
//! ```
//! use motion_monitor::prelude::v1::*;
//! ```
//!
//! A [`SensorSource`](sensor::SensorSource) implementation is needed to supply readings.

pub mod aggregator;
pub mod calibrate;
pub mod config;
pub mod debounce;
pub mod error;
pub mod monitor;
pub mod properties;
pub mod sensor;
mod timer;

pub mod prelude {
    pub mod v1 {
        pub use crate::{
            aggregator::SampleAggregator,
            calibrate::Calibrator,
            config::MonitorConfig,
            debounce::{Callbacks, Debouncer, ParkState, TransitionHandler},
            error::MonitorError,
            monitor::{MonitorStatus, MotionMonitor},
            properties::{Properties, Property, PropertyMut},
            sensor::{Axes, SensorSource},
        };
        pub use anyhow::{anyhow, Context, Error, Result};
    }
}
