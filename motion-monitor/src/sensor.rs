//! # Acceleration sensor sources

use crate::prelude::v1::*;
use nalgebra as na;

/// Instantaneous 3-axis acceleration.
pub type Axes = na::Vector3<f64>;

/// Source of raw accelerometer readings.
///
/// Implementations wrap a device (or a recording of one). The monitor calls the source once per
/// tick from its sampling thread, so a read should return well within the tick interval.
pub trait SensorSource: Send {
    /// Read one sample of acceleration on all three axes.
    ///
    /// Returns `Err` if the device could not be read, for instance when it was disconnected.
    fn read_axes(&mut self) -> Result<Axes>;

    /// Read one sample and reduce it to its Euclidean norm.
    ///
    /// Non-finite readings are reported as errors, so that a garbled sample never reaches the
    /// rolling average.
    fn read_magnitude(&mut self) -> Result<f64> {
        let axes = self.read_axes()?;
        let mag = axes.magnitude();

        if mag.is_finite() {
            Ok(mag)
        } else {
            Err(anyhow!(
                "non-finite reading ({}, {}, {})",
                axes.x,
                axes.y,
                axes.z
            ))
        }
    }
}

impl<T: SensorSource + ?Sized> SensorSource for Box<T> {
    fn read_axes(&mut self) -> Result<Axes> {
        (**self).read_axes()
    }
}
