//! # Ambient noise calibration

use crate::aggregator::SampleAggregator;
use crate::prelude::v1::*;
use crate::sensor::SensorSource;
use log::*;

/// One-shot threshold calibration.
///
/// The device must lie still while this runs. The calibrator fills the whole aggregator window
/// with fresh readings and puts the motion threshold a fixed margin above their mean.
#[derive(Clone, Copy, Debug)]
pub struct Calibrator {
    margin: f64,
}

impl Calibrator {
    pub fn new(margin: f64) -> Self {
        Self { margin }
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Poll `source` once per window slot and derive the motion threshold.
    ///
    /// The window is left fully populated with the calibration readings, so that monitoring
    /// starts from a settled average. A read failure aborts calibration.
    pub fn calibrate<S: SensorSource + ?Sized>(
        &self,
        source: &mut S,
        aggregator: &mut SampleAggregator,
    ) -> Result<f64> {
        let polls = aggregator.capacity();

        info!("Calibrating over {polls} samples, keep the sensor motionless");

        for i in 0..polls {
            let sample = source
                .read_magnitude()
                .context("calibration aborted")?;
            let avg = aggregator.push(sample);
            debug!("calibration sample {}/{polls}: {sample:.3} (avg {avg:.3})", i + 1);
        }

        let threshold = aggregator.average() + self.margin;

        info!(
            "Calibration complete: ambient {:.3}, threshold {threshold:.3}",
            aggregator.average()
        );

        Ok(threshold)
    }
}
