//! Simulated accelerometer.

use motion_monitor::prelude::v1::*;
use nalgebra as na;
use rand::prelude::*;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

/// Raw reading of one standard gravity, as reported by a 16-bit accelerometer at +-2g.
pub const GRAVITY_RAW: f64 = 16384.0;

/// Behaviour of a [`SimulatedImu`].
#[derive(Clone, Copy, Debug)]
pub enum SimMode {
    /// Controlled through a [`SimHandle`].
    Manual,
    /// Alternate between lying still and moving, starting still.
    Cycle { still: Duration, moving: Duration },
}

impl SimMode {
    /// Cycle used by the loader: long enough to see both transitions with default timings.
    pub fn demo_cycle() -> Self {
        SimMode::Cycle {
            still: Duration::from_secs(10),
            moving: Duration::from_secs(10),
        }
    }
}

/// Shared switch to shake a manually controlled simulator.
#[derive(Clone, Default)]
pub struct SimHandle(Arc<AtomicBool>);

impl SimHandle {
    pub fn set_moving(&self, moving: bool) {
        self.0.store(moving, Ordering::Relaxed);
    }

    pub fn is_moving(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Accelerometer lying flat, with per-axis jitter at rest and strong noise while moving.
///
/// Moving readings also carry a random vertical load on top of gravity, so the mean magnitude
/// rises while shaking instead of only spreading around 1g.
pub struct SimulatedImu {
    rng: StdRng,
    mode: SimMode,
    handle: SimHandle,
    epoch: Instant,
    jitter: f64,
    shake: f64,
    bounce: f64,
}

impl SimulatedImu {
    /// Create a simulator.
    ///
    /// # Arguments
    ///
    /// * `seed` - RNG seed for reproducible noise. Entropy-seeded when `None`.
    /// * `mode` - how the simulator decides whether it is moving.
    pub fn new(seed: Option<u64>, mode: SimMode) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            rng,
            mode,
            handle: SimHandle::default(),
            epoch: Instant::now(),
            jitter: 4.0,
            shake: 1000.0,
            bounce: 1600.0,
        }
    }

    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }

    fn is_moving(&self) -> bool {
        match self.mode {
            SimMode::Manual => self.handle.is_moving(),
            SimMode::Cycle { still, moving } => {
                let period = (still + moving).as_secs_f64();
                if period <= 0.0 {
                    return false;
                }
                self.epoch.elapsed().as_secs_f64() % period >= still.as_secs_f64()
            }
        }
    }
}

impl SensorSource for SimulatedImu {
    fn read_axes(&mut self) -> Result<Axes> {
        let moving = self.is_moving();
        let amplitude = if moving { self.shake } else { self.jitter };

        let rng = &mut self.rng;
        let load = if moving {
            rng.gen_range(0.0..=self.bounce)
        } else {
            0.0
        };
        let mut sample = || rng.gen_range(-amplitude..=amplitude);
        let noise = na::Vector3::new(sample(), sample(), sample());

        Ok(na::Vector3::new(0.0, 0.0, GRAVITY_RAW + load) + noise)
    }
}
