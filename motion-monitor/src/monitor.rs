//! # Background motion monitor
//!
//! [`MotionMonitor`] owns the sampling thread. While it runs, the sensor, the sample window and
//! the debouncer all live on that thread; the foreground only ever sees [`MonitorStatus`]
//! snapshots.

use crate::aggregator::SampleAggregator;
use crate::calibrate::Calibrator;
use crate::debounce::{Debouncer, ParkState, TransitionHandler};
use crate::prelude::v1::*;
use crate::sensor::SensorSource;
use crate::timer::Timer;
use crate::config::MonitorConfig;
use log::*;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::thread::{Builder, JoinHandle};
use std::time::Instant;

/// Consistent snapshot of the monitor's shared state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct MonitorStatus {
    pub state: ParkState,
    /// Rolling average of the most recent sample magnitudes.
    pub avg_motion: f64,
    pub threshold: Option<f64>,
    /// Samples taken since the current run started.
    pub samples: u64,
    /// Current run of consecutive failed reads.
    pub read_failures: usize,
    /// Whether the sampling loop is alive.
    pub running: bool,
}

/// Everything the sampling thread takes ownership of for the duration of a run.
struct Sampler<S> {
    source: S,
    aggregator: SampleAggregator,
}

#[derive(Default)]
struct Shared {
    status: RwLock<MonitorStatus>,
    signal: AtomicBool,
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<MonitorStatus> {
        self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<MonitorStatus> {
        self.status.write().unwrap_or_else(PoisonError::into_inner)
    }
}

type Run<S> = JoinHandle<(Option<Sampler<S>>, Result<()>)>;

/// Debounced parked/moving monitor over a [`SensorSource`].
///
/// # Examples
///
/// ```no_run
/// use motion_monitor::prelude::v1::*;
///
/// fn watch(source: Box<dyn SensorSource>) -> Result<()> {
///     let mut monitor = MotionMonitor::new(source, MonitorConfig::default())?;
///
///     monitor.calibrate()?;
///     monitor.start(
///         Callbacks::new()
///             .on_parked(|| println!("Car is parked."))
///             .on_moving(|| println!("Car is moving.")),
///     )?;
///
///     std::thread::sleep(std::time::Duration::from_secs(20));
///
///     monitor.stop()
/// }
/// ```
pub struct MotionMonitor<S: SensorSource + 'static = Box<dyn SensorSource>> {
    config: MonitorConfig,
    threshold: Option<f64>,
    sampler: Option<Sampler<S>>,
    shared: Arc<Shared>,
    handle: Option<Run<S>>,
}

impl<S: SensorSource + 'static> MotionMonitor<S> {
    /// Create a stopped monitor.
    ///
    /// The sensor is not read until [`calibrate`](Self::calibrate) or [`start`](Self::start).
    pub fn new(source: S, config: MonitorConfig) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared::default());
        shared.write().threshold = config.threshold;

        Ok(Self {
            threshold: config.threshold,
            sampler: Some(Sampler {
                source,
                aggregator: SampleAggregator::new(config.window_size),
            }),
            config,
            shared,
            handle: None,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Motion threshold in use, if calibrated or configured.
    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    /// Derive the motion threshold from ambient readings.
    ///
    /// Blocks for one window worth of sensor reads. The sensor must be motionless. Fails with
    /// [`MonitorError::AlreadyRunning`] while the sampling loop is active.
    pub fn calibrate(&mut self) -> Result<f64> {
        if self.handle.is_some() {
            return Err(MonitorError::AlreadyRunning.into());
        }

        let calibrator = Calibrator::new(self.config.calibration_margin);
        let sampler = self.sampler.as_mut().ok_or_else(lost_source)?;
        let threshold = calibrator.calibrate(&mut sampler.source, &mut sampler.aggregator)?;
        let avg_motion = sampler.aggregator.average();

        self.threshold = Some(threshold);

        let mut status = self.shared.write();
        status.threshold = Some(threshold);
        status.avg_motion = avg_motion;

        Ok(threshold)
    }

    /// Start the background sampling loop.
    ///
    /// `handler` is notified of every park state transition on the sampling thread. Pass `()`
    /// to run without notifications.
    pub fn start<H: TransitionHandler + 'static>(&mut self, handler: H) -> Result<()> {
        self.start_on(Builder::new().name("motion-monitor".into()), handler)
    }

    fn start_on<H: TransitionHandler + 'static>(
        &mut self,
        builder: Builder,
        handler: H,
    ) -> Result<()> {
        if self.handle.is_some() {
            return Err(MonitorError::AlreadyRunning.into());
        }

        let threshold = self.threshold.ok_or(MonitorError::NotCalibrated)?;
        let sampler = self.sampler.take().ok_or_else(lost_source)?;

        let debouncer = Debouncer::new(threshold, self.config.transition_time(), Instant::now());

        *self.shared.write() = MonitorStatus {
            state: debouncer.state(),
            avg_motion: sampler.aggregator.average(),
            threshold: Some(threshold),
            samples: 0,
            read_failures: 0,
            running: true,
        };
        self.shared.signal.store(true, Ordering::Release);

        // The thread picks the sampler up from here, so it can be recovered if spawning fails.
        let slot = Arc::new(Mutex::new(Some(sampler)));

        let shared = self.shared.clone();
        let config = self.config.clone();
        let thread_slot = slot.clone();

        let spawned = builder.spawn(move || {
            let taken = thread_slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();

            let mut sampler = match taken {
                Some(sampler) => sampler,
                None => return (None, Err(lost_source())),
            };

            let result = sample_loop(&mut sampler, debouncer, handler, &shared, &config);

            if let Err(e) = &result {
                error!("Sampling loop terminated: {e:#}");
            }

            shared.write().running = false;

            (Some(sampler), result)
        });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.sampler = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
                self.shared.signal.store(false, Ordering::Release);
                self.shared.write().running = false;
                return Err(e).context("failed to spawn sampling thread");
            }
        };

        info!("Motion monitor started (threshold {threshold:.3})");

        self.handle = Some(handle);

        Ok(())
    }

    /// Stop the sampling loop and wait for the thread to exit.
    ///
    /// Once this returns, the shared state no longer changes and no handler is invoked. If the
    /// loop had already terminated because of a sensor fault or a failing handler, that error is
    /// returned here, after cleanup.
    pub fn stop(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(MonitorError::NotRunning)?;

        self.shared.signal.store(false, Ordering::Release);

        let (sampler, result) = handle
            .join()
            .map_err(|_| anyhow!("sampling thread panicked"))?;

        // The window belongs to the run that just ended.
        self.sampler = sampler.map(|mut sampler| {
            sampler.aggregator.clear();
            sampler
        });
        self.shared.write().running = false;

        info!("Motion monitor stopped");

        result
    }

    /// Whether the sampling loop is active.
    ///
    /// This turns false as soon as the loop terminates on its own; `stop` must still be called
    /// to collect the error.
    pub fn is_running(&self) -> bool {
        self.handle.is_some() && self.shared.read().running
    }

    pub fn is_parked(&self) -> bool {
        self.shared.read().state == ParkState::Parked
    }

    /// Current rolling average of sample magnitudes.
    pub fn get_avg_motion(&self) -> f64 {
        self.shared.read().avg_motion
    }

    pub fn status(&self) -> MonitorStatus {
        *self.shared.read()
    }
}

fn lost_source() -> Error {
    anyhow!("sensor source was lost with a panicked sampling thread")
}

impl<S: SensorSource + 'static> Drop for MotionMonitor<S> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.stop();
        }
    }
}

fn sample_loop<S: SensorSource, H: TransitionHandler>(
    sampler: &mut Sampler<S>,
    mut debouncer: Debouncer,
    mut handler: H,
    shared: &Shared,
    config: &MonitorConfig,
) -> Result<()> {
    let mut timer = Timer::new(config.tick_interval());
    let mut failures = 0;

    while shared.signal.load(Ordering::Acquire) {
        match sampler.source.read_magnitude() {
            Ok(sample) => {
                failures = 0;

                let avg = sampler.aggregator.push(sample);
                let now = Instant::now();
                let transition = debouncer.evaluate(avg, now);

                {
                    let mut status = shared.write();
                    status.state = debouncer.state();
                    status.avg_motion = avg;
                    status.samples += 1;
                    status.read_failures = 0;
                }

                debug!(
                    "avg {avg:.3} threshold {:.3} state {} timer {:.2}s",
                    debouncer.threshold(),
                    debouncer.state(),
                    debouncer.candidate_age(now).as_secs_f64()
                );

                if let Some(state) = transition {
                    info!("Transitioned to {state} (avg {avg:.3})");
                    handler
                        .on_transition(state)
                        .context(MonitorError::HandlerFailed)?;
                }
            }
            Err(e) => {
                failures += 1;
                shared.write().read_failures = failures;

                if failures >= config.max_read_failures {
                    return Err(e.context(MonitorError::SensorFault { failures }));
                }

                warn!(
                    "Skipping tick, sensor read failed ({failures}/{}): {e:#}",
                    config.max_read_failures
                );
            }
        }

        timer.sleep();
    }

    Ok(())
}
