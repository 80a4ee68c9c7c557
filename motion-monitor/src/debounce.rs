//! # Debounced park state
//!
//! The rolling motion average is noisy even after smoothing, so a single reading across the
//! threshold is never taken at face value. A state change is only accepted once the opposite
//! condition has held for a full transition time.

use crate::prelude::v1::*;
use std::time::{Duration, Instant};

/// Whether the device is considered to be at rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum ParkState {
    Parked,
    /// Initial state. The device is assumed to be moving until proven otherwise.
    #[default]
    Moving,
}

impl ParkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParkState::Parked => "parked",
            ParkState::Moving => "moving",
        }
    }

    /// Check whether `avg` argues for leaving this state.
    ///
    /// Motion is detected strictly above the threshold, so a reading equal to it favours
    /// `Parked` in both directions.
    fn is_candidate(&self, avg: f64, threshold: f64) -> bool {
        match self {
            ParkState::Parked => avg > threshold,
            ParkState::Moving => avg <= threshold,
        }
    }

    fn opposite(&self) -> Self {
        match self {
            ParkState::Parked => ParkState::Moving,
            ParkState::Moving => ParkState::Parked,
        }
    }
}

impl std::fmt::Display for ParkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of park state transitions.
///
/// Both methods default to doing nothing, which makes `()` a valid handler when nobody needs to
/// be notified. Returning an error from either method stops the monitor's sampling loop.
pub trait TransitionHandler: Send {
    /// Called once after the device settles down.
    fn on_parked(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once after the device starts moving.
    fn on_moving(&mut self) -> Result<()> {
        Ok(())
    }

    /// Dispatch to the method matching `state`.
    fn on_transition(&mut self, state: ParkState) -> Result<()> {
        match state {
            ParkState::Parked => self.on_parked(),
            ParkState::Moving => self.on_moving(),
        }
    }
}

impl TransitionHandler for () {}

impl<T: TransitionHandler + ?Sized> TransitionHandler for Box<T> {
    fn on_parked(&mut self) -> Result<()> {
        (**self).on_parked()
    }

    fn on_moving(&mut self) -> Result<()> {
        (**self).on_moving()
    }
}

type Callback = Box<dyn FnMut() -> Result<()> + Send>;

/// Handler built from optional closures.
///
/// # Examples
///
/// ```
/// use motion_monitor::debounce::{Callbacks, ParkState, TransitionHandler};
///
/// let mut cb = Callbacks::new().on_parked(|| println!("Car is parked."));
///
/// cb.on_transition(ParkState::Parked).unwrap();
/// // No moving callback was set.
/// cb.on_transition(ParkState::Moving).unwrap();
/// ```
#[derive(Default)]
pub struct Callbacks {
    on_parked: Option<Callback>,
    on_moving: Option<Callback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_parked(self, mut f: impl FnMut() + Send + 'static) -> Self {
        self.try_on_parked(move || {
            f();
            Ok(())
        })
    }

    pub fn on_moving(self, mut f: impl FnMut() + Send + 'static) -> Self {
        self.try_on_moving(move || {
            f();
            Ok(())
        })
    }

    pub fn try_on_parked(mut self, f: impl FnMut() -> Result<()> + Send + 'static) -> Self {
        self.on_parked = Some(Box::new(f));
        self
    }

    pub fn try_on_moving(mut self, f: impl FnMut() -> Result<()> + Send + 'static) -> Self {
        self.on_moving = Some(Box::new(f));
        self
    }
}

impl TransitionHandler for Callbacks {
    fn on_parked(&mut self) -> Result<()> {
        self.on_parked.as_mut().map_or(Ok(()), |f| f())
    }

    fn on_moving(&mut self) -> Result<()> {
        self.on_moving.as_mut().map_or(Ok(()), |f| f())
    }
}

/// Hysteresis debouncer turning rolling averages into a [`ParkState`].
#[derive(Clone, Debug)]
pub struct Debouncer {
    state: ParkState,
    threshold: f64,
    transition_time: Duration,
    candidate_since: Instant,
}

impl Debouncer {
    /// Create a debouncer in the `Moving` state.
    ///
    /// # Arguments
    ///
    /// * `threshold` - average above which motion is detected.
    /// * `transition_time` - how long the opposite condition must hold before switching.
    /// * `now` - start of the first candidate run.
    pub fn new(threshold: f64, transition_time: Duration, now: Instant) -> Self {
        Self {
            state: ParkState::default(),
            threshold,
            transition_time,
            candidate_since: now,
        }
    }

    pub fn state(&self) -> ParkState {
        self.state
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn transition_time(&self) -> Duration {
        self.transition_time
    }

    /// Time the current candidate condition has been holding for.
    pub fn candidate_age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.candidate_since)
    }

    /// Override the current state without notifying anyone.
    ///
    /// The candidate timer restarts at `now`.
    pub fn force_state(&mut self, state: ParkState, now: Instant) {
        self.state = state;
        self.candidate_since = now;
    }

    /// Evaluate one tick.
    ///
    /// Returns `Some(new_state)` exactly when the state changed on this tick. Any tick where the
    /// candidate condition does not hold restarts the candidate timer.
    pub fn evaluate(&mut self, avg: f64, now: Instant) -> Option<ParkState> {
        if !self.state.is_candidate(avg, self.threshold) {
            self.candidate_since = now;
            return None;
        }

        if self.candidate_age(now) < self.transition_time {
            return None;
        }

        self.state = self.state.opposite();
        self.candidate_since = now;
        Some(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::SampleAggregator;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    const SECOND: Duration = Duration::from_secs(1);

    /// Counts how many times each callback fired.
    #[derive(Default)]
    struct Counter {
        parked: usize,
        moving: usize,
    }

    impl TransitionHandler for Counter {
        fn on_parked(&mut self) -> Result<()> {
            self.parked += 1;
            Ok(())
        }

        fn on_moving(&mut self) -> Result<()> {
            self.moving += 1;
            Ok(())
        }
    }

    fn drive(
        d: &mut Debouncer,
        handler: &mut impl TransitionHandler,
        start: Instant,
        ticks: impl IntoIterator<Item = (Duration, f64)>,
    ) {
        for (at, avg) in ticks {
            if let Some(state) = d.evaluate(avg, start + at) {
                handler.on_transition(state).unwrap();
            }
        }
    }

    fn parked(threshold: f64, delay: Duration, start: Instant) -> Debouncer {
        let mut d = Debouncer::new(threshold, delay, start);
        d.force_state(ParkState::Parked, start);
        d
    }

    #[test]
    fn starts_moving() {
        let d = Debouncer::new(10.0, SECOND * 3, Instant::now());
        assert_eq!(d.state(), ParkState::Moving);
    }

    #[test]
    fn transient_spike_is_held() {
        let start = Instant::now();
        let mut d = parked(10.0, SECOND * 3, start);
        let mut counter = Counter::default();

        let ticks = (0..30u32)
            .map(|i| (SECOND * i / 10, if i < 25 { 50.0 } else { 4.0 }))
            .collect::<Vec<_>>();
        drive(&mut d, &mut counter, start, ticks);

        assert_eq!(d.state(), ParkState::Parked);
        assert_eq!(counter.moving, 0);
        assert_eq!(counter.parked, 0);
    }

    #[test]
    fn sustained_motion_fires_once() {
        let start = Instant::now();
        let mut d = parked(10.0, SECOND * 3, start);
        let mut counter = Counter::default();

        // Ten seconds of continuous motion at 10 Hz.
        drive(
            &mut d,
            &mut counter,
            start,
            (0..100u32).map(|i| (SECOND * i / 10, 25.0)),
        );

        assert_eq!(d.state(), ParkState::Moving);
        assert_eq!(counter.moving, 1);
        assert_eq!(counter.parked, 0);
    }

    #[test]
    fn transition_waits_for_full_delay() {
        let start = Instant::now();
        let mut d = parked(10.0, SECOND * 3, start);

        assert_eq!(d.evaluate(4.0, start), None);
        assert_eq!(d.evaluate(11.0, start + SECOND), None);
        assert_eq!(d.evaluate(11.0, start + Duration::from_millis(2900)), None);
        assert_eq!(d.evaluate(11.0, start + SECOND * 3), Some(ParkState::Moving));
        assert_eq!(d.state(), ParkState::Moving);
    }

    #[test]
    fn interruption_restarts_timer() {
        let start = Instant::now();
        let mut d = Debouncer::new(10.0, SECOND * 3, start);

        assert_eq!(d.evaluate(1.0, start + SECOND * 2), None);
        // Back over the threshold right before the delay elapses.
        assert_eq!(d.evaluate(30.0, start + Duration::from_millis(2900)), None);
        assert_eq!(d.evaluate(1.0, start + SECOND * 4), None);
        assert_eq!(d.evaluate(1.0, start + Duration::from_millis(5800)), None);
        assert_eq!(
            d.evaluate(1.0, start + Duration::from_millis(5900)),
            Some(ParkState::Parked)
        );
    }

    #[test]
    fn threshold_equality_favours_parked() {
        let start = Instant::now();

        let mut d = Debouncer::new(10.0, Duration::ZERO, start);
        assert_eq!(d.evaluate(10.0, start), Some(ParkState::Parked));

        let mut d = parked(10.0, Duration::ZERO, start);
        assert_eq!(d.evaluate(10.0, start), None);
        assert_eq!(d.state(), ParkState::Parked);
    }

    #[test]
    fn round_trip_fires_each_callback_once() {
        let start = Instant::now();
        let mut d = Debouncer::new(10.0, SECOND * 3, start);
        let mut counter = Counter::default();

        let ticks = (0..200u32).map(|i| {
            let avg = match i {
                0..=49 => 2.0,
                50..=119 => 40.0,
                _ => 2.0,
            };
            (SECOND * i / 10, avg)
        });
        drive(&mut d, &mut counter, start, ticks);

        assert_eq!(d.state(), ParkState::Parked);
        assert_eq!(counter.parked, 2);
        assert_eq!(counter.moving, 1);
    }

    #[test]
    fn window_of_four_with_zero_delay() {
        let start = Instant::now();
        let mut agg = SampleAggregator::new(4);
        let mut d = Debouncer::new(10.0, Duration::ZERO, start);
        let mut counter = Counter::default();

        for s in [2.0, 3.0, 2.0, 3.0] {
            agg.push(s);
        }
        assert_eq!(agg.average(), 2.5);
        assert_eq!(d.state(), ParkState::Moving);

        // Already moving, so high averages change nothing.
        for s in [20.0; 4] {
            agg.push(s);
        }
        drive(&mut d, &mut counter, start, [(Duration::ZERO, agg.average())]);
        assert_eq!(agg.average(), 20.0);
        assert_eq!(d.state(), ParkState::Moving);
        assert_eq!(counter.moving, 0);

        for s in [2.0; 4] {
            agg.push(s);
        }
        drive(&mut d, &mut counter, start, [(SECOND, agg.average())]);
        assert_eq!(d.state(), ParkState::Parked);
        assert_eq!(counter.parked, 1);

        // And the mirror image.
        for s in [20.0; 4] {
            let avg = agg.push(s);
            drive(&mut d, &mut counter, start, [(SECOND * 2, avg)]);
        }
        assert_eq!(d.state(), ParkState::Moving);
        assert_eq!(counter.moving, 1);
        assert_eq!(counter.parked, 1);
    }

    #[test]
    fn forced_state_fires_nothing() {
        let start = Instant::now();
        let mut d = Debouncer::new(10.0, SECOND, start);

        d.force_state(ParkState::Parked, start + SECOND);
        assert_eq!(d.state(), ParkState::Parked);
        assert_eq!(d.candidate_age(start + SECOND * 2), SECOND);
    }

    #[test]
    fn closures_only_fire_when_set() {
        let moving = Arc::new(AtomicUsize::new(0));

        let mut cb = Callbacks::new().on_moving({
            let moving = moving.clone();
            move || {
                moving.fetch_add(1, Ordering::SeqCst);
            }
        });

        cb.on_transition(ParkState::Parked).unwrap();
        cb.on_transition(ParkState::Moving).unwrap();

        assert_eq!(moving.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fallible_closure_propagates() {
        let mut cb = Callbacks::new().try_on_parked(|| Err(anyhow!("camera offline")));

        assert!(cb.on_transition(ParkState::Parked).is_err());
        assert!(cb.on_transition(ParkState::Moving).is_ok());
    }
}
