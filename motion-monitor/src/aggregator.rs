//! # Sliding window sample aggregation

use std::collections::VecDeque;

/// Fixed capacity window of recent sample magnitudes.
///
/// The window keeps at most `capacity` samples, evicting the oldest one once full. The rolling
/// average is recomputed on every push and only covers the samples currently held, so during
/// warm-up it is the mean of fewer than `capacity` values.
///
/// # Examples
///
/// ```
/// use motion_monitor::aggregator::SampleAggregator;
///
/// let mut agg = SampleAggregator::new(2);
///
/// assert_eq!(agg.push(1.0), 1.0);
/// assert_eq!(agg.push(3.0), 2.0);
/// // 1.0 gets evicted.
/// assert_eq!(agg.push(5.0), 4.0);
/// ```
#[derive(Clone, Debug)]
pub struct SampleAggregator {
    window: VecDeque<f64>,
    capacity: usize,
    average: f64,
}

impl SampleAggregator {
    /// Create an empty aggregator.
    ///
    /// # Arguments
    ///
    /// * `capacity` - number of samples in a full window. Must be non-zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be non-zero");

        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            average: 0.0,
        }
    }

    /// Add a sample to the window and return the new rolling average.
    pub fn push(&mut self, sample: f64) -> f64 {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }

        self.window.push_back(sample);

        self.average = self.window.iter().sum::<f64>() / self.window.len() as f64;
        self.average
    }

    /// Mean of the samples currently held, or 0 for an empty window.
    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.window.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate over held samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.window.iter().copied()
    }

    /// Drop all samples.
    pub fn clear(&mut self) {
        self.window.clear();
        self.average = 0.0;
    }
}
