//! Load window — moving average over the last few load samples.
//!
//! The window is pre-filled with a sentinel so the first decisions after
//! start-up lean toward keeping units online. Pushing evicts the oldest
//! sample in O(1).

use std::collections::VecDeque;

use crate::error::{ConfigError, ConfigResult};
use crate::types::LoadSample;

/// Fixed-capacity history of recent load samples.
#[derive(Debug, Clone)]
pub struct LoadWindow {
    samples: VecDeque<f64>,
    capacity: usize,
    /// Raw samples above this bypass smoothing.
    peak: f64,
}

impl LoadWindow {
    /// Create a window of `capacity` entries, all set to `sentinel`.
    pub fn new(capacity: usize, sentinel: f64, peak: f64) -> ConfigResult<Self> {
        if capacity == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        let sentinel = LoadSample::new(sentinel).value();
        Ok(Self {
            samples: std::iter::repeat_n(sentinel, capacity).collect(),
            capacity,
            peak,
        })
    }

    /// Push a new sample, evicting the oldest, and return the new mean.
    pub fn push(&mut self, sample: LoadSample) -> f64 {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample.value());
        self.smoothed()
    }

    /// Arithmetic mean of the current contents.
    pub fn smoothed(&self) -> f64 {
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// True if `sample` alone is high enough to skip the ladder.
    pub fn instantaneous_peak(&self, sample: LoadSample) -> bool {
        sample.value() > self.peak
    }

    pub fn peak(&self) -> f64 {
        self.peak
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples from oldest to newest.
    pub fn samples(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_full_of_sentinel() {
        let window = LoadWindow::new(5, 30.0, 30.0).unwrap();
        assert_eq!(window.len(), 5);
        assert_eq!(window.smoothed(), 30.0);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            LoadWindow::new(0, 30.0, 30.0),
            Err(ConfigError::EmptyWindow)
        ));
    }

    #[test]
    fn push_evicts_oldest_and_keeps_length() {
        let mut window = LoadWindow::new(3, 0.0, 30.0).unwrap();
        window.push(LoadSample::from(3));
        window.push(LoadSample::from(6));
        let avg = window.push(LoadSample::from(9));
        assert_eq!(avg, 6.0);

        let avg = window.push(LoadSample::from(12));
        assert_eq!(window.len(), 3);
        assert_eq!(window.samples(), vec![6.0, 9.0, 12.0]);
        assert_eq!(avg, 9.0);
    }

    #[test]
    fn sentinel_washes_out_after_capacity_pushes() {
        let mut window = LoadWindow::new(5, 30.0, 30.0).unwrap();
        let mut avg = 0.0;
        for _ in 0..5 {
            avg = window.push(LoadSample::from(5));
        }
        assert_eq!(avg, 5.0);
    }

    #[test]
    fn peak_is_strictly_above_threshold() {
        let window = LoadWindow::new(5, 0.0, 30.0).unwrap();
        assert!(!window.instantaneous_peak(LoadSample::from(30)));
        assert!(window.instantaneous_peak(LoadSample::from(31)));
    }
}
