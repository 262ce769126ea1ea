use serde::{Deserialize, Serialize};

/// Online accumulator for a scalar stream (loss, accuracy, timings).
///
/// `average` is `sum / count` once anything has been recorded and `0.0`
/// before that.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunningStatistic {
    pub value: f64,
    pub sum: f64,
    pub count: u64,
    pub average: f64,
}

impl RunningStatistic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record `value` observed `weight` times (typically the batch size).
    ///
    /// `weight` must be positive; this is a caller contract and is not checked.
    pub fn update(&mut self, value: f64, weight: u64) {
        self.value = value;
        self.sum += value * weight as f64;
        self.count += weight;
        self.average = if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_update_sets_average_and_count() {
        let mut stat = RunningStatistic::new();
        stat.update(0.75, 4);
        assert_eq!(stat.value, 0.75);
        assert_eq!(stat.average, 0.75);
        assert_eq!(stat.count, 4);
        assert_eq!(stat.sum, 3.0);
    }

    #[test]
    fn two_unit_updates_average() {
        let mut stat = RunningStatistic::new();
        stat.update(2.0, 1);
        stat.update(4.0, 1);
        assert_eq!(stat.average, 3.0);
        assert_eq!(stat.count, 2);
        assert_eq!(stat.sum, 6.0);
        assert_eq!(stat.value, 4.0);
    }

    #[test]
    fn weights_bias_the_average() {
        let mut stat = RunningStatistic::new();
        stat.update(1.0, 3);
        stat.update(0.0, 1);
        assert!((stat.average - 0.75).abs() < 1e-12);
    }

    #[test]
    fn reset_clears_history() {
        let mut stat = RunningStatistic::new();
        stat.update(10.0, 7);
        stat.reset();
        assert_eq!(stat.count, 0);
        assert_eq!(stat.average, 0.0);
        assert_eq!(stat.sum, 0.0);
        assert_eq!(stat.value, 0.0);
    }

    #[test]
    fn empty_average_is_zero_not_nan() {
        let stat = RunningStatistic::new();
        assert_eq!(stat.average, 0.0);
    }
}
