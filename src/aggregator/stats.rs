//! Timer Statistics
//!
//! Summarizes one interval's worth of durations for a single timer key.
//! The percentile band uses a fixed 90th threshold and the rounding below
//! must stay exactly as written: collectors compare our output against
//! historical series produced with the same arithmetic.

/// Percentile threshold applied to every timer
pub const PERCENTILE_THRESHOLD: u32 = 90;

/// Summary of one timer key over a flush interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    /// Mean of the values inside the percentile band
    pub mean: f64,
    /// Largest value still inside the percentile band
    pub upper_threshold: f64,
}

impl TimerStats {
    /// Compute statistics for a set of durations.
    ///
    /// Returns `None` for an empty slice. Input order does not matter.
    pub fn compute(durations: &[f64]) -> Option<Self> {
        if durations.is_empty() {
            return None;
        }

        let mut sorted = durations.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let count = sorted.len();
        let threshold_index = threshold_index(count, PERCENTILE_THRESHOLD);
        // round(0.1 * n) < n for every n >= 1, so the band is never empty
        let num_in_threshold = count - threshold_index;
        debug_assert!(num_in_threshold >= 1);

        let band = &sorted[..num_in_threshold];
        let sum: f64 = band.iter().sum();

        Some(TimerStats {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean: sum / num_in_threshold as f64,
            upper_threshold: sorted[num_in_threshold - 1],
        })
    }
}

/// Number of samples cut off above the percentile band.
fn threshold_index(count: usize, threshold: u32) -> usize {
    let fraction = (100 - threshold) as f64 / 100.0;
    (fraction * count as f64).round() as usize
}
