//! Timing quantization
//!
//! Times are pulled toward the nearest grid line when they sit within the
//! threshold. Strength blends linearly between the raw and snapped time.

use crate::config::QuantizeOptions;

/// Grid, threshold and strength resolved for one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer {
    /// Distance between grid lines in seconds
    pub grid_sec: f64,
    pub threshold_ms: f64,
    /// Percent, 0-100
    pub strength: f64,
}

impl Quantizer {
    pub fn new(grid_sec: f64, threshold_ms: f64, strength: f64) -> Self {
        Self {
            grid_sec,
            threshold_ms,
            strength,
        }
    }

    /// Grid of `options.grid` lines per beat at the given beat length
    pub fn from_options(options: &QuantizeOptions, seconds_per_beat: f64) -> Self {
        Self::new(
            seconds_per_beat / options.grid.max(1) as f64,
            options.threshold_ms,
            options.strength,
        )
    }

    pub fn quantize(&self, time_sec: f64) -> f64 {
        quantize_time(time_sec, self.grid_sec, self.threshold_ms, self.strength)
    }
}

/// Move `time_sec` toward the nearest multiple of `grid_sec`.
///
/// Nothing moves when the distance exceeds `threshold_ms`, when strength is
/// zero, or when the grid is unusable.
pub fn quantize_time(time_sec: f64, grid_sec: f64, threshold_ms: f64, strength: f64) -> f64 {
    if !time_sec.is_finite() || !grid_sec.is_finite() || grid_sec <= 0.0 {
        return time_sec;
    }

    let amount = strength.clamp(0.0, 100.0) / 100.0;
    if amount == 0.0 {
        return time_sec;
    }

    let target = (time_sec / grid_sec).round() * grid_sec;
    let distance_ms = (target - time_sec).abs() * 1000.0;

    if distance_ms > threshold_ms {
        return time_sec;
    }

    if amount == 1.0 {
        target
    } else {
        time_sec + (target - time_sec) * amount
    }
}
