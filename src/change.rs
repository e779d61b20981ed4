//! Noise-aware change detection between consecutive releases
//!
//! The decision rule is shared by configuration-level and term-level
//! analysis: a signed performance delta counts as a real change only when it
//! exceeds twice the larger of the two releases' absolute measurement
//! deviations. This is a purpose-built heuristic calibrated against the
//! measurement setup, not a formal hypothesis test.

use serde::{Deserialize, Serialize};

/// One performance observation: mean value plus relative deviation
///
/// `deviation` is a relative uncertainty (coefficient of variation), so the
/// absolute noise scale of the observation is `mean * deviation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub mean: f64,
    pub deviation: f64,
}

impl Observation {
    pub fn new(mean: f64, deviation: f64) -> Self {
        Observation { mean, deviation }
    }

    /// Absolute one-sigma noise scale of this observation.
    pub fn noise_scale(&self) -> f64 {
        self.mean * self.deviation
    }
}

/// Direction of a detected change, from the perspective of the later release
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Improved,
    Regressed,
}

/// Minimum absolute delta that counts as signal rather than noise
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseThreshold(f64);

impl NoiseThreshold {
    /// Twice the larger of the two observations' absolute noise scales.
    pub fn from_observations(earlier: &Observation, later: &Observation) -> Self {
        NoiseThreshold(2.0 * earlier.noise_scale().max(later.noise_scale()))
    }

    pub fn from_value(value: f64) -> Self {
        NoiseThreshold(value)
    }

    /// Rescale the threshold, e.g. when measurements are recorded in
    /// milliseconds but the compared values are in seconds.
    pub fn scaled(self, divisor: f64) -> Self {
        NoiseThreshold(self.0 / divisor)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// A change that survived the noise threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedChange {
    /// Signed delta, computed as earlier − later; positive means the later
    /// release is faster.
    pub difference: f64,
    pub direction: Direction,
}

/// Decide whether the delta between two compared values is a real change.
///
/// Undefined deltas (NaN from missing observations) are never a change, and
/// neither is a unit with zero observed influence in both releases; the
/// comparison itself uses strict inequality against the threshold.
pub fn detect(earlier: f64, later: f64, threshold: NoiseThreshold) -> Option<DetectedChange> {
    let difference = earlier - later;
    if !difference.is_finite() {
        return None;
    }
    if earlier == 0.0 && later == 0.0 {
        return None;
    }
    if difference.abs() <= threshold.value() {
        return None;
    }
    let direction = if difference > 0.0 {
        Direction::Improved
    } else {
        Direction::Regressed
    };
    Some(DetectedChange {
        difference,
        direction,
    })
}

/// Convenience wrapper for the common case where the compared values also
/// supply the noise threshold (configuration-level analysis).
pub fn detect_observations(earlier: &Observation, later: &Observation) -> Option<DetectedChange> {
    detect(
        earlier.mean,
        later.mean,
        NoiseThreshold::from_observations(earlier, later),
    )
}

/// Express a delta as a percentage of a baseline value.
///
/// Returns `None` when the baseline is zero or not finite; this corresponds
/// to a non-activated unit and must read as "no change", never as an error.
pub fn percentage(difference: f64, baseline: f64) -> Option<f64> {
    if baseline == 0.0 || !baseline.is_finite() || !difference.is_finite() {
        return None;
    }
    Some(difference / baseline * 100.0)
}
