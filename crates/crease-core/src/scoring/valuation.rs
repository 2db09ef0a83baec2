// Market value from fantasy points.
//
// value = round((9 * points + 100) * 1000 / 50_000) * 50_000
//
// Player records may also carry a value set by an admin. That stored value
// wins over the formula wherever a player's price is shown or charged.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Values are quoted in steps of this many currency units.
pub const VALUE_INCREMENT: u64 = 50_000;

/// Returned when the formula cannot produce a usable number.
pub const DEFAULT_VALUE: u64 = 1_000_000;

const POINTS_WEIGHT: f64 = 9.0;
const BASE_POINTS: f64 = 100.0;
const UNIT_SCALE: f64 = 1000.0;

/// Where a quoted value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// Assigned on the player record.
    Stored,
    /// Derived from points by [`value_from_points`].
    Computed,
}

/// A player's price together with its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueQuote {
    pub amount: u64,
    pub source: ValueSource,
}

/// Convert points into a value, rounded to the nearest [`VALUE_INCREMENT`].
///
/// Negative points are treated as zero. Non-finite points, or points large
/// enough to overflow, produce [`DEFAULT_VALUE`].
pub fn value_from_points(points: f64) -> u64 {
    if !points.is_finite() {
        debug!("cannot value non-finite points {points}, using default");
        return DEFAULT_VALUE;
    }
    let raw = (POINTS_WEIGHT * points.max(0.0) + BASE_POINTS) * UNIT_SCALE;
    let steps = (raw / VALUE_INCREMENT as f64).round();
    if !steps.is_finite() || steps >= (u64::MAX / VALUE_INCREMENT) as f64 {
        debug!("value for {points} points is out of range, using default");
        return DEFAULT_VALUE;
    }
    steps as u64 * VALUE_INCREMENT
}

/// Choose between a stored value and the computed one.
///
/// A stored value of zero counts as unset, matching how blank admin fields
/// come through. Stored values are used verbatim and need not be multiples
/// of [`VALUE_INCREMENT`].
pub fn resolve_value(stored: Option<u64>, points: f64) -> ValueQuote {
    match stored.filter(|v| *v > 0) {
        Some(amount) => ValueQuote {
            amount,
            source: ValueSource::Stored,
        },
        None => ValueQuote {
            amount: value_from_points(points),
            source: ValueSource::Computed,
        },
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
