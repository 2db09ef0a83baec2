// Scoring engine: statistic normalizer, points formula, valuation.

pub mod points;
pub mod stats;
pub mod valuation;

use serde::Serialize;

use self::stats::{normalize, EstimatedStat, PlayerStat};
use self::valuation::{resolve_value, ValueQuote};

/// Points and price for one player, with the statistics that were guessed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerScore {
    pub points: f64,
    pub value: ValueQuote,
    pub estimated: Vec<EstimatedStat>,
}

impl PlayerScore {
    pub fn is_estimated(&self) -> bool {
        !self.estimated.is_empty()
    }
}

/// Run the full pipeline: normalize, score, value.
///
/// `stored_value` is the admin-assigned price on the player record, if any;
/// it takes precedence over the computed value.
pub fn score(stat: &PlayerStat, stored_value: Option<u64>) -> PlayerScore {
    let normalized = normalize(stat);
    let points = points::compute_points(&normalized);
    PlayerScore {
        points,
        value: resolve_value(stored_value, points),
        estimated: normalized.estimated,
    }
}
