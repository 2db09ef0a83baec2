// Fantasy points from normalized batting and bowling rates.

use tracing::debug;

use super::stats::{normalize, NormalizedStats, PlayerStat, Role};

/// Multiplier applied to specialist batsmen and bowlers.
pub const SPECIALIST_MULTIPLIER: f64 = 1.2;

/// Points per stumping for wicket keepers.
pub const STUMPING_POINTS: f64 = 2.0;

/// Points per catch for wicket keepers.
pub const CATCH_POINTS: f64 = 1.0;

/// Every intermediate of the points formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointsBreakdown {
    pub batting_strike_rate: f64,
    pub batting_average: f64,
    pub bowling_strike_rate: f64,
    pub economy_rate: f64,
    pub batting_points: f64,
    pub bowling_points: f64,
    /// Batting plus bowling points, before the role adjustment.
    pub base_points: f64,
    /// After the role adjustment, before clamping.
    pub adjusted_points: f64,
}

/// Run the formula and keep every step.
///
/// No clamping or fail-soft handling happens here; use [`compute_points`]
/// for the value the rest of the system consumes.
pub fn compute_breakdown(stats: &NormalizedStats) -> PointsBreakdown {
    let batting_strike_rate = (stats.runs / stats.balls_faced) * 100.0;
    let batting_average = stats.runs / stats.innings_played;
    let bowling_strike_rate = stats.balls_bowled / stats.wickets;
    let economy_rate = (stats.runs_conceded / stats.balls_bowled) * 6.0;

    let batting_points = (batting_strike_rate / 5.0) + ((batting_average * 0.8) / 5.0);
    let bowling_points = (500.0 / bowling_strike_rate) + (140.0 / economy_rate);
    let base_points = batting_points + bowling_points;

    let adjusted_points = match stats.role {
        Some(Role::Batsman) | Some(Role::Bowler) => base_points * SPECIALIST_MULTIPLIER,
        Some(Role::WicketKeeper) => {
            base_points + (stats.stumpings * STUMPING_POINTS) + (stats.catches * CATCH_POINTS)
        }
        Some(Role::AllRounder) | Some(Role::Other) | None => base_points,
    };

    PointsBreakdown {
        batting_strike_rate,
        batting_average,
        bowling_strike_rate,
        economy_rate,
        batting_points,
        bowling_points,
        base_points,
        adjusted_points,
    }
}

/// Fantasy points for normalized statistics.
///
/// Always finite and >= 0: negative totals are clamped to zero and any
/// non-finite intermediate yields zero.
pub fn compute_points(stats: &NormalizedStats) -> f64 {
    let points = compute_breakdown(stats).adjusted_points;
    if !points.is_finite() {
        debug!("points formula produced {points}, scoring as 0");
        return 0.0;
    }
    points.max(0.0)
}

/// Normalize raw statistics and score them.
pub fn player_points(stat: &PlayerStat) -> f64 {
    compute_points(&normalize(stat))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
