// Team points for the leaderboard.

use tracing::warn;

use super::budget::{RosterEntry, ROSTER_CAPACITY};
use crate::players::PlayerSource;
use crate::scoring::points::player_points;

/// Total points of a complete team.
///
/// Returns `None` unless the roster holds exactly [`ROSTER_CAPACITY`]
/// players; partial teams have no score. Points are recomputed from the
/// source's current statistics, not from anything captured at add time. A
/// player the source no longer knows contributes nothing.
pub fn compute_team_points(roster: &[RosterEntry], source: &impl PlayerSource) -> Option<f64> {
    if roster.len() != ROSTER_CAPACITY {
        return None;
    }
    let total: f64 = roster
        .iter()
        .map(|entry| match source.player_stats(&entry.player_id) {
            Some(stats) => player_points(&stats),
            None => {
                warn!(
                    "player '{}' on roster has no stats, counting 0 points",
                    entry.player_id
                );
                0.0
            }
        })
        .sum();
    Some(total)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
