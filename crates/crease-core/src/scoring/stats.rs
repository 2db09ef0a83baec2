// Raw player statistics and the normalizer that fills gaps in them.
//
// Player records arrive from admin forms and imports with whatever fields
// the source happened to have. The normalizer turns them into a complete set
// of working numbers so the points formula never divides by zero. Every
// substitution is recorded so the caller can see which numbers were guessed.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fallback constants
// ---------------------------------------------------------------------------

/// Balls faced per run, used when balls faced is unknown.
pub const BALLS_FACED_PER_RUN: f64 = 0.7;

/// Wicket count substituted for a missing or zero wicket tally.
pub const WICKETS_FLOOR: f64 = 0.1;

/// Balls bowled per wicket, used when balls bowled is unknown.
pub const BALLS_BOWLED_PER_WICKET: f64 = 24.0;

/// Runs conceded per wicket, used when runs conceded is unknown.
pub const RUNS_CONCEDED_PER_WICKET: f64 = 20.0;

/// Last-resort value for any denominator that could not be estimated.
const DENOMINATOR_FLOOR: f64 = 1.0;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Playing role, which decides the role adjustment in the points formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Batsman,
    Bowler,
    AllRounder,
    WicketKeeper,
    /// Anything unrecognised. Scored like an all-rounder (no adjustment).
    Other,
}

impl Role {
    /// Parse a role string.
    ///
    /// Case, spaces, hyphens and underscores are ignored, so "All-Rounder",
    /// "all rounder" and "ALL_ROUNDER" are the same role.
    pub fn from_str_role(s: &str) -> Option<Self> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "batsman" | "batter" => Some(Role::Batsman),
            "bowler" => Some(Role::Bowler),
            "allrounder" => Some(Role::AllRounder),
            "wicketkeeper" | "keeper" => Some(Role::WicketKeeper),
            _ => None,
        }
    }

    /// Return the display string for this role.
    pub fn display_str(&self) -> &'static str {
        match self {
            Role::Batsman => "Batsman",
            Role::Bowler => "Bowler",
            Role::AllRounder => "All-Rounder",
            Role::WicketKeeper => "WicketKeeper",
            Role::Other => "Other",
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Role::from_str_role(&s).unwrap_or(Role::Other)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.display_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_str())
    }
}

// ---------------------------------------------------------------------------
// PlayerStat (input)
// ---------------------------------------------------------------------------

/// Raw, possibly partial statistics for one player.
///
/// Field names follow the camelCase used by the player documents, with
/// snake_case aliases accepted on input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<f64>,
    #[serde(default, alias = "balls_faced", skip_serializing_if = "Option::is_none")]
    pub balls_faced: Option<f64>,
    #[serde(default, alias = "innings_played", skip_serializing_if = "Option::is_none")]
    pub innings_played: Option<f64>,
    /// Older documents carry `matches` instead of `inningsPlayed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wickets: Option<f64>,
    #[serde(default, alias = "balls_bowled", skip_serializing_if = "Option::is_none")]
    pub balls_bowled: Option<f64>,
    #[serde(default, alias = "runs_conceded", skip_serializing_if = "Option::is_none")]
    pub runs_conceded: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stumpings: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catches: Option<f64>,
}

// ---------------------------------------------------------------------------
// Normalized output
// ---------------------------------------------------------------------------

/// A statistic that the normalizer had to estimate or floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EstimatedStat {
    InningsPlayed,
    BallsFaced,
    Wickets,
    BallsBowled,
    RunsConceded,
}

/// Complete working statistics, ready for the points formula.
///
/// `innings_played`, `balls_faced`, `wickets`, `balls_bowled` and
/// `runs_conceded` are never zero or NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedStats {
    pub runs: f64,
    pub balls_faced: f64,
    pub innings_played: f64,
    pub wickets: f64,
    pub balls_bowled: f64,
    pub runs_conceded: f64,
    pub stumpings: f64,
    pub catches: f64,
    pub role: Option<Role>,
    /// Statistics that were substituted rather than read from the input,
    /// in the order the fallbacks were applied.
    pub estimated: Vec<EstimatedStat>,
}

impl NormalizedStats {
    /// Whether any statistic was estimated.
    pub fn is_estimated(&self) -> bool {
        !self.estimated.is_empty()
    }

    /// Whether the given statistic was estimated.
    pub fn was_estimated(&self, stat: EstimatedStat) -> bool {
        self.estimated.contains(&stat)
    }
}

/// A value counts as present only when it is non-zero and not NaN.
/// Missing, zero and NaN inputs all take the fallback path.
fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && !v.is_nan())
}

fn or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| !v.is_nan()).unwrap_or(0.0)
}

/// Fill in missing statistics.
///
/// Fallback chains, each applied only when the earlier link is absent:
/// - innings played <- matches <- 1
/// - balls faced <- runs * 0.7 <- 1
/// - wickets <- 0.1
/// - balls bowled <- wickets * 24 <- 1
/// - runs conceded <- wickets * 20 <- 1
///
/// The bowling estimates use the normalized wicket count, so a player with
/// no bowling data ends up with 2.4 balls bowled and 2 runs conceded.
pub fn normalize(stat: &PlayerStat) -> NormalizedStats {
    let mut estimated = Vec::new();
    let runs = or_zero(stat.runs);

    let innings_played = match present(stat.innings_played).or(present(stat.matches)) {
        Some(v) => v,
        None => {
            estimated.push(EstimatedStat::InningsPlayed);
            DENOMINATOR_FLOOR
        }
    };

    let balls_faced = match present(stat.balls_faced) {
        Some(v) => v,
        None => {
            estimated.push(EstimatedStat::BallsFaced);
            present(Some(runs * BALLS_FACED_PER_RUN)).unwrap_or(DENOMINATOR_FLOOR)
        }
    };

    let wickets = match present(stat.wickets) {
        Some(v) => v,
        None => {
            estimated.push(EstimatedStat::Wickets);
            WICKETS_FLOOR
        }
    };

    let balls_bowled = match present(stat.balls_bowled) {
        Some(v) => v,
        None => {
            estimated.push(EstimatedStat::BallsBowled);
            present(Some(wickets * BALLS_BOWLED_PER_WICKET)).unwrap_or(DENOMINATOR_FLOOR)
        }
    };

    let runs_conceded = match present(stat.runs_conceded) {
        Some(v) => v,
        None => {
            estimated.push(EstimatedStat::RunsConceded);
            present(Some(wickets * RUNS_CONCEDED_PER_WICKET)).unwrap_or(DENOMINATOR_FLOOR)
        }
    };

    NormalizedStats {
        runs,
        balls_faced,
        innings_played,
        wickets,
        balls_bowled,
        runs_conceded,
        stumpings: or_zero(stat.stumpings),
        catches: or_zero(stat.catches),
        role: stat.role,
        estimated,
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
