// Tournament summary for the admin view.

use serde::Serialize;

use crate::players::PlayerRecord;

/// A player and the tally that put them on top.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leader {
    pub player_id: String,
    pub name: String,
    pub total: f64,
}

/// Tournament-wide totals over raw (not normalized) statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TournamentSummary {
    pub players: usize,
    pub total_runs: f64,
    pub total_wickets: f64,
    /// `None` when nobody has scored a run.
    pub top_run_scorer: Option<Leader>,
    /// `None` when nobody has taken a wicket.
    pub top_wicket_taker: Option<Leader>,
}

fn tally(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Highest positive tally; the first player wins ties.
fn leader<'a>(
    players: impl Iterator<Item = &'a PlayerRecord>,
    stat: impl Fn(&PlayerRecord) -> f64,
) -> Option<Leader> {
    let mut best: Option<(&PlayerRecord, f64)> = None;
    for player in players {
        let value = stat(player);
        if value > 0.0 && best.map_or(true, |(_, b)| value > b) {
            best = Some((player, value));
        }
    }
    best.map(|(p, total)| Leader {
        player_id: p.id.clone(),
        name: p.name.clone(),
        total,
    })
}

/// Summarise a set of players.
pub fn summarize(players: &[PlayerRecord]) -> TournamentSummary {
    let runs = |p: &PlayerRecord| tally(p.stats.runs);
    let wickets = |p: &PlayerRecord| tally(p.stats.wickets);

    TournamentSummary {
        players: players.len(),
        total_runs: players.iter().map(runs).sum(),
        total_wickets: players.iter().map(wickets).sum(),
        top_run_scorer: leader(players.iter(), runs),
        top_wicket_taker: leader(players.iter(), wickets),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::stats::PlayerStat;

    fn player(name: &str, runs: Option<f64>, wickets: Option<f64>) -> PlayerRecord {
        PlayerRecord::new(
            name,
            "UoM",
            PlayerStat {
                runs,
                wickets,
                ..Default::default()
            },
        )
    }

    #[test]
    fn empty_pool_has_no_leaders() {
        let s = summarize(&[]);
        assert_eq!(s.players, 0);
        assert_eq!(s.total_runs, 0.0);
        assert!(s.top_run_scorer.is_none());
        assert!(s.top_wicket_taker.is_none());
    }

    #[test]
    fn totals_and_leaders() {
        let players = vec![
            player("Opener", Some(540.0), Some(1.0)),
            player("Seamer", Some(60.0), Some(22.0)),
            player("Spinner", None, Some(18.0)),
            player("Broken", Some(f64::NAN), None),
        ];
        let s = summarize(&players);
        assert_eq!(s.players, 4);
        assert_eq!(s.total_runs, 600.0);
        assert_eq!(s.total_wickets, 41.0);
        let top_bat = s.top_run_scorer.unwrap();
        assert_eq!(top_bat.name, "Opener");
        assert_eq!(top_bat.total, 540.0);
        assert_eq!(s.top_wicket_taker.unwrap().player_id, "seamer-uom");
    }

    #[test]
    fn first_player_wins_ties() {
        let players = vec![
            player("First", Some(100.0), None),
            player("Second", Some(100.0), None),
        ];
        assert_eq!(summarize(&players).top_run_scorer.unwrap().name, "First");
    }

    #[test]
    fn no_wicket_leader_when_nobody_bowled() {
        let players = vec![player("Bat", Some(10.0), Some(0.0))];
        assert!(summarize(&players).top_wicket_taker.is_none());
    }
}
