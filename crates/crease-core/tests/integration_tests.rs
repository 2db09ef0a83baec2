// Integration tests for crease.
//
// These exercise the library end-to-end through its public API: player
// import from the fixture files, scoring, the team ledger with persistence,
// leaderboard publication, and configuration loading.

use std::fs;
use std::path::{Path, PathBuf};

use crease_core::app::FantasyApp;
use crease_core::config::{self, Config};
use crease_core::db::Database;
use crease_core::ledger::budget::{AddRejection, ROSTER_CAPACITY};
use crease_core::players::{load_players, PlayerPool, PlayerSource};
use crease_core::scoring::stats::{EstimatedStat, Role};
use crease_core::scoring::valuation::ValueSource;

// ===========================================================================
// Test helpers
// ===========================================================================

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Workspace root, where `defaults/` lives.
fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Fresh temp dir holding a copy of `defaults/`, loaded through the normal
/// first-run path.
fn temp_config(name: &str) -> (PathBuf, Config) {
    let tmp = std::env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&tmp);
    let defaults = tmp.join("defaults");
    fs::create_dir_all(&defaults).unwrap();
    for file in ["league.toml", "app.toml"] {
        fs::copy(project_root().join("defaults").join(file), defaults.join(file)).unwrap();
    }
    config::ensure_config_files(&tmp).unwrap();
    let config = config::load_config_from(&tmp).unwrap();
    (tmp, config)
}

/// The eleven players used for a complete team in these tests.
const TEAM: [&str; ROSTER_CAPACITY] = [
    "kasun-perera-uom",
    "nimal",
    "ruwan",
    "dinesh",
    "tharindu",
    "sahan",
    "isuru",
    "chathura",
    "lahiru",
    "asela",
    "kavindu",
];

// ===========================================================================
// Import
// ===========================================================================

#[test]
fn csv_fixture_skips_bad_rows_and_keeps_last_duplicate() {
    let players = load_players(&fixture("players.csv")).unwrap();

    // 15 rows: one malformed, one without a name, one duplicate id
    assert_eq!(players.len(), 12);
    assert!(players.iter().all(|p| p.id != "bad"));

    // Duplicate keeps the later row in the earlier position
    assert_eq!(players[1].id, "nimal");
    assert_eq!(players[1].budget, Some(450_000));

    // Blank id derived from name and university
    assert_eq!(players[0].id, "kasun-perera-uom");

    let pool = PlayerPool::from_players(players);
    assert_eq!(pool.get("pasindu").unwrap().name, "Pasindu Herath");
    assert_eq!(pool.get("isuru").unwrap().role(), Some(Role::AllRounder));
    assert_eq!(pool.get("asela").unwrap().role(), Some(Role::WicketKeeper));
    // `matches` stands in for a missing innings count
    assert_eq!(pool.player_stats("sahan").unwrap().matches, Some(12.0));
}

#[test]
fn json_fixture_accepts_aliases() {
    let players = load_players(&fixture("players.json")).unwrap();
    assert_eq!(players.len(), 3);

    assert_eq!(players[1].id, "sahan-wickrama-usj");
    assert_eq!(players[1].budget, Some(750_000));
    assert_eq!(players[1].stats.balls_faced, Some(80.0));
    assert_eq!(players[2].budget, Some(400_000));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_players(&fixture("no_such_file.csv")).unwrap_err();
    assert!(err.to_string().contains("failed to read file"));
}

// ===========================================================================
// Scoring
// ===========================================================================

#[test]
fn batsman_example_scores_and_values() {
    let players = load_players(&fixture("players.csv")).unwrap();
    let kasun = &players[0];

    let score = kasun.score();
    assert!((score.points - 98.515_789_473_684_2).abs() < 1e-9);
    assert_eq!(score.value.amount, 1_000_000);
    assert_eq!(score.value.source, ValueSource::Computed);
    assert_eq!(
        score.estimated,
        vec![
            EstimatedStat::Wickets,
            EstimatedStat::BallsBowled,
            EstimatedStat::RunsConceded
        ]
    );

    // The same player from the JSON document scores identically
    let json = load_players(&fixture("players.json")).unwrap();
    assert_eq!(json[0].score(), score);
}

#[test]
fn every_fixture_player_has_non_negative_points_and_valid_value() {
    let players = load_players(&fixture("players.csv")).unwrap();
    for player in &players {
        let score = player.score();
        assert!(score.points >= 0.0, "{} scored {}", player.id, score.points);
        assert_eq!(score.value.amount % 50_000, 0, "{}", player.id);
    }
}

// ===========================================================================
// Full pipeline
// ===========================================================================

#[test]
fn full_pipeline_builds_publishes_and_withdraws_a_team() {
    let (tmp, config) = temp_config("crease_it_pipeline");
    assert_eq!(config.league.initial_budget, 9_000_000);

    let db = Database::open(":memory:").unwrap();
    let app = FantasyApp::new(config, db);
    assert_eq!(app.import_players(&fixture("players.csv")).unwrap(), 12);

    for id in TEAM {
        let entry = app.add_player("alice", id).unwrap().unwrap();
        assert_eq!(entry.player_id, id);
    }

    let team = app.team("alice").unwrap();
    assert_eq!(team.roster.len(), ROSTER_CAPACITY);
    // Kasun at the computed 1,000,000; Nimal at 450,000; nine at 400,000
    assert_eq!(team.spent, 5_050_000);
    assert_eq!(team.remaining, 3_950_000);
    assert_eq!(team.spent + team.remaining, team.initial_budget);

    let expected: f64 = app
        .player_cards()
        .unwrap()
        .iter()
        .filter(|c| TEAM.contains(&c.id.as_str()))
        .map(|c| c.points)
        .sum();
    let points = team.team_points.unwrap();
    assert!((points - expected).abs() < 1e-6);

    let board = app.leaderboard().unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].rank, 1);
    assert_eq!(board[0].user_id, "alice");

    // Twelfth player is refused regardless of budget
    let full = app.add_player("alice", "pasindu").unwrap().unwrap_err();
    assert_eq!(full, AddRejection::TeamFull { capacity: 11 });

    // Dropping to ten players takes the team off the leaderboard
    let removed = app.remove_player("alice", "nimal").unwrap().unwrap();
    assert_eq!(removed.value, 450_000);
    assert!(app.leaderboard().unwrap().is_empty());
    assert_eq!(app.team("alice").unwrap().remaining, 4_400_000);

    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn exact_budget_fits_and_one_more_unit_does_not() {
    let (tmp, mut config) = temp_config("crease_it_exact_budget");
    config.league.initial_budget = 1_000_000;

    let app = FantasyApp::new(config, Database::open(":memory:").unwrap());
    app.import_players(&fixture("players.csv")).unwrap();

    app.add_player("bob", "kasun-perera-uom").unwrap().unwrap();
    assert_eq!(app.team("bob").unwrap().remaining, 0);

    let err = app.add_player("bob", "ruwan").unwrap().unwrap_err();
    assert_eq!(
        err,
        AddRejection::BudgetExceeded {
            name: "Ruwan Fernando".into(),
            value: 400_000,
            remaining: 0,
        }
    );
    assert_eq!(err.to_string(), "budget exceeded: Ruwan Fernando costs 400000 but only 0 remains");

    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn teams_persist_across_reopen() {
    let (tmp, config) = temp_config("crease_it_persist");
    let db_path = tmp.join("crease.db");
    let db_path = db_path.to_str().unwrap();

    {
        let app = FantasyApp::new(config.clone(), Database::open(db_path).unwrap());
        app.import_players(&fixture("players.csv")).unwrap();
        for id in TEAM {
            app.add_player("carol", id).unwrap().unwrap();
        }
        app.add_player("dave", "pasindu").unwrap().unwrap();
    }

    let app = FantasyApp::new(config, Database::open(db_path).unwrap());
    let carol = app.team("carol").unwrap();
    assert_eq!(carol.roster.len(), ROSTER_CAPACITY);
    assert_eq!(carol.remaining, 3_950_000);
    assert!(carol.team_points.is_some());

    let dave = app.team("dave").unwrap();
    assert_eq!(dave.roster.len(), 1);
    assert_eq!(dave.team_points, None);

    let board = app.leaderboard().unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].user_id, "carol");

    // Refund after reopen uses the captured price
    let removed = app.remove_player("carol", "kasun-perera-uom").unwrap().unwrap();
    assert_eq!(removed.value, 1_000_000);

    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn captured_price_survives_store_edits() {
    let (tmp, config) = temp_config("crease_it_captured");
    let app = FantasyApp::new(config, Database::open(":memory:").unwrap());
    app.import_players(&fixture("players.csv")).unwrap();

    app.add_player("erin", "ruwan").unwrap().unwrap();

    let mut ruwan = app.db().get_player("ruwan").unwrap().unwrap();
    ruwan.budget = Some(2_000_000);
    app.db().upsert_player(&ruwan).unwrap();

    let removed = app.remove_player("erin", "ruwan").unwrap().unwrap();
    assert_eq!(removed.value, 400_000);
    assert_eq!(app.team("erin").unwrap().remaining, 9_000_000);

    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn tournament_summary_over_fixture() {
    let (tmp, config) = temp_config("crease_it_summary");
    let app = FantasyApp::new(config, Database::open(":memory:").unwrap());
    app.import_players(&fixture("players.csv")).unwrap();

    let summary = app.tournament_summary().unwrap();
    assert_eq!(summary.players, 12);
    assert_eq!(summary.top_run_scorer.unwrap().player_id, "kasun-perera-uom");
    assert_eq!(summary.top_wicket_taker.unwrap().player_id, "lahiru");
    assert_eq!(summary.total_wickets, 122.0);

    let _ = fs::remove_dir_all(&tmp);
}
