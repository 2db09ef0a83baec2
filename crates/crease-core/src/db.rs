// SQLite persistence layer for players, team ledgers, and the leaderboard.

use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::Serialize;
use thiserror::Error;

use crate::ledger::budget::{BudgetLedger, LedgerSnapshot};
use crate::players::PlayerRecord;
use crate::scoring::stats::PlayerStat;

/// A ledger save lost a race with another writer.
///
/// Returned (wrapped in `anyhow::Error`) by [`Database::save_ledger`] when
/// the stored version is not the one the caller started from. Callers can
/// recover it with `downcast_ref::<StaleLedger>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ledger for {user_id} changed concurrently (expected version {expected:?}, found {found:?})")]
pub struct StaleLedger {
    pub user_id: String,
    pub expected: Option<u64>,
    pub found: Option<u64>,
}

/// One ranked row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub team_points: f64,
    pub recorded_at: DateTime<Utc>,
}

/// SQLite-backed persistence for the player store, per-user team ledgers,
/// and published team points.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS players (
                id         TEXT PRIMARY KEY,
                name       TEXT NOT NULL,
                university TEXT NOT NULL DEFAULT '',
                role       TEXT,
                stats      TEXT NOT NULL,
                budget     INTEGER,
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS ledgers (
                user_id    TEXT PRIMARY KEY,
                version    INTEGER NOT NULL,
                snapshot   TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS leaderboard (
                user_id     TEXT PRIMARY KEY,
                team_points REAL NOT NULL,
                recorded_at TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// A poisoned mutex is recovered; every multi-statement write runs in a
    /// transaction, so a panicking holder cannot leave partial writes behind.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Insert a player or replace the stored record with the same id.
    pub fn upsert_player(&self, player: &PlayerRecord) -> Result<()> {
        let conn = self.conn();
        write_player(&conn, player)
    }

    /// Import players in a single transaction. Either every record is
    /// written or none are. Returns the number of records written.
    pub fn import_players(&self, players: &[PlayerRecord]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin import transaction")?;
        for player in players {
            write_player(&tx, player)
                .with_context(|| format!("failed to import player {}", player.id))?;
        }
        tx.commit().context("failed to commit import")?;
        Ok(players.len())
    }

    /// Load one player by id. Returns `None` if no such player exists.
    pub fn get_player(&self, player_id: &str) -> Result<Option<PlayerRecord>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT id, name, university, stats, budget FROM players WHERE id = ?1",
                params![player_id],
                PlayerRow::from_row,
            )
            .optional()
            .context("failed to query player")?;
        row.map(PlayerRow::into_record).transpose()
    }

    /// All players, ordered by name then id.
    pub fn list_players(&self) -> Result<Vec<PlayerRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, name, university, stats, budget FROM players ORDER BY name, id")
            .context("failed to prepare list_players query")?;

        let rows = stmt
            .query_map([], PlayerRow::from_row)
            .context("failed to query players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player rows")?;

        rows.into_iter().map(PlayerRow::into_record).collect()
    }

    /// Delete a player. Returns `true` if a row was removed. Rosters that
    /// already hold the player keep their entry and its captured price.
    pub fn delete_player(&self, player_id: &str) -> Result<bool> {
        let conn = self.conn();
        let n = conn
            .execute("DELETE FROM players WHERE id = ?1", params![player_id])
            .context("failed to delete player")?;
        Ok(n > 0)
    }

    pub fn player_count(&self) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))
            .context("failed to count players")?;
        Ok(count as usize)
    }

    // ------------------------------------------------------------------
    // Ledgers
    // ------------------------------------------------------------------

    /// Load a user's ledger. Returns `None` if the user has never saved one.
    pub fn load_ledger(&self, user_id: &str) -> Result<Option<BudgetLedger>> {
        let conn = self.conn();
        let json: Option<String> = conn
            .query_row(
                "SELECT snapshot FROM ledgers WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query ledger")?;

        let Some(json) = json else {
            return Ok(None);
        };
        let snapshot: LedgerSnapshot = serde_json::from_str(&json)
            .with_context(|| format!("failed to deserialize ledger for {user_id}"))?;
        let ledger = BudgetLedger::restore(snapshot)
            .with_context(|| format!("stored ledger for {user_id} is inconsistent"))?;
        Ok(Some(ledger))
    }

    /// Persist a user's whole ledger.
    ///
    /// `base_version` is the version the caller loaded before changing the
    /// ledger (`None` if there was no stored ledger). If the stored version
    /// differs, nothing is written and a [`StaleLedger`] error is returned.
    pub fn save_ledger(
        &self,
        user_id: &str,
        ledger: &BudgetLedger,
        base_version: Option<u64>,
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin ledger transaction")?;

        let found = stored_version(&tx, user_id)?;
        if found != base_version {
            return Err(StaleLedger {
                user_id: user_id.to_string(),
                expected: base_version,
                found,
            }
            .into());
        }

        let json = serde_json::to_string(&ledger.snapshot())
            .context("failed to serialize ledger snapshot")?;
        let version = i64::try_from(ledger.version()).context("ledger version out of range")?;
        tx.execute(
            "INSERT INTO ledgers (user_id, version, snapshot) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                version    = excluded.version,
                snapshot   = excluded.snapshot,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
            params![user_id, version, json],
        )
        .context("failed to save ledger")?;
        tx.commit().context("failed to commit ledger save")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Leaderboard
    // ------------------------------------------------------------------

    /// Publish a user's team points, replacing any earlier figure.
    pub fn record_team_points(&self, user_id: &str, team_points: f64) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR REPLACE INTO leaderboard (user_id, team_points, recorded_at)
             VALUES (?1, ?2, ?3)",
            params![user_id, team_points, Utc::now().to_rfc3339()],
        )
        .context("failed to record team points")?;
        Ok(())
    }

    /// Withdraw a user from the leaderboard (their team is no longer
    /// complete). A no-op if they were not on it.
    pub fn clear_team_points(&self, user_id: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM leaderboard WHERE user_id = ?1",
            params![user_id],
        )
        .context("failed to clear team points")?;
        Ok(())
    }

    /// Top `limit` teams by points, highest first. Equal points rank by user
    /// id.
    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let conn = self.conn();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = conn
            .prepare(
                "SELECT user_id, team_points, recorded_at FROM leaderboard
                 ORDER BY team_points DESC, user_id ASC LIMIT ?1",
            )
            .context("failed to prepare leaderboard query")?;

        let rows = stmt
            .query_map(params![limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .context("failed to query leaderboard")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map leaderboard rows")?;

        rows.into_iter()
            .enumerate()
            .map(|(i, (user_id, team_points, recorded_at))| {
                let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
                    .with_context(|| format!("bad leaderboard timestamp for {user_id}"))?
                    .with_timezone(&Utc);
                Ok(LeaderboardEntry {
                    rank: i + 1,
                    user_id,
                    team_points,
                    recorded_at,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

/// Player columns as read, before the stats JSON is decoded.
struct PlayerRow {
    id: String,
    name: String,
    university: String,
    stats: String,
    budget: Option<i64>,
}

impl PlayerRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(PlayerRow {
            id: row.get(0)?,
            name: row.get(1)?,
            university: row.get(2)?,
            stats: row.get(3)?,
            budget: row.get(4)?,
        })
    }

    fn into_record(self) -> Result<PlayerRecord> {
        let stats: PlayerStat = serde_json::from_str(&self.stats)
            .with_context(|| format!("failed to deserialize stats for {}", self.id))?;
        Ok(PlayerRecord {
            id: self.id,
            name: self.name,
            university: self.university,
            stats,
            // Negative prices are treated as unset
            budget: self.budget.and_then(|b| u64::try_from(b).ok()),
        })
    }
}

fn write_player(conn: &Connection, player: &PlayerRecord) -> Result<()> {
    let stats_json =
        serde_json::to_string(&player.stats).context("failed to serialize player stats")?;
    let budget = player
        .budget
        .map(i64::try_from)
        .transpose()
        .context("player budget out of range")?;
    let role = player.role().map(|r| r.display_str());

    conn.execute(
        "INSERT INTO players (id, name, university, role, stats, budget)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            name       = excluded.name,
            university = excluded.university,
            role       = excluded.role,
            stats      = excluded.stats,
            budget     = excluded.budget,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        params![player.id, player.name, player.university, role, stats_json, budget],
    )
    .context("failed to upsert player")?;
    Ok(())
}

fn stored_version(tx: &Transaction<'_>, user_id: &str) -> Result<Option<u64>> {
    let version: Option<i64> = tx
        .query_row(
            "SELECT version FROM ledgers WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()
        .context("failed to read ledger version")?;
    version
        .map(u64::try_from)
        .transpose()
        .context("stored ledger version is negative")
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::budget::RosterEntry;
    use crate::scoring::stats::Role;
    use crate::scoring::valuation::{ValueQuote, ValueSource};

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn sample_player(name: &str, budget: Option<u64>) -> PlayerRecord {
        PlayerRecord {
            budget,
            ..PlayerRecord::new(
                name,
                "University of Moratuwa",
                PlayerStat {
                    runs: Some(1200.0),
                    balls_faced: Some(950.0),
                    innings_played: Some(24.0),
                    role: Some(Role::Batsman),
                    ..Default::default()
                },
            )
        }
    }

    fn entry(id: &str, amount: u64) -> RosterEntry {
        RosterEntry::new(
            id,
            id,
            None,
            ValueQuote {
                amount,
                source: ValueSource::Computed,
            },
        )
    }

    // ------------------------------------------------------------------
    // Schema / open
    // ------------------------------------------------------------------

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"players".to_string()));
        assert!(tables.contains(&"ledgers".to_string()));
        assert!(tables.contains(&"leaderboard".to_string()));
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    #[test]
    fn upsert_and_get_player_round_trip() {
        let db = test_db();
        let player = sample_player("Kasun Perera", Some(750_000));
        db.upsert_player(&player).unwrap();

        let loaded = db.get_player(&player.id).unwrap().unwrap();
        assert_eq!(loaded, player);
        assert_eq!(loaded.role(), Some(Role::Batsman));
    }

    #[test]
    fn upsert_replaces_existing_player() {
        let db = test_db();
        let mut player = sample_player("Kasun Perera", None);
        db.upsert_player(&player).unwrap();

        player.stats.runs = Some(1500.0);
        player.budget = Some(2_000_000);
        db.upsert_player(&player).unwrap();

        assert_eq!(db.player_count().unwrap(), 1);
        let loaded = db.get_player(&player.id).unwrap().unwrap();
        assert_eq!(loaded.stats.runs, Some(1500.0));
        assert_eq!(loaded.budget, Some(2_000_000));
    }

    #[test]
    fn get_missing_player_returns_none() {
        let db = test_db();
        assert!(db.get_player("nobody").unwrap().is_none());
    }

    #[test]
    fn import_and_list_players() {
        let db = test_db();
        let players = vec![
            sample_player("Zane", None),
            sample_player("Asela", Some(100_000)),
        ];
        assert_eq!(db.import_players(&players).unwrap(), 2);

        let listed = db.list_players().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Asela");
        assert_eq!(listed[1].name, "Zane");
    }

    #[test]
    fn delete_player() {
        let db = test_db();
        let player = sample_player("Kasun Perera", None);
        db.upsert_player(&player).unwrap();

        assert!(db.delete_player(&player.id).unwrap());
        assert!(!db.delete_player(&player.id).unwrap());
        assert_eq!(db.player_count().unwrap(), 0);
    }

    // ------------------------------------------------------------------
    // Ledgers
    // ------------------------------------------------------------------

    #[test]
    fn load_missing_ledger_returns_none() {
        let db = test_db();
        assert!(db.load_ledger("alice").unwrap().is_none());
    }

    #[test]
    fn save_and_load_ledger_round_trip() {
        let db = test_db();
        let mut ledger = BudgetLedger::new(900_000_000);
        ledger.add_entry(entry("p1", 100_000_000)).unwrap();
        ledger.add_entry(entry("p2", 50_000)).unwrap();

        db.save_ledger("alice", &ledger, None).unwrap();

        let loaded = db.load_ledger("alice").unwrap().unwrap();
        assert_eq!(loaded, ledger);
        assert_eq!(loaded.remaining(), 799_950_000);
        assert_eq!(loaded.version(), 2);
    }

    #[test]
    fn save_with_matching_base_version_succeeds() {
        let db = test_db();
        let mut ledger = BudgetLedger::new(1_000);
        ledger.add_entry(entry("p1", 100)).unwrap();
        db.save_ledger("alice", &ledger, None).unwrap();

        let base = ledger.version();
        ledger.remove_player("p1").unwrap();
        db.save_ledger("alice", &ledger, Some(base)).unwrap();

        let loaded = db.load_ledger("alice").unwrap().unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.remaining(), 1_000);
    }

    #[test]
    fn stale_save_is_rejected() {
        let db = test_db();
        let mut first = BudgetLedger::new(1_000);
        first.add_entry(entry("p1", 100)).unwrap();
        db.save_ledger("alice", &first, None).unwrap();

        // A second writer that also started from "no row"
        let mut second = BudgetLedger::new(1_000);
        second.add_entry(entry("p2", 200)).unwrap();
        let err = db.save_ledger("alice", &second, None).unwrap_err();

        let stale = err.downcast_ref::<StaleLedger>().expect("should be StaleLedger");
        assert_eq!(stale.expected, None);
        assert_eq!(stale.found, Some(1));

        // Stored state is the first writer's
        let loaded = db.load_ledger("alice").unwrap().unwrap();
        assert!(loaded.contains("p1"));
        assert!(!loaded.contains("p2"));
    }

    #[test]
    fn inconsistent_stored_ledger_fails_to_load() {
        let db = test_db();
        {
            let conn = db.conn();
            conn.execute(
                "INSERT INTO ledgers (user_id, version, snapshot) VALUES ('alice', 1, ?1)",
                params![r#"{"initial_budget":100,"version":1,"roster":[
                    {"player_id":"p1","name":"P1","value":500,"value_source":"stored"}]}"#],
            )
            .unwrap();
        }
        assert!(db.load_ledger("alice").is_err());
    }

    // ------------------------------------------------------------------
    // Leaderboard
    // ------------------------------------------------------------------

    #[test]
    fn leaderboard_orders_by_points_then_user() {
        let db = test_db();
        db.record_team_points("carol", 410.5).unwrap();
        db.record_team_points("alice", 520.0).unwrap();
        db.record_team_points("bob", 410.5).unwrap();

        let board = db.leaderboard(10).unwrap();
        let users: Vec<&str> = board.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(users, vec!["alice", "bob", "carol"]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[2].rank, 3);
    }

    #[test]
    fn leaderboard_respects_limit() {
        let db = test_db();
        for (i, user) in ["a", "b", "c", "d"].iter().enumerate() {
            db.record_team_points(user, i as f64).unwrap();
        }
        let board = db.leaderboard(2).unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].user_id, "d");
    }

    #[test]
    fn record_replaces_and_clear_removes() {
        let db = test_db();
        db.record_team_points("alice", 100.0).unwrap();
        db.record_team_points("alice", 250.0).unwrap();

        let board = db.leaderboard(10).unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].team_points, 250.0);

        db.clear_team_points("alice").unwrap();
        assert!(db.leaderboard(10).unwrap().is_empty());
        // Clearing again is a no-op
        db.clear_team_points("alice").unwrap();
    }
}
