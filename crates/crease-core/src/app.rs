// Application facade.
//
// Wires the player store, per-user ledgers, and the leaderboard together.
// Every ledger change is persisted before it becomes visible in memory, and
// the user's leaderboard entry is refreshed right after.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::{Database, LeaderboardEntry};
use crate::ledger::book::{lock, LedgerBook, LedgerHandle};
use crate::ledger::budget::{AddRejection, BudgetLedger, RosterEntry};
use crate::ledger::team_points::compute_team_points;
use crate::players::{load_players, PlayerPool, PlayerRecord};
use crate::scoring::stats::{EstimatedStat, Role};
use crate::scoring::valuation::ValueSource;
use crate::summary::{summarize, TournamentSummary};

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A player as shown when browsing: current points and price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerCard {
    pub id: String,
    pub name: String,
    pub university: String,
    pub role: Option<Role>,
    pub points: f64,
    pub value: u64,
    pub value_source: ValueSource,
    /// Statistics that were estimated to produce `points`.
    pub estimated: Vec<EstimatedStat>,
}

impl PlayerCard {
    fn from_record(player: &PlayerRecord) -> Self {
        let score = player.score();
        PlayerCard {
            id: player.id.clone(),
            name: player.name.clone(),
            university: player.university.clone(),
            role: player.role(),
            points: score.points,
            value: score.value.amount,
            value_source: score.value.source,
            estimated: score.estimated,
        }
    }
}

/// A user's team and budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamView {
    pub user_id: String,
    pub initial_budget: u64,
    pub spent: u64,
    pub remaining: u64,
    pub roster: Vec<RosterEntry>,
    /// Present only for a complete team.
    pub team_points: Option<f64>,
}

// ---------------------------------------------------------------------------
// FantasyApp
// ---------------------------------------------------------------------------

pub struct FantasyApp {
    config: Config,
    db: Database,
    book: LedgerBook,
}

impl FantasyApp {
    pub fn new(config: Config, db: Database) -> Self {
        FantasyApp {
            config,
            db,
            book: LedgerBook::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Import a CSV or JSON player file into the store. Returns the number
    /// of players written.
    pub fn import_players(&self, path: &Path) -> Result<usize> {
        let players = load_players(path)
            .with_context(|| format!("failed to load players from {}", path.display()))?;
        let n = self.db.import_players(&players)?;
        info!("imported {n} players from {}", path.display());
        Ok(n)
    }

    /// Every player in the store with current points and price (stored
    /// budget first, computed value otherwise).
    pub fn player_cards(&self) -> Result<Vec<PlayerCard>> {
        let players = self.db.list_players()?;
        Ok(players.iter().map(PlayerCard::from_record).collect())
    }

    /// The user's team. A user who has never added anyone gets an empty team
    /// with the league's initial budget.
    pub fn team(&self, user_id: &str) -> Result<TeamView> {
        let handle = self.ledger_handle(user_id)?;
        let ledger = lock(&handle);
        let team_points = if ledger.is_complete() {
            compute_team_points(ledger.roster(), &self.player_pool()?)
        } else {
            None
        };
        Ok(TeamView {
            user_id: user_id.to_string(),
            initial_budget: ledger.initial_budget(),
            spent: ledger.spent(),
            remaining: ledger.remaining(),
            roster: ledger.roster().to_vec(),
            team_points,
        })
    }

    /// Add a player to the user's team at the player's current price.
    ///
    /// The outer error covers unknown players and persistence failures; the
    /// inner one is a rule the user broke (duplicate, full team, budget).
    pub fn add_player(
        &self,
        user_id: &str,
        player_id: &str,
    ) -> Result<std::result::Result<RosterEntry, AddRejection>> {
        let Some(player) = self.db.get_player(player_id)? else {
            bail!("unknown player: {player_id}");
        };

        let handle = self.ledger_handle(user_id)?;
        let mut ledger = lock(&handle);

        let mut next = ledger.clone();
        let entry = match next.add_player(&player) {
            Ok(entry) => entry.clone(),
            Err(rejection) => {
                debug!("add of {player_id} for {user_id} rejected: {rejection}");
                return Ok(Err(rejection));
            }
        };

        self.commit(user_id, &mut ledger, next)?;
        info!(
            "{user_id} added {} for {} ({} remaining)",
            entry.player_id,
            entry.value,
            ledger.remaining()
        );
        Ok(Ok(entry))
    }

    /// Remove a player from the user's team, refunding the price paid.
    /// Returns `None` if the player was not on the team.
    pub fn remove_player(&self, user_id: &str, player_id: &str) -> Result<Option<RosterEntry>> {
        let handle = self.ledger_handle(user_id)?;
        let mut ledger = lock(&handle);

        let mut next = ledger.clone();
        let Some(entry) = next.remove_player(player_id) else {
            return Ok(None);
        };

        self.commit(user_id, &mut ledger, next)?;
        info!(
            "{user_id} removed {} refunding {} ({} remaining)",
            entry.player_id,
            entry.value,
            ledger.remaining()
        );
        Ok(Some(entry))
    }

    /// Top teams, up to the configured display limit.
    pub fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        self.db.leaderboard(self.config.leaderboard.display_limit)
    }

    pub fn tournament_summary(&self) -> Result<TournamentSummary> {
        let players = self.db.list_players()?;
        Ok(summarize(&players))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// The user's cached ledger, loading it from the database (or starting
    /// an empty one) on first access.
    fn ledger_handle(&self, user_id: &str) -> Result<LedgerHandle> {
        if let Some(handle) = self.book.get(user_id) {
            return Ok(handle);
        }
        let stored = self.db.load_ledger(user_id)?;
        let initial_budget = self.config.league.initial_budget;
        Ok(self.book.get_or_insert_with(user_id, || {
            stored.unwrap_or_else(|| BudgetLedger::new(initial_budget))
        }))
    }

    /// Persist `next` and make it the user's current ledger, then refresh
    /// the user's leaderboard entry.
    ///
    /// If the save fails the cached ledger is evicted so the next access
    /// reloads whatever is persisted. Once the save succeeds the transition
    /// stands; a failed leaderboard refresh is only logged.
    fn commit(&self, user_id: &str, current: &mut BudgetLedger, next: BudgetLedger) -> Result<()> {
        if let Err(e) = self.db.save_ledger(user_id, &next, persisted_version(current)) {
            warn!("failed to save ledger for {user_id}: {e:#}");
            self.book.evict(user_id);
            return Err(e);
        }
        *current = next;

        // The transition is committed; a stale leaderboard row is corrected
        // by the user's next successful add or remove.
        if let Err(e) = self.publish_team_points(user_id, current) {
            warn!("ledger for {user_id} saved but leaderboard not updated: {e:#}");
        }
        Ok(())
    }

    fn publish_team_points(&self, user_id: &str, ledger: &BudgetLedger) -> Result<()> {
        if !ledger.is_complete() {
            return self.db.clear_team_points(user_id);
        }
        match compute_team_points(ledger.roster(), &self.player_pool()?) {
            Some(points) => {
                debug!("{user_id} team points {points:.2}");
                self.db.record_team_points(user_id, points)
            }
            None => self.db.clear_team_points(user_id),
        }
    }

    fn player_pool(&self) -> Result<PlayerPool> {
        Ok(PlayerPool::from_players(self.db.list_players()?))
    }
}

/// The version stored for a ledger, or `None` if it was never saved.
///
/// Only successful transitions are saved and each one bumps the version, so
/// a ledger at version 0 has no stored row.
fn persisted_version(ledger: &BudgetLedger) -> Option<u64> {
    (ledger.version() > 0).then_some(ledger.version())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
