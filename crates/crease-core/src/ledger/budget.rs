// Team budget ledger: roster of up to eleven players bought against a fixed
// budget.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::players::PlayerRecord;
use crate::scoring::stats::Role;
use crate::scoring::valuation::{ValueQuote, ValueSource};

/// Players on a complete team.
pub const ROSTER_CAPACITY: usize = 11;

/// A player on a user's team, with the price charged when they were added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<Role>,
    /// Amount charged at add time. Refunded unchanged on removal even if the
    /// player's stats or stored price have changed since.
    pub value: u64,
    pub value_source: ValueSource,
}

impl RosterEntry {
    pub fn new(player_id: &str, name: &str, role: Option<Role>, quote: ValueQuote) -> Self {
        RosterEntry {
            player_id: player_id.to_string(),
            name: name.to_string(),
            role,
            value: quote.amount,
            value_source: quote.source,
        }
    }

    /// Build an entry for a player, quoting the stored budget if the record
    /// has one and the computed value otherwise.
    pub fn for_player(player: &PlayerRecord) -> Self {
        RosterEntry::new(&player.id, &player.name, player.role(), player.value())
    }
}

/// Why an add was refused. The messages are shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddRejection {
    #[error("{name} is already in your team")]
    AlreadyInTeam { player_id: String, name: String },

    #[error("your team is full ({capacity} players)")]
    TeamFull { capacity: usize },

    #[error("budget exceeded: {name} costs {value} but only {remaining} remains")]
    BudgetExceeded {
        name: String,
        value: u64,
        remaining: u64,
    },
}

/// A persisted ledger that breaks an invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("roster holds {size} players, more than {capacity}")]
    RosterOverflow { size: usize, capacity: usize },

    #[error("player {player_id} appears more than once on the roster")]
    DuplicatePlayer { player_id: String },

    #[error("roster costs {spent}, more than the budget of {initial_budget}")]
    OverBudget { spent: u64, initial_budget: u64 },
}

/// Serialisable ledger state, as written by roster persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub initial_budget: u64,
    #[serde(default)]
    pub version: u64,
    pub roster: Vec<RosterEntry>,
}

/// One user's team and budget.
///
/// `spent + remaining == initial_budget` and `roster.len() <= 11` hold after
/// every transition; player ids on the roster are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetLedger {
    initial_budget: u64,
    roster: Vec<RosterEntry>,
    spent: u64,
    remaining: u64,
    /// Bumped on every successful add or remove.
    version: u64,
}

impl BudgetLedger {
    /// Create an empty ledger.
    pub fn new(initial_budget: u64) -> Self {
        BudgetLedger {
            initial_budget,
            roster: Vec::new(),
            spent: 0,
            remaining: initial_budget,
            version: 0,
        }
    }

    /// Rebuild a ledger from persisted state.
    ///
    /// Spent and remaining are recomputed from the captured values, so a
    /// snapshot cannot smuggle in a balance that disagrees with its roster.
    pub fn restore(snapshot: LedgerSnapshot) -> Result<Self, LedgerError> {
        let LedgerSnapshot {
            initial_budget,
            version,
            roster,
        } = snapshot;

        if roster.len() > ROSTER_CAPACITY {
            return Err(LedgerError::RosterOverflow {
                size: roster.len(),
                capacity: ROSTER_CAPACITY,
            });
        }

        let mut spent: u64 = 0;
        for (i, entry) in roster.iter().enumerate() {
            if roster[..i].iter().any(|e| e.player_id == entry.player_id) {
                return Err(LedgerError::DuplicatePlayer {
                    player_id: entry.player_id.clone(),
                });
            }
            spent = spent.saturating_add(entry.value);
        }
        if spent > initial_budget {
            return Err(LedgerError::OverBudget {
                spent,
                initial_budget,
            });
        }

        let ledger = BudgetLedger {
            initial_budget,
            roster,
            spent,
            remaining: initial_budget - spent,
            version,
        };
        ledger.check_invariants();
        Ok(ledger)
    }

    /// Persistable copy of the current state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            initial_budget: self.initial_budget,
            version: self.version,
            roster: self.roster.clone(),
        }
    }

    /// Add a player at their current price (stored budget first, computed
    /// value otherwise). See [`BudgetLedger::add_entry`] for the checks.
    pub fn add_player(&mut self, player: &PlayerRecord) -> Result<&RosterEntry, AddRejection> {
        self.add_entry(RosterEntry::for_player(player))
    }

    /// Add an entry to the roster.
    ///
    /// Checks, in order: the player is not already on the roster, the roster
    /// is not full, and the entry's value fits in the remaining budget. A
    /// rejected add leaves the ledger untouched.
    pub fn add_entry(&mut self, entry: RosterEntry) -> Result<&RosterEntry, AddRejection> {
        if let Some(existing) = self.entry(&entry.player_id) {
            return Err(AddRejection::AlreadyInTeam {
                player_id: existing.player_id.clone(),
                name: existing.name.clone(),
            });
        }
        if self.is_full() {
            return Err(AddRejection::TeamFull {
                capacity: ROSTER_CAPACITY,
            });
        }
        if entry.value > self.remaining {
            return Err(AddRejection::BudgetExceeded {
                name: entry.name,
                value: entry.value,
                remaining: self.remaining,
            });
        }

        self.spent += entry.value;
        self.remaining -= entry.value;
        self.version += 1;
        self.roster.push(entry);
        self.check_invariants();

        Ok(&self.roster[self.roster.len() - 1])
    }

    /// Remove a player and refund the value captured when they were added.
    ///
    /// Returns the removed entry, or `None` (leaving the ledger untouched)
    /// if the player is not on the roster.
    pub fn remove_player(&mut self, player_id: &str) -> Option<RosterEntry> {
        let idx = self.roster.iter().position(|e| e.player_id == player_id)?;
        let entry = self.roster.remove(idx);

        self.spent -= entry.value;
        self.remaining += entry.value;
        self.version += 1;
        self.check_invariants();

        Some(entry)
    }

    /// Whether a player is on the roster.
    pub fn contains(&self, player_id: &str) -> bool {
        self.entry(player_id).is_some()
    }

    pub fn entry(&self, player_id: &str) -> Option<&RosterEntry> {
        self.roster.iter().find(|e| e.player_id == player_id)
    }

    /// Roster entries in the order they were added.
    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.roster.len() >= ROSTER_CAPACITY
    }

    /// Whether the roster has exactly the number of players a team needs.
    pub fn is_complete(&self) -> bool {
        self.roster.len() == ROSTER_CAPACITY
    }

    pub fn initial_budget(&self) -> u64 {
        self.initial_budget
    }

    pub fn spent(&self) -> u64 {
        self.spent
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether the ledger's counters agree with each other and the roster.
    pub fn is_balanced(&self) -> bool {
        self.spent + self.remaining == self.initial_budget
            && self.roster.len() <= ROSTER_CAPACITY
            && self.roster.iter().map(|e| e.value).sum::<u64>() == self.spent
    }

    fn check_invariants(&self) {
        debug_assert!(
            self.is_balanced(),
            "ledger out of balance: spent={} remaining={} initial={} roster={}",
            self.spent,
            self.remaining,
            self.initial_budget,
            self.roster.len()
        );
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
