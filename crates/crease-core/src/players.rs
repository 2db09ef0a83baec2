// Player records, the in-memory player pool, and CSV/JSON import.
//
// CSV files use one row per player with snake_case stat columns; JSON files
// hold an array of player documents with a nested `stats` object.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::scoring::points::player_points;
use crate::scoring::stats::{PlayerStat, Role};
use crate::scoring::valuation::{resolve_value, ValueQuote};
use crate::scoring::{score, PlayerScore};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One player as kept by the player store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Stable identity. Derived from name and university when an import
    /// leaves it blank.
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub university: String,
    #[serde(default)]
    pub stats: PlayerStat,
    /// Admin-assigned price. Overrides the computed value when set.
    #[serde(
        default,
        alias = "value",
        deserialize_with = "deserialize_budget",
        skip_serializing_if = "Option::is_none"
    )]
    pub budget: Option<u64>,
}

/// Stored prices arrive as any JSON or CSV number. Non-finite and
/// non-positive amounts count as unset; fractions are rounded.
fn price_from_number(amount: f64) -> Option<u64> {
    (amount.is_finite() && amount > 0.0).then(|| amount.round() as u64)
}

fn deserialize_budget<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let amount = Option::<f64>::deserialize(deserializer)?;
    Ok(amount.and_then(price_from_number))
}

impl PlayerRecord {
    pub fn new(name: &str, university: &str, stats: PlayerStat) -> Self {
        PlayerRecord {
            id: player_id(name, university),
            name: name.to_string(),
            university: university.to_string(),
            stats,
            budget: None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.stats.role
    }

    /// Fantasy points from the current statistics.
    pub fn points(&self) -> f64 {
        player_points(&self.stats)
    }

    /// Price of this player: the stored budget if set, otherwise computed.
    pub fn value(&self) -> ValueQuote {
        resolve_value(self.budget, self.points())
    }

    /// Points, price, and estimate flags in one pass.
    pub fn score(&self) -> PlayerScore {
        score(&self.stats, self.budget)
    }
}

/// Lookup of current statistics by player id.
pub trait PlayerSource {
    fn player_stats(&self, player_id: &str) -> Option<PlayerStat>;
}

/// In-memory player store keyed by id.
#[derive(Debug, Clone, Default)]
pub struct PlayerPool {
    players: HashMap<String, PlayerRecord>,
}

impl PlayerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from records. Later records replace earlier ones with
    /// the same id.
    pub fn from_players(players: Vec<PlayerRecord>) -> Self {
        let mut pool = PlayerPool::new();
        for player in players {
            if let Some(previous) = pool.insert(player) {
                warn!("duplicate player id '{}', keeping the later record", previous.id);
            }
        }
        pool
    }

    /// Insert or replace a player, returning the record it replaced.
    pub fn insert(&mut self, player: PlayerRecord) -> Option<PlayerRecord> {
        self.players.insert(player.id.clone(), player)
    }

    pub fn get(&self, player_id: &str) -> Option<&PlayerRecord> {
        self.players.get(player_id)
    }

    pub fn get_mut(&mut self, player_id: &str) -> Option<&mut PlayerRecord> {
        self.players.get_mut(player_id)
    }

    pub fn remove(&mut self, player_id: &str) -> Option<PlayerRecord> {
        self.players.remove(player_id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }
}

impl PlayerSource for PlayerPool {
    fn player_stats(&self, player_id: &str) -> Option<PlayerStat> {
        self.get(player_id).map(|p| p.stats.clone())
    }
}

/// Derive a player id from name and university, e.g.
/// `("Kasun Perera", "UoM")` -> `"kasun-perera-uom"`.
pub fn player_id(name: &str, university: &str) -> String {
    let slug = |s: &str| -> String {
        let mapped: String = s
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .flat_map(char::to_lowercase)
            .collect();
        mapped
            .split('-')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    };
    let name = slug(name);
    let university = slug(university);
    if university.is_empty() {
        name
    } else {
        format!("{name}-{university}")
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Raw CSV row (private)
// ---------------------------------------------------------------------------

/// One CSV row. Every stat column is optional; blank cells read as `None`.
#[derive(Debug, Deserialize)]
struct RawPlayerRow {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    university: String,
    #[serde(default, alias = "category")]
    role: String,
    #[serde(default, alias = "total_runs")]
    runs: Option<f64>,
    #[serde(default, alias = "ballsFaced")]
    balls_faced: Option<f64>,
    #[serde(default, alias = "inningsPlayed")]
    innings_played: Option<f64>,
    #[serde(default)]
    matches: Option<f64>,
    #[serde(default)]
    wickets: Option<f64>,
    #[serde(default, alias = "ballsBowled")]
    balls_bowled: Option<f64>,
    #[serde(default, alias = "runsConceded")]
    runs_conceded: Option<f64>,
    #[serde(default)]
    stumpings: Option<f64>,
    #[serde(default)]
    catches: Option<f64>,
    #[serde(default, alias = "value")]
    budget: Option<f64>,
}

impl RawPlayerRow {
    fn into_record(self) -> PlayerRecord {
        let name = self.name.trim().to_string();
        let university = self.university.trim().to_string();
        let id = match self.id.trim() {
            "" => player_id(&name, &university),
            id => id.to_string(),
        };
        let role = match self.role.trim() {
            "" => None,
            r => Some(Role::from(r.to_string())),
        };
        let budget = self.budget.and_then(price_from_number);

        PlayerRecord {
            id,
            name,
            university,
            stats: PlayerStat {
                runs: self.runs,
                balls_faced: self.balls_faced,
                innings_played: self.innings_played,
                matches: self.matches,
                wickets: self.wickets,
                balls_bowled: self.balls_bowled,
                runs_conceded: self.runs_conceded,
                role,
                stumpings: self.stumpings,
                catches: self.catches,
            },
            budget,
        }
    }
}

// ---------------------------------------------------------------------------
// Reader-based loaders (enable testing without temp files)
// ---------------------------------------------------------------------------

/// Parse players from CSV. Malformed rows and rows without a name are
/// skipped with a warning.
pub fn load_players_csv_from_reader<R: Read>(rdr: R) -> Result<Vec<PlayerRecord>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(rdr);
    // Surface a broken header as an error instead of skipping every row.
    reader.headers()?;

    let mut players = Vec::new();
    for result in reader.deserialize::<RawPlayerRow>() {
        match result {
            Ok(raw) => {
                if raw.name.trim().is_empty() {
                    warn!("skipping player row without a name");
                    continue;
                }
                players.push(raw.into_record());
            }
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
            }
        }
    }
    Ok(players)
}

/// Parse players from a JSON array of player documents.
///
/// Records without an id get one derived from name and university.
pub fn load_players_json_from_reader<R: Read>(
    rdr: R,
) -> Result<Vec<PlayerRecord>, serde_json::Error> {
    let mut players: Vec<PlayerRecord> = serde_json::from_reader(rdr)?;
    for player in &mut players {
        if player.id.trim().is_empty() {
            player.id = player_id(&player.name, &player.university);
        }
    }
    Ok(players)
}

// ---------------------------------------------------------------------------
// File loaders
// ---------------------------------------------------------------------------

/// Load players from a `.json` or CSV file (any other extension is read as
/// CSV). Duplicate ids keep the last record.
pub fn load_players(path: &Path) -> Result<Vec<PlayerRecord>, ImportError> {
    let path_str = path.display().to_string();
    let file = File::open(path).map_err(|e| ImportError::Io {
        path: path_str.clone(),
        source: e,
    })?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let players = if is_json {
        load_players_json_from_reader(file).map_err(|e| ImportError::Json {
            path: path_str.clone(),
            source: e,
        })?
    } else {
        load_players_csv_from_reader(file).map_err(|e| ImportError::Csv {
            path: path_str.clone(),
            source: e,
        })?
    };

    let players = dedupe_by_id(players);
    info!("Loaded {} players from {}", players.len(), path_str);
    Ok(players)
}

/// Drop earlier records that share an id with a later one, keeping the
/// position of the first occurrence.
fn dedupe_by_id(players: Vec<PlayerRecord>) -> Vec<PlayerRecord> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<PlayerRecord> = Vec::with_capacity(players.len());
    for player in players {
        match index.get(&player.id) {
            Some(&i) => {
                warn!("duplicate player id '{}', using latest row", player.id);
                out[i] = player;
            }
            None => {
                index.insert(player.id.clone(), out.len());
                out.push(player);
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
