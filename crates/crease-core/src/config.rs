// Configuration loading and parsing (league.toml, app.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub leaderboard: LeaderboardConfig,
    pub db_path: String,
    pub data_paths: DataPaths,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[league]` table in league.toml.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    /// Budget every user starts with, in currency units.
    pub initial_budget: u64,
}

// ---------------------------------------------------------------------------
// app.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire app.toml file.
#[derive(Debug, Clone, Deserialize)]
struct AppFile {
    database: DatabaseSection,
    data_paths: DataPaths,
    leaderboard: LeaderboardConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    /// Player file imported by `crease import` when no path is given.
    pub players: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardConfig {
    /// Number of teams shown on the leaderboard.
    pub display_limit: usize,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

const LEAGUE_FILE: &str = "league.toml";
const APP_FILE: &str = "app.toml";

/// Files read from `config/`, each with a default of the same name in
/// `defaults/`.
pub const CONFIG_FILES: [&str; 2] = [LEAGUE_FILE, APP_FILE];

/// Load and validate configuration from `config/league.toml` and
/// `config/app.toml`, relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let league_path = config_dir.join(LEAGUE_FILE);
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;

    let app_path = config_dir.join(APP_FILE);
    let app_text = read_file(&app_path)?;
    let app_file: AppFile = toml::from_str(&app_text).map_err(|e| ConfigError::ParseError {
        path: app_path.clone(),
        source: e,
    })?;

    let config = Config {
        league: league_file.league,
        leaderboard: app_file.leaderboard,
        db_path: app_file.database.path,
        data_paths: app_file.data_paths,
    };

    validate(&config)?;

    Ok(config)
}

/// Copy each of [`CONFIG_FILES`] that `config/` lacks from `defaults/`.
///
/// Files already in `config/` are never touched, so local edits survive.
/// Returns the paths written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let config_dir = base_dir.join("config");
    let defaults_dir = base_dir.join("defaults");

    let mut copied = Vec::new();
    for name in CONFIG_FILES {
        let target = config_dir.join(name);
        if target.is_file() {
            continue;
        }
        let source = defaults_dir.join(name);
        if !source.is_file() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "{} is missing and there is no default at {}",
                    target.display(),
                    source.display()
                ),
            });
        }

        std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", config_dir.display()),
        })?;
        std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
        })?;
        copied.push(target);
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "league.name".into(),
            message: "must not be empty".into(),
        });
    }

    if config.league.initial_budget == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.initial_budget".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.leaderboard.display_limit == 0 {
        return Err(ConfigError::ValidationError {
            field: "leaderboard.display_limit".into(),
            message: "must be > 0".into(),
        });
    }

    if config.db_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
