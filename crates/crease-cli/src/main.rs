// crease command-line front end.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config (copying defaults on first run)
// 3. Open database
// 4. Run the requested subcommand

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crease_core::app::{FantasyApp, PlayerCard, TeamView};
use crease_core::config;
use crease_core::db::{Database, LeaderboardEntry};
use crease_core::ledger::budget::RosterEntry;
use crease_core::scoring::valuation::ValueSource;
use crease_core::summary::TournamentSummary;

#[derive(Parser, Debug)]
#[command(name = "crease")]
#[command(about = "Fantasy cricket player valuation and team budget ledger", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import players from a CSV or JSON file
    Import {
        /// Player file (defaults to data_paths.players in app.toml)
        path: Option<PathBuf>,
    },

    /// List players with their points and price
    Players {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show a user's team and budget
    Team {
        user: String,

        #[arg(long)]
        json: bool,
    },

    /// Add a player to a user's team
    Add { user: String, player: String },

    /// Remove a player from a user's team
    Remove { user: String, player: String },

    /// Show the top complete teams
    Leaderboard {
        #[arg(long)]
        json: bool,
    },

    /// Tournament totals and leaders
    Summary {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing()?;
    info!("crease starting: {:?}", cli.command);

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, initial budget {}",
        config.league.name, config.league.initial_budget
    );

    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    let app = FantasyApp::new(config, db);

    match cli.command {
        Commands::Import { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(&app.config().data_paths.players));
            let n = app.import_players(&path)?;
            println!("Imported {n} players from {}", path.display());
        }
        Commands::Players { json } => {
            let cards = app.player_cards()?;
            if json {
                print_json(&cards)?;
            } else {
                print_players(&cards);
            }
        }
        Commands::Team { user, json } => {
            let team = app.team(&user)?;
            if json {
                print_json(&team)?;
            } else {
                print_team(&team);
            }
        }
        Commands::Add { user, player } => match app.add_player(&user, &player)? {
            Ok(entry) => {
                let team = app.team(&user)?;
                println!(
                    "Added {} for {} ({} remaining)",
                    entry.name, entry.value, team.remaining
                );
            }
            Err(rejection) => {
                eprintln!("Cannot add player: {rejection}");
                return Ok(ExitCode::from(2));
            }
        },
        Commands::Remove { user, player } => {
            let removed = app.remove_player(&user, &player)?;
            println!("{}", removal_message(&user, &player, removed.as_ref()));
        }
        Commands::Leaderboard { json } => {
            let board = app.leaderboard()?;
            if json {
                print_json(&board)?;
            } else {
                print_leaderboard(&board);
            }
        }
        Commands::Summary { json } => {
            let summary = app.tournament_summary()?;
            if json {
                print_json(&summary)?;
            } else {
                print_summary(&summary);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Initialize file-based tracing. Logs go to `logs/crease.log` so they
/// never mix with command output.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("crease.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("crease=info,crease_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}

fn print_players(cards: &[PlayerCard]) {
    println!(
        "{:<28} {:<24} {:<13} {:>8} {:>10}",
        "ID", "NAME", "ROLE", "POINTS", "VALUE"
    );
    for card in cards {
        let role = card.role.map_or("-", |r| r.display_str());
        // '*' marks a price set by an admin, '~' a score built on estimates
        let stored = if card.value_source == ValueSource::Stored { "*" } else { "" };
        let estimated = if card.estimated.is_empty() { "" } else { "~" };
        println!(
            "{:<28} {:<24} {:<13} {:>7.2}{:1} {:>9}{:1}",
            card.id, card.name, role, card.points, estimated, card.value, stored
        );
    }
}

/// Removing a player who is not on the team is a no-op, not a failure.
fn removal_message(user: &str, player: &str, removed: Option<&RosterEntry>) -> String {
    match removed {
        Some(entry) => format!("Removed {}, refunded {}", entry.name, entry.value),
        None => format!("{player} is not in {user}'s team, nothing to remove"),
    }
}

fn print_team(team: &TeamView) {
    println!("Team of {}", team.user_id);
    println!(
        "Budget {}  spent {}  remaining {}",
        team.initial_budget, team.spent, team.remaining
    );
    for (i, entry) in team.roster.iter().enumerate() {
        let role = entry.role.map_or("-", |r| r.display_str());
        println!("{:>2}. {:<24} {:<13} {:>10}", i + 1, entry.name, role, entry.value);
    }
    match team.team_points {
        Some(points) => println!("Team points: {points:.2}"),
        None => println!("{} of 11 players picked", team.roster.len()),
    }
}

fn print_leaderboard(board: &[LeaderboardEntry]) {
    if board.is_empty() {
        println!("No complete teams yet");
        return;
    }
    for entry in board {
        println!(
            "{:>3}. {:<20} {:>10.2}  {}",
            entry.rank,
            entry.user_id,
            entry.team_points,
            entry.recorded_at.format("%Y-%m-%d %H:%M")
        );
    }
}

fn print_summary(summary: &TournamentSummary) {
    println!("Players:       {}", summary.players);
    println!("Total runs:    {}", summary.total_runs);
    println!("Total wickets: {}", summary.total_wickets);
    match &summary.top_run_scorer {
        Some(l) => println!("Top scorer:    {} ({})", l.name, l.total),
        None => println!("Top scorer:    -"),
    }
    match &summary.top_wicket_taker {
        Some(l) => println!("Top wickets:   {} ({})", l.name, l.total),
        None => println!("Top wickets:   -"),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
