// Team ledger: budget bookkeeping, team points, per-user registry.

pub mod book;
pub mod budget;
pub mod team_points;
