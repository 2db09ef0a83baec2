// Library root: re-exports all modules so integration tests and the CLI can
// reach the crate's public API.

pub mod app;
pub mod config;
pub mod db;
pub mod ledger;
pub mod players;
pub mod scoring;
pub mod summary;
