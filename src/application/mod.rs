// src/application/mod.rs
//
// Application Layer - configuration and process-wide wiring.

pub mod config;
pub mod state;

pub use config::MediatorConfig;
pub use state::AppState;
