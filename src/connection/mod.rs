// src/connection/mod.rs
//
// Connection Manager - adapter ownership, liveness, reconnection.

pub mod handle;
pub mod manager;

pub use handle::{ConnectionState, SourceHandle};
pub use manager::ConnectionManager;
