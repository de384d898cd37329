// src/domain/mod.rs
//
// Domain Root - canonical record model and request/result shapes.
// All other modules import from `crate::domain::*`

pub mod health;
pub mod record;
pub mod search;
pub mod statistics;

pub use health::{ConnectAck, HealthReport, HealthState, HealthStatus, PingInfo};
pub use record::{clamp_rating, normalize_text, CanonicalRecord, UNKNOWN, UNKNOWN_YEAR};
pub use search::{MediationResult, SearchField, SearchRequest};
pub use statistics::{StatsFragment, StatsReport};
