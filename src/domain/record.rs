// src/domain/record.rs
use serde::{Deserialize, Serialize};

use crate::adapters::SourceKind;

/// Placeholder for text fields the backing store did not provide.
/// Absent fields are always materialized, never left as missing keys,
/// so merged views never need to guess a record's shape.
pub const UNKNOWN: &str = "unknown";

/// Placeholder for an unknown release year.
pub const UNKNOWN_YEAR: i32 = 0;

/// The canonical, source-agnostic record every adapter normalizes into.
/// This is the unit of the Global Schema View: one tagged union over the
/// two catalog shapes, merged results carry nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CanonicalRecord {
    Movie {
        title: String,
        year: i32,
        genre: String,
        /// Always within [0.0, 10.0]
        rating: f32,
        director: String,
    },
    Series {
        title: String,
        seasons: u32,
        genre: String,
        /// Always within [0.0, 10.0]
        rating: f32,
        network: String,
    },
}

impl CanonicalRecord {
    pub fn kind(&self) -> SourceKind {
        match self {
            CanonicalRecord::Movie { .. } => SourceKind::Movies,
            CanonicalRecord::Series { .. } => SourceKind::Series,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            CanonicalRecord::Movie { title, .. } => title,
            CanonicalRecord::Series { title, .. } => title,
        }
    }

    pub fn genre(&self) -> &str {
        match self {
            CanonicalRecord::Movie { genre, .. } => genre,
            CanonicalRecord::Series { genre, .. } => genre,
        }
    }

    pub fn rating(&self) -> f32 {
        match self {
            CanonicalRecord::Movie { rating, .. } => *rating,
            CanonicalRecord::Series { rating, .. } => *rating,
        }
    }

    /// Release year; series carry no year in the canonical model.
    pub fn year(&self) -> Option<i32> {
        match self {
            CanonicalRecord::Movie { year, .. } => Some(*year),
            CanonicalRecord::Series { .. } => None,
        }
    }

    /// Broadcast network; movies carry none.
    pub fn network(&self) -> Option<&str> {
        match self {
            CanonicalRecord::Movie { .. } => None,
            CanonicalRecord::Series { network, .. } => Some(network),
        }
    }
}

/// Clamp a rating into the canonical [0.0, 10.0] range.
/// Non-finite inputs normalize to 0.0.
pub fn clamp_rating(raw: f32) -> f32 {
    if !raw.is_finite() {
        return 0.0;
    }
    raw.clamp(0.0, 10.0)
}

/// Normalize an optional text field: trimmed value, or [`UNKNOWN`]
/// when absent or blank.
pub fn normalize_text(raw: Option<String>) -> String {
    match raw {
        Some(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                UNKNOWN.to_string()
            } else {
                trimmed.to_string()
            }
        }
        None => UNKNOWN.to_string(),
    }
}
