// src/domain/statistics.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Source-specific aggregate counters, as reported by one adapter.
/// The shape varies by source kind; normalizing across kinds is the
/// mediator's job, not the adapter's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatsFragment {
    Movies {
        total_titles: u64,
        average_rating: f32,
        distinct_directors: u64,
    },
    Series {
        total_titles: u64,
        average_rating: f32,
        total_seasons: u64,
    },
}

impl StatsFragment {
    pub fn total_titles(&self) -> u64 {
        match self {
            StatsFragment::Movies { total_titles, .. } => *total_titles,
            StatsFragment::Series { total_titles, .. } => *total_titles,
        }
    }

    /// Combine two fragments of the same kind. Counts are summed and the
    /// average rating is weighted by title count, so a large source is
    /// not diluted by a small one. Fragments of different kinds do not
    /// combine; `other` is returned unchanged in that case by the caller.
    pub fn merge(self, other: StatsFragment) -> StatsFragment {
        match (self, other) {
            (
                StatsFragment::Movies {
                    total_titles: t1,
                    average_rating: r1,
                    distinct_directors: d1,
                },
                StatsFragment::Movies {
                    total_titles: t2,
                    average_rating: r2,
                    distinct_directors: d2,
                },
            ) => StatsFragment::Movies {
                total_titles: t1 + t2,
                average_rating: weighted_average(r1, t1, r2, t2),
                distinct_directors: d1 + d2,
            },
            (
                StatsFragment::Series {
                    total_titles: t1,
                    average_rating: r1,
                    total_seasons: s1,
                },
                StatsFragment::Series {
                    total_titles: t2,
                    average_rating: r2,
                    total_seasons: s2,
                },
            ) => StatsFragment::Series {
                total_titles: t1 + t2,
                average_rating: weighted_average(r1, t1, r2, t2),
                total_seasons: s1 + s2,
            },
            (_, other) => other,
        }
    }
}

fn weighted_average(r1: f32, w1: u64, r2: f32, w2: u64) -> f32 {
    let total = w1 + w2;
    if total == 0 {
        return 0.0;
    }
    (r1 * w1 as f32 + r2 * w2 as f32) / total as f32
}

/// Aggregated statistics across all live sources, one fragment per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub movies: Option<StatsFragment>,
    pub series: Option<StatsFragment>,
    pub errors: BTreeMap<String, String>,
    pub sources_queried: usize,
    pub sources_succeeded: usize,
}

impl StatsReport {
    pub fn empty() -> Self {
        Self {
            movies: None,
            series: None,
            errors: BTreeMap::new(),
            sources_queried: 0,
            sources_succeeded: 0,
        }
    }
}
