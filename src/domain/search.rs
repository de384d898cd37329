// src/domain/search.rs
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::record::CanonicalRecord;
use crate::error::{AppError, AppResult};

/// Record field a search term is matched against by the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Title,
    Genre,
    Director,
    Cast,
    Network,
    Year,
    Rating,
}

impl SearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Genre => "genre",
            SearchField::Director => "director",
            SearchField::Cast => "cast",
            SearchField::Network => "network",
            SearchField::Year => "year",
            SearchField::Rating => "rating",
        }
    }
}

/// A logical search across both catalogs. Immutable once constructed;
/// hashed (minus `limit`, which only truncates post-merge) to form the
/// cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub term: String,
    pub field: SearchField,
    pub include_movies: bool,
    pub include_series: bool,
    pub genre_filter: BTreeSet<String>,
    pub network_filter: BTreeSet<String>,
    pub year_range: (i32, i32),
    pub min_rating: f32,
    pub limit: usize,
}

impl SearchRequest {
    /// A request matching everything for `term` in `field`, both kinds,
    /// no post-merge restrictions.
    pub fn new(term: impl Into<String>, field: SearchField) -> Self {
        Self {
            term: term.into(),
            field,
            include_movies: true,
            include_series: true,
            genre_filter: BTreeSet::new(),
            network_filter: BTreeSet::new(),
            year_range: (i32::MIN, i32::MAX),
            min_rating: 0.0,
            limit: 50,
        }
    }

    /// Reject requests the mediator cannot meaningfully execute.
    /// This is the only path on which `search` fails outright; backing
    /// source trouble degrades the result instead.
    pub fn validate(&self) -> AppResult<()> {
        if self.term.trim().is_empty() {
            return Err(AppError::InvalidRequest("search term is empty".into()));
        }
        if !self.include_movies && !self.include_series {
            return Err(AppError::InvalidRequest(
                "at least one of movies/series must be included".into(),
            ));
        }
        if self.year_range.0 > self.year_range.1 {
            return Err(AppError::InvalidRequest(format!(
                "year range is inverted: {}..{}",
                self.year_range.0, self.year_range.1
            )));
        }
        if !(0.0..=10.0).contains(&self.min_rating) {
            return Err(AppError::InvalidRequest(format!(
                "min_rating {} outside [0.0, 10.0]",
                self.min_rating
            )));
        }
        if self.limit == 0 {
            return Err(AppError::InvalidRequest("limit must be at least 1".into()));
        }
        Ok(())
    }

    /// Deterministic cache key over the full filter set, excluding
    /// `limit`: two requests differing only in limit share one cached
    /// merge and are truncated per caller.
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.term.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.field.as_str().as_bytes());
        hasher.update([self.include_movies as u8, self.include_series as u8]);
        for genre in &self.genre_filter {
            hasher.update(genre.as_bytes());
            hasher.update([1u8]);
        }
        for network in &self.network_filter {
            hasher.update(network.as_bytes());
            hasher.update([2u8]);
        }
        hasher.update(self.year_range.0.to_le_bytes());
        hasher.update(self.year_range.1.to_le_bytes());
        hasher.update(self.min_rating.to_le_bytes());
        format!("search:{:x}", hasher.finalize())
    }

    /// Post-merge predicate applied to every normalized record. Backing
    /// stores are not assumed to understand the full filter language, so
    /// these run client-request-side.
    pub fn matches(&self, record: &CanonicalRecord) -> bool {
        if !self.genre_filter.is_empty() {
            let genre = record.genre().to_lowercase();
            if !self
                .genre_filter
                .iter()
                .any(|wanted| genre.contains(&wanted.to_lowercase()))
            {
                return false;
            }
        }

        if !self.network_filter.is_empty() {
            // Records without a network (movies) only pass when no
            // network restriction is in play.
            let Some(network) = record.network() else {
                return false;
            };
            let network = network.to_lowercase();
            if !self
                .network_filter
                .iter()
                .any(|wanted| network.contains(&wanted.to_lowercase()))
            {
                return false;
            }
        }

        // Inclusive at both ends; series have no year and pass.
        if let Some(year) = record.year() {
            if year < self.year_range.0 || year > self.year_range.1 {
                return false;
            }
        }

        record.rating() >= self.min_rating
    }
}

/// The merged, source-tagged payload returned to the caller and stored
/// in the cache. Never mutated after the merge step completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediationResult {
    /// Normalized records keyed by source name. A source that failed or
    /// was skipped never appears here.
    pub by_source: BTreeMap<String, Vec<CanonicalRecord>>,
    /// Per-source failure messages for sources that were queried but did
    /// not succeed.
    pub errors: BTreeMap<String, String>,
    pub total_count: usize,
    pub sources_queried: usize,
    pub sources_succeeded: usize,
}

impl MediationResult {
    pub fn empty() -> Self {
        Self {
            by_source: BTreeMap::new(),
            errors: BTreeMap::new(),
            total_count: 0,
            sources_queried: 0,
            sources_succeeded: 0,
        }
    }

    /// Apply per-source truncation. The limit is applied independently
    /// per source so a populous source cannot starve a sparse one in the
    /// merged view. Recomputes `total_count` to what the caller sees.
    pub fn truncated(mut self, limit: usize) -> Self {
        for records in self.by_source.values_mut() {
            records.truncate(limit);
        }
        self.total_count = self.by_source.values().map(Vec::len).sum();
        self
    }
}
