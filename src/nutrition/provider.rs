//! Feed composition lookup
//!
//! The aggregator only needs read access to compositions by name; both the
//! SQLite feed library and an in-memory map provide it.

use std::collections::HashMap;

use crate::db::Database;
use crate::models::FeedComposition;

use super::IntakeResult;

/// Read-only source of feed compositions, keyed by feedstuff name
pub trait FeedCompositionProvider {
    fn lookup(&self, feedstuff: &str) -> IntakeResult<Option<FeedComposition>>;

    /// Look up several feeds at once. The result is aligned with `feedstuffs`.
    fn lookup_many(&self, feedstuffs: &[&str]) -> IntakeResult<Vec<Option<FeedComposition>>> {
        feedstuffs.iter().map(|name| self.lookup(name)).collect()
    }
}

/// In-memory feed library
#[derive(Debug, Clone, Default)]
pub struct FeedLibrary {
    feeds: HashMap<String, FeedComposition>,
}

impl FeedLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a feed
    pub fn insert(&mut self, feed: FeedComposition) {
        self.feeds.insert(feed.name.trim().to_string(), feed);
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}

impl FromIterator<FeedComposition> for FeedLibrary {
    fn from_iter<I: IntoIterator<Item = FeedComposition>>(iter: I) -> Self {
        let mut library = FeedLibrary::new();
        for feed in iter {
            library.insert(feed);
        }
        library
    }
}

impl FeedCompositionProvider for FeedLibrary {
    fn lookup(&self, feedstuff: &str) -> IntakeResult<Option<FeedComposition>> {
        Ok(self.feeds.get(feedstuff.trim()).cloned())
    }
}

impl FeedCompositionProvider for Database {
    fn lookup(&self, feedstuff: &str) -> IntakeResult<Option<FeedComposition>> {
        Ok(self.with_conn(|conn| FeedComposition::get_by_name(conn, feedstuff))?)
    }

    /// One `IN (...)` query for the whole ration
    fn lookup_many(&self, feedstuffs: &[&str]) -> IntakeResult<Vec<Option<FeedComposition>>> {
        let found = self.with_conn(|conn| FeedComposition::get_many(conn, feedstuffs))?;
        let by_name: HashMap<String, FeedComposition> =
            found.into_iter().map(|feed| (feed.name.clone(), feed)).collect();

        Ok(feedstuffs
            .iter()
            .map(|name| by_name.get(name.trim()).cloned())
            .collect())
    }
}
