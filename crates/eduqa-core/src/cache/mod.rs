//! Local query cache for offline reads.
//!
//! `CacheManager` stores the results of forum queries as JSON files, one
//! per `QueryKey`, and considers them stale after 5 minutes. Entries are
//! replaced only by successful fetches and removed by explicit
//! invalidation.

pub mod manager;

pub use manager::{CacheAges, CacheManager, CachedData, FeedSnapshot, QueryKey};
