//! Storage: user settings database, canonical links and the dedup cache.

pub mod cache;
pub mod canonical;
pub mod db;

pub use cache::DedupCache;
pub use canonical::{canonicalize, combine_with_settings, CanonicalKey};
pub use db::{create_pool, get_connection, DbConnection, DbPool, UserSettings};
