pub mod cache_store;
pub mod connection;

pub use cache_store::SqliteCacheStore;
pub use connection::SqliteStorage;
