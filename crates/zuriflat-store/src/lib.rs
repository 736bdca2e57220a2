//! Remote query cache: per-endpoint freshness, request coalescing, and rating invalidation.

pub mod cache;
pub mod policy;
pub mod queries;

pub use cache::QueryCache;
pub use policy::Freshness;
pub use queries::RemoteQueries;
