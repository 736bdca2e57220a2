//! Remote listing service: the `ListingApi` contract, a reqwest client, and an in-memory backend.

pub mod api;
pub mod error;
pub mod memory;

#[cfg(feature = "http")]
pub mod http;

pub use api::ListingApi;
pub use error::ApiError;
pub use memory::MemoryApi;

#[cfg(feature = "http")]
pub use http::HttpApi;
