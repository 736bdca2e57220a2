pub mod cache_key;
pub mod color;
pub mod config;
pub mod filter;
pub mod listing;
pub mod responses;
pub mod session;

pub use cache_key::{CacheKey, Endpoint, MAX_EXPLAINED, ProjectionMode, ProjectionParams, explained_ids};
pub use color::{Color, color_for};
pub use config::DashboardConfig;
pub use filter::{FilterPatch, FilterPredicate, ListingsQuery, SortOrder};
pub use listing::{Listing, ListingId};
pub use responses::{
    ClusterAssignment, ClusterCentroid, ClusterSet, Explanation, ExplanationSet,
    FeatureContribution, InitialSample, InvalidRating, ListingsPage, Projection, ProjectionPoint,
    Rating, RatingAck, RatingRequest, Recommendation, RecommendationSet,
};
pub use session::SessionId;
