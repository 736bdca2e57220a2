use std::time::Duration;

use tokio::time::Instant;
use zuriflat_core::Endpoint;

/// How long a cached value may be served without refetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Fresh until this much time has passed since it was fetched.
    Window(Duration),
    /// Never served from cache; concurrent reads still coalesce.
    AlwaysStale,
    /// Fetched once and kept until explicitly invalidated.
    Session,
}

impl Freshness {
    pub fn for_endpoint(endpoint: Endpoint) -> Self {
        match endpoint {
            Endpoint::Listings | Endpoint::Projection => Freshness::Window(minutes(5)),
            Endpoint::Listing | Endpoint::Clusters => Freshness::Window(minutes(10)),
            Endpoint::InitialSample => Freshness::Session,
            Endpoint::Recommendations | Endpoint::Explainability | Endpoint::SubmitRating => {
                Freshness::AlwaysStale
            }
        }
    }

    pub fn is_fresh(self, fetched_at: Instant, now: Instant) -> bool {
        match self {
            Freshness::Window(window) => now.saturating_duration_since(fetched_at) < window,
            Freshness::AlwaysStale => false,
            Freshness::Session => true,
        }
    }
}

fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}
