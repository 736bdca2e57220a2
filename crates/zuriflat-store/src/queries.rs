//! Typed remote reads over per-endpoint caches, plus the rating write that invalidates them.

use std::sync::Arc;

use futures::FutureExt;
use tracing::{info, warn};
use zuriflat_core::{
    CacheKey, ClusterSet, Endpoint, ExplanationSet, InitialSample, Listing, ListingId,
    ListingsPage, ListingsQuery, Projection, ProjectionParams, RatingAck, RatingRequest,
    RecommendationSet, SessionId, explained_ids,
};
use zuriflat_sync::{ApiError, ListingApi};

use crate::{Freshness, QueryCache};

pub struct RemoteQueries<A> {
    api: Arc<A>,
    listings: QueryCache<ListingsPage>,
    listing: QueryCache<Listing>,
    recommendations: QueryCache<RecommendationSet>,
    projection: QueryCache<Projection>,
    explainability: QueryCache<ExplanationSet>,
    clusters: QueryCache<ClusterSet>,
    initial_sample: QueryCache<InitialSample>,
}

fn cache<T: Clone + Send + Sync + 'static>(endpoint: Endpoint) -> QueryCache<T> {
    QueryCache::new(Freshness::for_endpoint(endpoint))
}

impl<A: ListingApi + 'static> RemoteQueries<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            listings: cache(Endpoint::Listings),
            listing: cache(Endpoint::Listing),
            recommendations: cache(Endpoint::Recommendations),
            projection: cache(Endpoint::Projection),
            explainability: cache(Endpoint::Explainability),
            clusters: cache(Endpoint::Clusters),
            initial_sample: cache(Endpoint::InitialSample),
        }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub async fn listings(&self, query: &ListingsQuery) -> Result<ListingsPage, ApiError> {
        let api = Arc::clone(&self.api);
        let q = query.clone();
        self.listings
            .get(&CacheKey::listings(query), move || {
                let (api, q) = (Arc::clone(&api), q.clone());
                async move { api.listings(&q).await }.boxed()
            })
            .await
    }

    /// The focused listing; `Ok(None)` while nothing (or a blank id) is focused.
    pub async fn listing(&self, focused: Option<&ListingId>) -> Result<Option<Listing>, ApiError> {
        let Some(id) = focused.filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        let api = Arc::clone(&self.api);
        let owned = id.clone();
        self.listing
            .get(&CacheKey::listing(id), move || {
                let (api, id) = (Arc::clone(&api), owned.clone());
                async move { api.listing(&id).await }.boxed()
            })
            .await
            .map(Some)
    }

    pub async fn recommendations(
        &self,
        session: &SessionId,
        limit: u32,
    ) -> Result<RecommendationSet, ApiError> {
        let api = Arc::clone(&self.api);
        let owned = session.clone();
        self.recommendations
            .get(&CacheKey::recommendations(session, limit), move || {
                let (api, session) = (Arc::clone(&api), owned.clone());
                async move { api.recommendations(&session, limit).await }.boxed()
            })
            .await
    }

    /// `Ok(None)` while no attribute is chosen.
    pub async fn projection(
        &self,
        params: Option<&ProjectionParams>,
    ) -> Result<Option<Projection>, ApiError> {
        let Some(params) = params.filter(|p| !p.attributes.is_empty()) else {
            return Ok(None);
        };
        let api = Arc::clone(&self.api);
        let owned = params.clone();
        self.projection
            .get(&CacheKey::projection(params), move || {
                let (api, params) = (Arc::clone(&api), owned.clone());
                async move { api.projection(&params).await }.boxed()
            })
            .await
            .map(Some)
    }

    /// Explain up to three listings; `Ok(None)` when there is nothing to explain.
    pub async fn explainability(
        &self,
        session: &SessionId,
        ids: &[ListingId],
    ) -> Result<Option<ExplanationSet>, ApiError> {
        let ids = explained_ids(ids);
        if ids.is_empty() {
            return Ok(None);
        }
        let key = CacheKey::explainability(session, &ids);
        let api = Arc::clone(&self.api);
        let owned = session.clone();
        self.explainability
            .get(&key, move || {
                let (api, session, ids) = (Arc::clone(&api), owned.clone(), ids.clone());
                async move { api.explainability(&session, &ids).await }.boxed()
            })
            .await
            .map(Some)
    }

    pub async fn clusters(&self) -> Result<ClusterSet, ApiError> {
        let api = Arc::clone(&self.api);
        self.clusters
            .get(&CacheKey::clusters(), move || {
                let api = Arc::clone(&api);
                async move { api.clusters().await }.boxed()
            })
            .await
    }

    /// The calibration sample, fetched at most once for the client's lifetime.
    pub async fn initial_sample(&self) -> Result<InitialSample, ApiError> {
        let api = Arc::clone(&self.api);
        self.initial_sample
            .get(&CacheKey::initial_sample(), move || {
                let api = Arc::clone(&api);
                async move { api.initial_sample().await }.boxed()
            })
            .await
    }

    /// Submit a rating. Never retried.
    ///
    /// On success every recommendation and explainability entry of the
    /// request's session is invalidated; on failure nothing is.
    pub async fn submit_rating(&self, request: &RatingRequest) -> Result<RatingAck, ApiError> {
        match self.api.submit_rating(request).await {
            Ok(ack) => {
                let dropped = self.invalidate_session(&request.session_id);
                info!(
                    session = %request.session_id,
                    count = ack.ratings_count,
                    invalidated = dropped,
                    "rating acknowledged"
                );
                Ok(ack)
            }
            Err(err) => {
                warn!(
                    session = %request.session_id,
                    apartment = %request.apartment_id,
                    error = %err,
                    "rating submission failed"
                );
                Err(err)
            }
        }
    }

    /// Drop session-scoped entries so their next read refetches.
    pub fn invalidate_session(&self, session: &SessionId) -> usize {
        let scoped = |key: &CacheKey| key.session() == Some(session);
        self.recommendations.invalidate_where(scoped) + self.explainability.invalidate_where(scoped)
    }

    /// Last recommendation response for `session`, without fetching.
    pub fn cached_recommendations(
        &self,
        session: &SessionId,
        limit: u32,
    ) -> Option<RecommendationSet> {
        self.recommendations
            .cached(&CacheKey::recommendations(session, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use zuriflat_core::{FilterPredicate, ProjectionMode, Rating};
    use zuriflat_sync::MemoryApi;
    use zuriflat_sync::memory::sample_listings;

    fn queries() -> RemoteQueries<MemoryApi> {
        RemoteQueries::new(Arc::new(MemoryApi::new(sample_listings())))
    }

    fn slow_queries() -> RemoteQueries<MemoryApi> {
        let api = MemoryApi::new(sample_listings()).with_latency(Duration::from_millis(50));
        RemoteQueries::new(Arc::new(api))
    }

    fn rating(session: &SessionId, id: &str) -> RatingRequest {
        RatingRequest {
            session_id: session.clone(),
            apartment_id: ListingId::from(id),
            rating: Rating::new(4).unwrap(),
        }
    }

    fn calls(q: &RemoteQueries<MemoryApi>, endpoint: Endpoint) -> usize {
        q.api().calls(endpoint)
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_recommendation_reads_share_one_call() {
        let q = slow_queries();
        let s = SessionId::from("s1");
        let (a, b) = tokio::join!(q.recommendations(&s, 20), q.recommendations(&s, 20));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(calls(&q, Endpoint::Recommendations), 1);

        q.recommendations(&s, 20).await.unwrap();
        assert_eq!(calls(&q, Endpoint::Recommendations), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn listings_cached_per_predicate() {
        let q = queries();
        let all = ListingsQuery::default();
        let cheap = ListingsQuery::new(
            FilterPredicate {
                price_max: Some(100.0),
                ..Default::default()
            },
            50,
        );
        q.listings(&all).await.unwrap();
        q.listings(&all).await.unwrap();
        assert_eq!(q.listings(&cheap).await.unwrap().total, 3);
        assert_eq!(calls(&q, Endpoint::Listings), 2);

        tokio::time::advance(Duration::from_secs(5 * 60)).await;
        q.listings(&all).await.unwrap();
        assert_eq!(calls(&q, Endpoint::Listings), 3);
    }

    #[tokio::test]
    async fn disabled_reads_make_no_call() {
        let q = queries();
        let s = SessionId::from("s1");
        assert_eq!(q.listing(None).await.unwrap(), None);
        assert_eq!(q.listing(Some(&ListingId::from(" "))).await.unwrap(), None);
        assert_eq!(q.explainability(&s, &[]).await.unwrap(), None);
        assert_eq!(q.projection(None).await.unwrap(), None);
        let empty = ProjectionParams {
            attributes: vec![],
            mode: ProjectionMode::Raw,
            filter_outliers: false,
        };
        assert_eq!(q.projection(Some(&empty)).await.unwrap(), None);
        assert_eq!(calls(&q, Endpoint::Listing), 0);
        assert_eq!(calls(&q, Endpoint::Explainability), 0);
        assert_eq!(calls(&q, Endpoint::Projection), 0);
    }

    #[tokio::test]
    async fn initial_sample_fetched_once() {
        let q = queries();
        q.initial_sample().await.unwrap();
        q.initial_sample().await.unwrap();
        assert_eq!(calls(&q, Endpoint::InitialSample), 1);
    }

    #[tokio::test]
    async fn rating_invalidates_only_its_session() {
        let q = queries();
        let (s1, s2) = (SessionId::from("s1"), SessionId::from("s2"));
        q.recommendations(&s1, 20).await.unwrap();
        q.recommendations(&s2, 20).await.unwrap();
        assert!(q.cached_recommendations(&s1, 20).is_some());

        let ack = q.submit_rating(&rating(&s1, "3")).await.unwrap();
        assert_eq!(ack.ratings_count, 1);
        assert!(q.cached_recommendations(&s1, 20).is_none());
        assert!(q.cached_recommendations(&s2, 20).is_some());
    }

    /// Two opposite ratings, enough for the backend to train a model.
    async fn train(q: &RemoteQueries<MemoryApi>, session: &SessionId) {
        q.submit_rating(&rating(session, "1")).await.unwrap();
        q.submit_rating(&RatingRequest {
            rating: Rating::new(1).unwrap(),
            ..rating(session, "6")
        })
        .await
        .unwrap();
    }

    /// Read `ids` for `reader` while a rating for `rater` is acknowledged mid-flight.
    async fn read_across_rating(
        q: &RemoteQueries<MemoryApi>,
        reader: &SessionId,
        rater: &SessionId,
        ids: &[ListingId],
    ) {
        let submitted = rating(rater, "5");
        let (read, ack) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                q.explainability(reader, ids).await
            },
            q.submit_rating(&submitted),
        );
        assert!(read.unwrap().is_some());
        ack.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn rating_during_explainability_read_forces_refetch() {
        let q = slow_queries();
        let s1 = SessionId::from("s1");
        train(&q, &s1).await;
        let ids = ["1", "2"].map(ListingId::from);
        let key = CacheKey::explainability(&s1, &ids);

        read_across_rating(&q, &s1, &s1, &ids).await;
        assert_eq!(calls(&q, Endpoint::Explainability), 1);
        assert!(!q.explainability.is_in_flight(&key));
        assert!(q.explainability.cached(&key).is_none());

        q.explainability(&s1, &ids).await.unwrap();
        assert_eq!(calls(&q, Endpoint::Explainability), 2);
        assert!(q.explainability.cached(&key).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn rating_leaves_other_session_explanations_cached() {
        let q = slow_queries();
        let (s1, s2) = (SessionId::from("s1"), SessionId::from("s2"));
        train(&q, &s1).await;
        train(&q, &s2).await;
        let ids = ["1", "2"].map(ListingId::from);
        q.explainability(&s2, &ids).await.unwrap();

        read_across_rating(&q, &s1, &s1, &ids).await;
        assert!(q.explainability.cached(&CacheKey::explainability(&s1, &ids)).is_none());
        assert!(q.explainability.cached(&CacheKey::explainability(&s2, &ids)).is_some());
    }

    #[tokio::test]
    async fn rating_drops_settled_explanations_of_its_session() {
        let q = queries();
        let s = SessionId::from("s1");
        train(&q, &s).await;
        let ids = [ListingId::from("3")];
        let key = CacheKey::explainability(&s, &ids);
        q.explainability(&s, &ids).await.unwrap();
        assert!(q.explainability.cached(&key).is_some());

        q.submit_rating(&rating(&s, "4")).await.unwrap();
        assert!(q.explainability.cached(&key).is_none());
    }

    #[tokio::test]
    async fn failed_rating_is_not_retried_and_keeps_cache() {
        let q = queries();
        let s = SessionId::from("s1");
        q.recommendations(&s, 20).await.unwrap();
        q.api()
            .fail_next(Endpoint::SubmitRating, ApiError::Transport("reset".into()));
        assert!(q.submit_rating(&rating(&s, "3")).await.is_err());
        assert_eq!(calls(&q, Endpoint::SubmitRating), 1);
        assert!(q.cached_recommendations(&s, 20).is_some());
    }

    #[tokio::test]
    async fn transient_read_failure_is_retried_once() {
        let q = queries();
        q.api()
            .fail_next(Endpoint::Clusters, ApiError::Transport("reset".into()));
        assert!(q.clusters().await.is_ok());
        assert_eq!(calls(&q, Endpoint::Clusters), 2);
    }

    #[tokio::test]
    async fn explainability_normalises_ids() {
        let q = queries();
        let s = SessionId::from("s1");
        q.submit_rating(&rating(&s, "1")).await.unwrap();
        q.submit_rating(&RatingRequest {
            rating: Rating::new(1).unwrap(),
            ..rating(&s, "6")
        })
        .await
        .unwrap();
        let ids = ["4", "2", "1", "8"].map(ListingId::from);
        let set = q.explainability(&s, &ids).await.unwrap().unwrap();
        let explained: Vec<&str> = set
            .explanations
            .iter()
            .map(|e| e.apartment_id.as_str())
            .collect();
        assert_eq!(explained, ["1", "2", "4"]);
    }
}
