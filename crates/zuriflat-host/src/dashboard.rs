//! The composition root: one owned state container, one query layer, and the
//! routing between them and the views.

use std::sync::Arc;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use zuriflat_core::color::cluster_color;
use zuriflat_core::{
    DashboardConfig, FilterPatch, InvalidRating, ListingId, ProjectionMode, Rating, RatingAck,
    RatingRequest, SessionId,
};
use zuriflat_state::{DashboardState, DraftField, Slice, SubscriptionId, ViewKind};
use zuriflat_store::RemoteQueries;
use zuriflat_sync::{ApiError, ListingApi};

use crate::panels::{
    CalibrationView, ContributionBars, ContributionView, DetailView, MapView, Marker, Panel,
    RadarSeries, RadarView, RankedList, RankedRow, ScatterPoint, ScatterView,
};
use crate::radar;

/// A user interaction reported by one of the views.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    ToggleSelect(ListingId),
    SetSelection(Vec<ListingId>),
    ClearSelection,
    Brush { source: ViewKind, ids: Vec<ListingId> },
    ClearBrush,
    OpenDetail(ListingId),
    CloseDetail,
    UpdateFilter(FilterPatch),
    ResetFilters,
    FilterInput { field: DraftField, raw: String },
    SetProjectionMode(ProjectionMode),
    SetProjectionAttributes(Vec<String>),
    SetFilterOutliers(bool),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RateError {
    #[error(transparent)]
    Invalid(#[from] InvalidRating),
    #[error("cannot rate a listing without an id")]
    BlankListing,
    #[error("rating not confirmed: {0}")]
    Api(#[from] ApiError),
}

pub struct Dashboard<A> {
    config: DashboardConfig,
    state: DashboardState,
    queries: RemoteQueries<A>,
}

impl<A: ListingApi + 'static> Dashboard<A> {
    /// Start a dashboard with a freshly generated session.
    pub fn new(config: DashboardConfig, api: Arc<A>) -> Self {
        Self::with_session(config, api, SessionId::generate())
    }

    pub fn with_session(config: DashboardConfig, api: Arc<A>, session: SessionId) -> Self {
        info!(session = %session, backend = %config.backend_url, "dashboard started");
        Self {
            state: DashboardState::new(&config, session),
            queries: RemoteQueries::new(api),
            config,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn queries(&self) -> &RemoteQueries<A> {
        &self.queries
    }

    pub fn session(&self) -> &SessionId {
        self.state.session()
    }

    pub fn subscribe<F>(&mut self, slices: &[Slice], callback: F) -> SubscriptionId
    where
        F: Fn(Slice) + Send + Sync + 'static,
    {
        self.state.subscribe(slices, callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.state.unsubscribe(id)
    }

    /// Route one view interaction into the models. Returns whether state changed.
    pub fn dispatch(&mut self, event: ViewEvent) -> bool {
        debug!(?event, "view event");
        let s = &mut self.state;
        match event {
            ViewEvent::ToggleSelect(id) => s.toggle_selection(&id),
            ViewEvent::SetSelection(ids) => s.set_selection(&ids),
            ViewEvent::ClearSelection => s.clear_selection(),
            ViewEvent::Brush { source, ids } => s.set_brushed(source, ids),
            ViewEvent::ClearBrush => s.clear_brush(),
            ViewEvent::OpenDetail(id) => s.open_detail(&id),
            ViewEvent::CloseDetail => s.close_detail(),
            ViewEvent::UpdateFilter(patch) => s.update_filter(&patch),
            ViewEvent::ResetFilters => s.reset_filters(),
            ViewEvent::FilterInput { field, raw } => {
                s.filter_input(field, raw, Instant::now());
                false
            }
            ViewEvent::SetProjectionMode(mode) => s.set_projection_mode(mode),
            ViewEvent::SetProjectionAttributes(attrs) => s.set_projection_attributes(attrs),
            ViewEvent::SetFilterOutliers(on) => s.set_filter_outliers(on),
        }
    }

    /// Wait out the debounce window of pending filter input, then commit it.
    ///
    /// Returns whether the committed predicate changed.
    pub async fn settle_filters(&mut self) -> bool {
        let Some(deadline) = self.state.pending_filter_deadline() else {
            return false;
        };
        tokio::time::sleep_until(deadline).await;
        self.state.commit_due_filters(Instant::now())
    }

    /// Rate a listing: record it locally first, then submit and apply the acknowledgement.
    ///
    /// On failure the local rating stays in place and the error is returned.
    pub async fn rate(&mut self, id: &ListingId, value: u8) -> Result<RatingAck, RateError> {
        let rating = Rating::new(value)?;
        if id.is_empty() {
            return Err(RateError::BlankListing);
        }
        self.state.record_local_rating(id, rating);
        let request = RatingRequest {
            session_id: self.state.session().clone(),
            apartment_id: id.clone(),
            rating,
        };
        match self.queries.submit_rating(&request).await {
            Ok(ack) => {
                self.state.apply_rating_ack(&ack);
                Ok(ack)
            }
            Err(err) => {
                warn!(apartment = %id, error = %err, "keeping unconfirmed local rating");
                Err(err.into())
            }
        }
    }

    pub async fn ranked_list(&mut self) -> Panel<RankedList> {
        let result = self
            .queries
            .recommendations(self.state.session(), self.config.recommendations_limit)
            .await;
        let set = match result {
            Ok(set) => set,
            Err(err) => return Panel::Failed(err),
        };
        self.state.apply_recommendations(&set);
        let rows = set
            .recommendations
            .into_iter()
            .map(|rec| RankedRow {
                style: self.state.style_for(&rec.apartment.id),
                rating: self.state.ledger().rating(&rec.apartment.id),
                score: rec.predicted_score,
                listing: rec.apartment,
            })
            .collect();
        Panel::Ready(RankedList {
            rows,
            model_trained: set.model_trained,
            ratings_count: self.state.ledger().server_count(),
        })
    }

    /// Listings for the committed filter, decorated with clusters when available.
    pub async fn map(&mut self) -> Panel<MapView> {
        let query = self.state.listings_query();
        let (listings, clusters) =
            tokio::join!(self.queries.listings(&query), self.queries.clusters());
        let page = match listings {
            Ok(page) => page,
            Err(err) => return Panel::Failed(err),
        };
        self.state.absorb(&page.apartments);
        let (assignments, centroids, clusters_error) = match clusters {
            Ok(set) => (set.clusters, set.centroids, None),
            Err(err) => (Vec::new(), Vec::new(), Some(err)),
        };
        let markers = page
            .apartments
            .into_iter()
            .map(|listing| {
                let cluster = assignments
                    .iter()
                    .find(|a| a.apartment_id == listing.id)
                    .map(|a| (a.cluster_id, cluster_color(a.cluster_id)));
                Marker {
                    style: self.state.style_for(&listing.id),
                    cluster,
                    listing,
                }
            })
            .collect();
        Panel::Ready(MapView {
            markers,
            centroids,
            total: page.total,
            clusters_error,
        })
    }

    pub async fn scatter(&mut self) -> Panel<ScatterView> {
        let params = self.state.projection_params();
        let state = &mut self.state;
        Panel::from(self.queries.projection(params.as_ref()).await).map(|projection| {
            state.absorb(projection.points.iter().map(|p| &p.apartment));
            let points = projection
                .points
                .iter()
                .map(|p| ScatterPoint {
                    id: p.apartment_id.clone(),
                    x: p.x,
                    y: p.y,
                    style: state.style_for(&p.apartment_id),
                })
                .collect();
            ScatterView {
                points,
                x_label: projection.x_label,
                y_label: projection.y_label,
                explained_variance: projection.explained_variance,
            }
        })
    }

    /// Side-by-side comparison from already-known snapshots; never fetches.
    pub fn radar(&self) -> Panel<RadarView> {
        let series: Vec<RadarSeries> = self
            .state
            .comparison_ids()
            .iter()
            .filter_map(|id| self.state.snapshot(id))
            .map(|listing| RadarSeries {
                id: listing.id.clone(),
                name: listing.name.clone(),
                values: radar::axes(listing),
                color: self.state.style_for(&listing.id).identity,
            })
            .collect();
        if series.is_empty() {
            return Panel::Disabled;
        }
        Panel::Ready(RadarView {
            axes: radar::AXES,
            series,
        })
    }

    pub async fn contributions(&mut self) -> Panel<ContributionView> {
        let targets = self.state.explain_targets();
        let result = self
            .queries
            .explainability(self.state.session(), &targets)
            .await;
        let state = &mut self.state;
        Panel::from(result).map(|set| {
            state.absorb(set.explanations.iter().map(|e| &e.apartment));
            let bars = set
                .explanations
                .iter()
                .map(|e| ContributionBars {
                    id: e.apartment_id.clone(),
                    name: e.apartment.name.clone(),
                    predicted_score: e.predicted_score,
                    intercept: e.intercept,
                    contributions: e.ranked().into_iter().cloned().collect(),
                    color: state.style_for(&e.apartment_id).identity,
                })
                .collect();
            ContributionView { bars }
        })
    }

    pub async fn detail(&mut self) -> Panel<DetailView> {
        let focused = self.state.focus().focused().cloned();
        let state = &mut self.state;
        Panel::from(self.queries.listing(focused.as_ref()).await).map(|listing| {
            state.absorb([&listing]);
            DetailView {
                style: state.style_for(&listing.id),
                rating: state.ledger().rating(&listing.id),
                listing,
            }
        })
    }

    /// The cold-start sample to rate before a personal model exists.
    pub async fn calibration(&mut self) -> Panel<CalibrationView> {
        let sample = match self.queries.initial_sample().await {
            Ok(sample) => sample,
            Err(err) => return Panel::Failed(err),
        };
        self.state.absorb(&sample.apartments);
        let ledger = self.state.ledger();
        let rated = sample
            .apartments
            .iter()
            .filter(|l| ledger.rating(&l.id).is_some())
            .count();
        Panel::Ready(CalibrationView {
            rated,
            model_trained: ledger.is_calibrated(),
            listings: sample.apartments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use zuriflat_core::Endpoint;
    use zuriflat_core::color::{self, NEUTRAL, TOP_COLORS};
    use zuriflat_sync::MemoryApi;
    use zuriflat_sync::memory::sample_listings;

    fn id(s: &str) -> ListingId {
        ListingId::from(s)
    }

    fn dashboard() -> Dashboard<MemoryApi> {
        Dashboard::with_session(
            DashboardConfig::default(),
            Arc::new(MemoryApi::new(sample_listings())),
            SessionId::from("s1"),
        )
    }

    fn calls(d: &Dashboard<MemoryApi>, endpoint: Endpoint) -> usize {
        d.queries().api().calls(endpoint)
    }

    #[tokio::test]
    async fn same_listing_same_color_in_every_view() {
        let mut d = dashboard();
        let list = d.ranked_list().await;
        let first = list.ready().unwrap().rows[0].listing.id.clone();
        assert_eq!(list.ready().unwrap().rows[0].style.color, TOP_COLORS[0]);

        let map = d.map().await;
        let marker = map
            .ready()
            .unwrap()
            .markers
            .iter()
            .find(|m| m.listing.id == first)
            .unwrap();
        assert_eq!(marker.style.identity, TOP_COLORS[0]);

        let scatter = d.scatter().await;
        let point = scatter
            .ready()
            .unwrap()
            .points
            .iter()
            .find(|p| p.id == first)
            .unwrap();
        assert_eq!(point.style.identity, TOP_COLORS[0]);

        let radar = d.radar();
        assert_eq!(radar.ready().unwrap().series[0].color, TOP_COLORS[0]);
        assert_eq!(radar.ready().unwrap().series.len(), 5);

        let ranked = list.ready().unwrap();
        let outside = &ranked.rows[5].listing.id;
        assert_eq!(d.state().style_for(outside).color, NEUTRAL);
    }

    #[tokio::test]
    async fn selection_overrides_rank_color_everywhere() {
        let mut d = dashboard();
        d.ranked_list().await;
        let top = d.state().top().ids()[1].clone();
        d.dispatch(ViewEvent::Brush {
            source: ViewKind::Map,
            ids: vec![top.clone()],
        });
        d.dispatch(ViewEvent::ToggleSelect(top.clone()));
        let map = d.map().await;
        let marker = map
            .ready()
            .unwrap()
            .markers
            .iter()
            .find(|m| m.listing.id == top)
            .unwrap();
        assert_eq!(marker.style.color, color::SELECTION);
        assert_eq!(marker.style.identity, TOP_COLORS[1]);
    }

    #[tokio::test]
    async fn rating_forces_fresh_recommendations() {
        let mut d = dashboard();
        d.ranked_list().await;
        assert_eq!(calls(&d, Endpoint::Recommendations), 1);

        let ack = d.rate(&id("6"), 5).await.unwrap();
        assert_eq!(ack.ratings_count, 1);
        d.rate(&id("7"), 1).await.unwrap();
        assert_eq!(d.state().ledger().server_count(), 2);

        let list = d.ranked_list().await;
        assert_eq!(calls(&d, Endpoint::Recommendations), 2);
        let list = list.ready().unwrap();
        assert!(list.model_trained);
        assert!(d.state().ledger().is_calibrated());
        let rated = list.rows.iter().find(|r| r.listing.id == id("6")).unwrap();
        assert_eq!(rated.rating, Rating::new(5).ok());
    }

    #[tokio::test]
    async fn failed_rating_keeps_local_value_and_cache() {
        let mut d = dashboard();
        d.ranked_list().await;
        d.queries()
            .api()
            .fail_next(Endpoint::SubmitRating, ApiError::Transport("reset".into()));
        let err = d.rate(&id("3"), 4).await.unwrap_err();
        assert!(matches!(err, RateError::Api(ApiError::Transport(_))));
        assert_eq!(d.state().ledger().rating(&id("3")), Rating::new(4).ok());
        assert_eq!(d.state().ledger().server_count(), 0);
        assert!(
            d.queries()
                .cached_recommendations(d.session(), d.config().recommendations_limit)
                .is_some()
        );
        assert_eq!(calls(&d, Endpoint::SubmitRating), 1);
    }

    #[tokio::test]
    async fn invalid_ratings_touch_nothing() {
        let mut d = dashboard();
        assert_eq!(
            d.rate(&id("3"), 9).await.unwrap_err(),
            RateError::Invalid(InvalidRating(9))
        );
        assert_eq!(d.rate(&id(""), 3).await.unwrap_err(), RateError::BlankListing);
        assert_eq!(calls(&d, Endpoint::SubmitRating), 0);
        assert_eq!(d.state().ledger().local_count(), 0);
    }

    #[tokio::test]
    async fn contributions_follow_selection_then_top() {
        let mut d = dashboard();
        assert!(d.contributions().await.is_disabled());

        d.rate(&id("6"), 5).await.unwrap();
        d.rate(&id("7"), 1).await.unwrap();
        d.ranked_list().await;
        let top: Vec<ListingId> = d.state().top().ids()[..3].to_vec();
        let panel = d.contributions().await;
        let mut explained: Vec<ListingId> =
            panel.ready().unwrap().bars.iter().map(|b| b.id.clone()).collect();
        explained.sort();
        let mut expected = top.clone();
        expected.sort();
        assert_eq!(explained, expected);

        d.dispatch(ViewEvent::ToggleSelect(id("2")));
        let panel = d.contributions().await;
        let bars = &panel.ready().unwrap().bars;
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].id, id("2"));
    }

    #[tokio::test]
    async fn untrained_contributions_fail_without_breaking_other_views() {
        let mut d = dashboard();
        d.ranked_list().await;
        let panel = d.contributions().await;
        assert!(matches!(
            panel.error(),
            Some(ApiError::Server { status: 400, .. })
        ));
        assert!(d.map().await.ready().is_some());
        assert!(d.radar().ready().is_some());
    }

    #[tokio::test]
    async fn detail_follows_focus() {
        let mut d = dashboard();
        assert!(d.detail().await.is_disabled());
        assert!(!d.dispatch(ViewEvent::OpenDetail(id(""))));
        assert!(d.detail().await.is_disabled());
        assert_eq!(calls(&d, Endpoint::Listing), 0);

        assert!(d.dispatch(ViewEvent::OpenDetail(id("4"))));
        assert_eq!(d.detail().await.ready().unwrap().listing.price, 70.0);
        d.detail().await;
        assert_eq!(calls(&d, Endpoint::Listing), 1);

        d.dispatch(ViewEvent::OpenDetail(id("404")));
        assert!(matches!(
            d.detail().await.error(),
            Some(ApiError::NotFound(_))
        ));
        d.dispatch(ViewEvent::CloseDetail);
        assert!(d.detail().await.is_disabled());
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_typing_triggers_one_listings_fetch() {
        let mut d = dashboard();
        let changes = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&changes);
        d.subscribe(&[Slice::Filter], move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        d.map().await;
        assert_eq!(calls(&d, Endpoint::Listings), 1);

        for raw in ["1", "10", "100"] {
            d.dispatch(ViewEvent::FilterInput {
                field: DraftField::PriceMax,
                raw: raw.into(),
            });
            tokio::time::advance(Duration::from_millis(30)).await;
        }
        assert!(d.settle_filters().await);
        assert!(!d.settle_filters().await);
        assert_eq!(changes.load(Ordering::SeqCst), 1);

        let map = d.map().await;
        assert_eq!(map.ready().unwrap().total, 3);
        assert_eq!(calls(&d, Endpoint::Listings), 2);
    }

    #[tokio::test]
    async fn map_survives_cluster_failure() {
        let mut d = dashboard();
        let unavailable = ApiError::Server {
            status: 503,
            body: String::new(),
        };
        d.queries()
            .api()
            .fail_next(Endpoint::Clusters, unavailable.clone());
        d.queries().api().fail_next(Endpoint::Clusters, unavailable);
        let map = d.map().await;
        let view = map.ready().unwrap();
        assert!(view.clusters_error.is_some());
        assert!(view.markers.iter().all(|m| m.cluster.is_none()));
        assert_eq!(view.markers.len(), 8);
    }

    #[tokio::test]
    async fn listings_failure_is_local_to_the_map() {
        let mut d = dashboard();
        d.queries()
            .api()
            .fail_next(Endpoint::Listings, ApiError::Decode("bad page".into()));
        assert!(d.map().await.error().is_some());
        assert!(d.ranked_list().await.ready().is_some());
        assert!(d.map().await.ready().is_some());
    }

    #[tokio::test]
    async fn calibration_sample_is_fetched_once() {
        let mut d = dashboard();
        let first = d.calibration().await;
        assert_eq!(first.ready().unwrap().listings.len(), 8);
        assert!(!first.ready().unwrap().model_trained);
        d.rate(&id("1"), 3).await.unwrap();
        let second = d.calibration().await;
        assert_eq!(second.ready().unwrap().rated, 1);
        assert_eq!(calls(&d, Endpoint::InitialSample), 1);
    }

    #[tokio::test]
    async fn scatter_disabled_without_attributes() {
        let mut d = dashboard();
        d.dispatch(ViewEvent::SetProjectionAttributes(vec![]));
        assert!(d.scatter().await.is_disabled());
        d.dispatch(ViewEvent::SetProjectionMode(ProjectionMode::Pca));
        d.dispatch(ViewEvent::SetProjectionAttributes(vec![
            "price".into(),
            "number_of_reviews".into(),
        ]));
        let scatter = d.scatter().await;
        assert_eq!(scatter.ready().unwrap().x_label, "PC1");
        assert_eq!(calls(&d, Endpoint::Projection), 1);
    }
}
