//! The single owned state container passed through the composition root.
//!
//! Reads go through plain selectors. Every write goes through a named
//! mutation that finishes before any subscriber hears about it, and a slice
//! is only announced when its value actually changed.

use tokio::time::Instant;
use tracing::debug;
use zuriflat_core::{
    DashboardConfig, FilterPatch, Listing, ListingId, ListingsQuery, ProjectionMode,
    ProjectionParams, Rating, RatingAck, RecommendationSet, SessionId, explained_ids,
};

use crate::{
    Brush, DetailFocus, DraftField, FilterModel, ListingIndex, Notifier, ProjectionSettings,
    RatingLedger, Selection, Slice, Style, SubscriptionId, TopRecommendations, ViewKind,
};

#[derive(Debug)]
pub struct DashboardState {
    filter: FilterModel,
    selection: Selection,
    brush: Brush,
    top: TopRecommendations,
    ledger: RatingLedger,
    focus: DetailFocus,
    projection: ProjectionSettings,
    index: ListingIndex,
    page_size: u32,
    notifier: Notifier,
}

impl DashboardState {
    pub fn new(config: &DashboardConfig, session: SessionId) -> Self {
        Self {
            filter: FilterModel::new(config.debounce),
            selection: Selection::new(config.selection_capacity),
            brush: Brush::default(),
            top: TopRecommendations::new(config.top_k),
            ledger: RatingLedger::new(session),
            focus: DetailFocus::default(),
            projection: ProjectionSettings::default(),
            index: ListingIndex::default(),
            page_size: config.listings_page_size,
            notifier: Notifier::default(),
        }
    }

    pub fn subscribe<F>(&mut self, slices: &[Slice], callback: F) -> SubscriptionId
    where
        F: Fn(Slice) + Send + Sync + 'static,
    {
        self.notifier.subscribe(slices, callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    fn announce(&self, slice: Slice, changed: bool) -> bool {
        if changed {
            debug!(?slice, "state changed");
            self.notifier.notify(slice);
        }
        changed
    }

    // -- selectors --

    pub fn session(&self) -> &SessionId {
        self.ledger.session()
    }

    pub fn filter(&self) -> &FilterModel {
        &self.filter
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    pub fn top(&self) -> &TopRecommendations {
        &self.top
    }

    pub fn ledger(&self) -> &RatingLedger {
        &self.ledger
    }

    pub fn focus(&self) -> &DetailFocus {
        &self.focus
    }

    pub fn projection(&self) -> &ProjectionSettings {
        &self.projection
    }

    pub fn snapshot(&self, id: &ListingId) -> Option<&Listing> {
        self.index.get(id)
    }

    /// Listings query for the committed predicate, first page.
    pub fn listings_query(&self) -> ListingsQuery {
        ListingsQuery::new(self.filter.predicate().clone(), self.page_size)
    }

    pub fn projection_params(&self) -> Option<ProjectionParams> {
        self.projection.params()
    }

    /// Listings compared side by side: the selection, else the top list.
    pub fn comparison_ids(&self) -> Vec<ListingId> {
        if self.selection.is_empty() {
            self.top.ids().to_vec()
        } else {
            self.selection.to_vec()
        }
    }

    /// Ids the contribution view explains; empty disables the read.
    pub fn explain_targets(&self) -> Vec<ListingId> {
        explained_ids(&self.comparison_ids())
    }

    pub fn style_for(&self, id: &ListingId) -> Style {
        Style::resolve(id, &self.selection, &self.brush, self.top.ids())
    }

    // -- filter --

    pub fn update_filter(&mut self, patch: &FilterPatch) -> bool {
        let changed = self.filter.update(patch);
        self.announce(Slice::Filter, changed)
    }

    pub fn reset_filters(&mut self) -> bool {
        let changed = self.filter.reset();
        self.announce(Slice::Filter, changed)
    }

    /// Hold a raw keystroke value; nothing is committed until the debounce elapses.
    pub fn filter_input(&mut self, field: DraftField, raw: impl Into<String>, now: Instant) {
        self.filter.input(field, raw, now);
    }

    pub fn pending_filter_deadline(&self) -> Option<Instant> {
        self.filter.deadline()
    }

    /// Commit drafts whose debounce window has elapsed by `now`.
    pub fn commit_due_filters(&mut self, now: Instant) -> bool {
        let before = self.filter.predicate().clone();
        if self.filter.commit_due(now).is_none() {
            return false;
        }
        let changed = *self.filter.predicate() != before;
        self.announce(Slice::Filter, changed)
    }

    // -- selection and brushing --

    pub fn toggle_selection(&mut self, id: &ListingId) -> bool {
        let changed = self.selection.toggle(id);
        self.announce(Slice::Selection, changed)
    }

    pub fn set_selection(&mut self, ids: &[ListingId]) -> bool {
        let before = self.selection.to_vec();
        self.selection.set(ids);
        let changed = self.selection.to_vec() != before;
        self.announce(Slice::Selection, changed)
    }

    pub fn clear_selection(&mut self) -> bool {
        let changed = self.selection.clear();
        self.announce(Slice::Selection, changed)
    }

    /// Replace the brush set with one gesture's result. Always announced, even
    /// when the gesture selected nothing.
    pub fn set_brushed(
        &mut self,
        source: ViewKind,
        ids: impl IntoIterator<Item = ListingId>,
    ) -> bool {
        self.brush.set(source, ids);
        debug!(%source, brushed = self.brush.len(), "brush gesture");
        self.announce(Slice::Brush, true)
    }

    pub fn clear_brush(&mut self) -> bool {
        let changed = self.brush.clear();
        self.announce(Slice::Brush, changed)
    }

    // -- recommendations and ratings --

    /// Absorb a recommendation response: snapshots, calibration flag, top list.
    ///
    /// Returns whether the top list changed.
    pub fn apply_recommendations(&mut self, set: &RecommendationSet) -> bool {
        self.index.absorb(set.recommendations.iter().map(|r| &r.apartment));
        let trained = self.ledger.set_model_trained(set.model_trained);
        self.announce(Slice::Ratings, trained);
        let changed = self.top.apply(&set.recommendations);
        self.announce(Slice::TopRecommendations, changed)
    }

    pub fn record_local_rating(&mut self, id: &ListingId, rating: Rating) -> bool {
        if id.is_empty() {
            return false;
        }
        let changed = self.ledger.record_local(id, rating) != Some(rating);
        self.announce(Slice::Ratings, changed)
    }

    pub fn apply_rating_ack(&mut self, ack: &RatingAck) -> bool {
        let changed = self.ledger.apply_ack(ack.ratings_count);
        self.announce(Slice::Ratings, changed)
    }

    // -- detail focus --

    pub fn open_detail(&mut self, id: &ListingId) -> bool {
        let changed = self.focus.open(id);
        self.announce(Slice::Focus, changed)
    }

    pub fn close_detail(&mut self) -> bool {
        let changed = self.focus.close();
        self.announce(Slice::Focus, changed)
    }

    // -- projection settings --

    pub fn set_projection_mode(&mut self, mode: ProjectionMode) -> bool {
        let changed = self.projection.mode != mode;
        self.projection.mode = mode;
        self.announce(Slice::Projection, changed)
    }

    pub fn set_projection_attributes(&mut self, attributes: Vec<String>) -> bool {
        let changed = self.projection.attributes != attributes;
        self.projection.attributes = attributes;
        self.announce(Slice::Projection, changed)
    }

    pub fn set_filter_outliers(&mut self, on: bool) -> bool {
        let changed = self.projection.filter_outliers != on;
        self.projection.filter_outliers = on;
        self.announce(Slice::Projection, changed)
    }

    /// Record snapshots from any successful listing-bearing fetch.
    pub fn absorb<'a>(&mut self, listings: impl IntoIterator<Item = &'a Listing>) {
        self.index.absorb(listings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use zuriflat_core::Recommendation;
    use zuriflat_core::color::{self, NEUTRAL, TOP_COLORS};

    use crate::Emphasis;

    fn id(s: &str) -> ListingId {
        ListingId::from(s)
    }

    fn state() -> DashboardState {
        DashboardState::new(&DashboardConfig::default(), SessionId::from("s1"))
    }

    fn recorder(state: &mut DashboardState, slices: &[Slice]) -> Arc<Mutex<Vec<Slice>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        state.subscribe(slices, move |slice| sink.lock().unwrap().push(slice));
        log
    }

    fn recs(ids: &[&str], trained: bool) -> RecommendationSet {
        RecommendationSet {
            recommendations: ids
                .iter()
                .enumerate()
                .map(|(i, s)| Recommendation {
                    apartment: Listing {
                        id: id(s),
                        price: 100.0 + i as f64,
                        ..Default::default()
                    },
                    predicted_score: 10.0 - i as f64,
                })
                .collect(),
            session_id: SessionId::from("s1"),
            model_trained: trained,
        }
    }

    #[test]
    fn unchanged_writes_are_silent() {
        let mut s = state();
        let log = recorder(&mut s, &Slice::ALL);
        assert!(!s.reset_filters());
        assert!(!s.clear_selection());
        assert!(!s.close_detail());
        assert!(!s.set_projection_mode(ProjectionMode::Raw));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn views_only_hear_their_slices() {
        let mut s = state();
        let map = recorder(&mut s, &[Slice::Selection, Slice::Brush]);
        let filters = recorder(&mut s, &[Slice::Filter]);
        s.toggle_selection(&id("a"));
        s.set_brushed(ViewKind::Scatter, [id("b")]);
        s.open_detail(&id("a"));
        assert_eq!(*map.lock().unwrap(), [Slice::Selection, Slice::Brush]);
        assert!(filters.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_brush_gesture_is_announced() {
        let mut s = state();
        let log = recorder(&mut s, &[Slice::Brush]);
        s.set_brushed(ViewKind::Map, [id("x"), id("y")]);
        s.set_brushed(ViewKind::Map, Vec::<ListingId>::new());
        assert_eq!(log.lock().unwrap().len(), 2);
        assert!(s.brush().is_empty());
    }

    #[test]
    fn recommendations_drive_top_and_calibration() {
        let mut s = state();
        let log = recorder(&mut s, &[Slice::TopRecommendations, Slice::Ratings]);
        assert!(s.apply_recommendations(&recs(&["L1", "L2", "L3", "L4", "L5", "L6"], true)));
        assert!(s.ledger().is_calibrated());
        assert_eq!(s.snapshot(&id("L6")).unwrap().price, 105.0);
        assert!(!s.apply_recommendations(&recs(&["L1", "L2", "L3", "L4", "L5"], true)));
        assert_eq!(
            *log.lock().unwrap(),
            [Slice::Ratings, Slice::TopRecommendations]
        );
        assert_eq!(s.style_for(&id("L1")).color, TOP_COLORS[0]);
        assert_eq!(s.style_for(&id("L6")).color, NEUTRAL);
    }

    #[test]
    fn explain_targets_prefer_selection() {
        let mut s = state();
        s.apply_recommendations(&recs(&["t1", "t2", "t3", "t4"], true));
        assert_eq!(s.explain_targets(), ["t1", "t2", "t3"].map(id).to_vec());

        for x in ["s4", "s1", "s2", "s3"] {
            s.toggle_selection(&id(x));
        }
        assert_eq!(s.explain_targets(), ["s1", "s2", "s4"].map(id).to_vec());
        assert_eq!(s.comparison_ids().len(), 4);
    }

    #[test]
    fn explain_targets_empty_without_inputs() {
        assert!(state().explain_targets().is_empty());
    }

    #[test]
    fn selection_color_wins_everywhere() {
        let mut s = state();
        s.apply_recommendations(&recs(&["a", "b"], true));
        s.set_brushed(ViewKind::Map, [id("a")]);
        s.toggle_selection(&id("a"));
        let style = s.style_for(&id("a"));
        assert_eq!(style.emphasis, Emphasis::Selected);
        assert_eq!(style.color, color::SELECTION);
    }

    #[test]
    fn rating_ack_never_lowers_count() {
        let mut s = state();
        let r = Rating::new(4).unwrap();
        assert!(s.record_local_rating(&id("a"), r));
        assert!(!s.record_local_rating(&id("a"), r));
        assert!(!s.record_local_rating(&id(""), r));
        let ack = |n| RatingAck {
            success: true,
            message: String::new(),
            ratings_count: n,
        };
        assert!(s.apply_rating_ack(&ack(3)));
        assert!(!s.apply_rating_ack(&ack(2)));
        assert_eq!(s.ledger().server_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_commit_announces_once() {
        let mut s = state();
        let log = recorder(&mut s, &[Slice::Filter]);
        let t0 = Instant::now();
        s.filter_input(DraftField::PriceMin, "1", t0);
        s.filter_input(DraftField::PriceMin, "12", t0 + Duration::from_millis(30));
        s.filter_input(DraftField::PriceMin, "120", t0 + Duration::from_millis(60));
        assert!(!s.commit_due_filters(t0 + Duration::from_millis(300)));
        let deadline = s.pending_filter_deadline().unwrap();
        assert!(s.commit_due_filters(deadline));
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(s.listings_query().filter.price_min, Some(120.0));
    }
}
