//! Client-side session and rating ledger.

use std::collections::HashMap;

use zuriflat_core::{ListingId, Rating, SessionId};

/// The session token, optimistic local ratings, and the server-reported count.
#[derive(Debug, Clone)]
pub struct RatingLedger {
    session: SessionId,
    local: HashMap<ListingId, Rating>,
    server_count: u32,
    model_trained: bool,
}

impl RatingLedger {
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            local: HashMap::new(),
            server_count: 0,
            model_trained: false,
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Record the user's click before the server confirms it (last write wins).
    ///
    /// Returns the previous local rating, if any.
    pub fn record_local(&mut self, id: &ListingId, rating: Rating) -> Option<Rating> {
        self.local.insert(id.clone(), rating)
    }

    pub fn rating(&self, id: &ListingId) -> Option<Rating> {
        self.local.get(id).copied()
    }

    pub fn local_count(&self) -> usize {
        self.local.len()
    }

    /// Apply the cumulative count from a rating acknowledgement.
    ///
    /// Acknowledgements may arrive out of order, so the count never decreases.
    /// Returns whether it changed.
    pub fn apply_ack(&mut self, ratings_count: u32) -> bool {
        let next = self.server_count.max(ratings_count);
        let changed = next != self.server_count;
        self.server_count = next;
        changed
    }

    pub fn server_count(&self) -> u32 {
        self.server_count
    }

    /// Whether the latest recommendation response came from a trained model.
    pub fn is_calibrated(&self) -> bool {
        self.model_trained
    }

    pub fn set_model_trained(&mut self, trained: bool) -> bool {
        let changed = self.model_trained != trained;
        self.model_trained = trained;
        changed
    }
}
