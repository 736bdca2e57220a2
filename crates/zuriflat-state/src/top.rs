//! Top-K recommendation cache feeding stable color assignment.

use zuriflat_core::{ListingId, Recommendation};

/// The best `capacity` listings from the latest recommendation fetch.
#[derive(Debug, Clone)]
pub struct TopRecommendations {
    ids: Vec<ListingId>,
    capacity: usize,
}

impl TopRecommendations {
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: Vec::new(),
            capacity,
        }
    }

    /// Take the first `capacity` distinct listings in source order.
    ///
    /// The list is replaced only when its id sequence differs from the current
    /// one; an empty response keeps the previous list. Returns whether it changed.
    pub fn apply(&mut self, recommendations: &[Recommendation]) -> bool {
        if recommendations.is_empty() {
            return false;
        }
        let mut ids: Vec<ListingId> = Vec::with_capacity(self.capacity);
        for rec in recommendations {
            if ids.len() == self.capacity {
                break;
            }
            if !ids.contains(&rec.apartment.id) {
                ids.push(rec.apartment.id.clone());
            }
        }
        if ids == self.ids {
            return false;
        }
        self.ids = ids;
        true
    }

    /// Ordered ids; the sole input to [`zuriflat_core::color_for`].
    pub fn ids(&self) -> &[ListingId] {
        &self.ids
    }

    pub fn rank_of(&self, id: &ListingId) -> Option<usize> {
        self.ids.iter().position(|t| t == id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
