use std::collections::HashMap;

use zuriflat_core::{Listing, ListingId};

/// Latest read-only snapshot of every listing seen in a fetch result.
#[derive(Debug, Clone, Default)]
pub struct ListingIndex {
    snapshots: HashMap<ListingId, Listing>,
}

impl ListingIndex {
    /// Insert or refresh snapshots; the newest response wins.
    pub fn absorb<'a>(&mut self, listings: impl IntoIterator<Item = &'a Listing>) {
        for listing in listings {
            if !listing.id.is_empty() {
                self.snapshots.insert(listing.id.clone(), listing.clone());
            }
        }
    }

    pub fn get(&self, id: &ListingId) -> Option<&Listing> {
        self.snapshots.get(id)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
