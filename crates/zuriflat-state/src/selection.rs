//! Explicit selection (sliding window) and transient brushing.

use std::collections::{HashSet, VecDeque};

use zuriflat_core::ListingId;

use crate::ViewKind;

/// Up to `capacity` unique ids, oldest first.
#[derive(Debug, Clone)]
pub struct Selection {
    ids: VecDeque<ListingId>,
    capacity: usize,
}

impl Selection {
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Remove `id` if present, otherwise append it and evict the oldest beyond capacity.
    ///
    /// Returns `false` for a blank id, which is ignored.
    pub fn toggle(&mut self, id: &ListingId) -> bool {
        if id.is_empty() {
            return false;
        }
        if let Some(pos) = self.ids.iter().position(|s| s == id) {
            self.ids.remove(pos);
        } else {
            self.ids.push_back(id.clone());
            while self.ids.len() > self.capacity {
                self.ids.pop_front();
            }
        }
        true
    }

    /// Replace the whole selection, keeping the most recent `capacity` distinct ids.
    pub fn set(&mut self, ids: &[ListingId]) {
        self.ids.clear();
        for id in ids.iter().filter(|id| !id.is_empty()) {
            if let Some(pos) = self.ids.iter().position(|s| s == id) {
                self.ids.remove(pos);
            }
            self.ids.push_back(id.clone());
        }
        while self.ids.len() > self.capacity {
            self.ids.pop_front();
        }
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.ids.is_empty();
        self.ids.clear();
        changed
    }

    pub fn contains(&self, id: &ListingId) -> bool {
        self.ids.contains(id)
    }

    /// Ids in insertion order, most recent last.
    pub fn ids(&self) -> impl ExactSizeIterator<Item = &ListingId> {
        self.ids.iter()
    }

    pub fn to_vec(&self) -> Vec<ListingId> {
        self.ids.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// The result of one region-selection gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct BrushGesture {
    pub source: ViewKind,
    pub ids: HashSet<ListingId>,
}

/// Brushed ids from the most recent gesture.
///
/// `None` means no gesture has happened (or brushing was cleared); a gesture
/// that selected nothing is kept as an empty set.
#[derive(Debug, Clone, Default)]
pub struct Brush {
    gesture: Option<BrushGesture>,
}

impl Brush {
    /// Replace the brushed set wholesale with a new gesture's result.
    pub fn set(&mut self, source: ViewKind, ids: impl IntoIterator<Item = ListingId>) {
        let ids = ids.into_iter().filter(|id| !id.is_empty()).collect();
        self.gesture = Some(BrushGesture { source, ids });
    }

    pub fn clear(&mut self) -> bool {
        self.gesture.take().is_some()
    }

    pub fn gesture(&self) -> Option<&BrushGesture> {
        self.gesture.as_ref()
    }

    pub fn contains(&self, id: &ListingId) -> bool {
        self.gesture.as_ref().is_some_and(|g| g.ids.contains(id))
    }

    /// True when some listing is currently brushed (others render dimmed).
    pub fn is_active(&self) -> bool {
        self.gesture.as_ref().is_some_and(|g| !g.ids.is_empty())
    }

    pub fn len(&self) -> usize {
        self.gesture.as_ref().map_or(0, |g| g.ids.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
