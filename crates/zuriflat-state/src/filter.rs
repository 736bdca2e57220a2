//! Filter model with debounced free-text numeric inputs.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;
use zuriflat_core::{FilterPatch, FilterPredicate};

/// Free-text numeric inputs that are debounced before they reach the predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DraftField {
    PriceMin,
    PriceMax,
    DistanceMax,
}

impl DraftField {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "price_min" => Some(DraftField::PriceMin),
            "price_max" => Some(DraftField::PriceMax),
            "distance_max" => Some(DraftField::DistanceMax),
            _ => None,
        }
    }
}

/// The committed predicate plus per-field keystroke drafts.
///
/// Drafts share one inactivity timer: every keystroke pushes the deadline to
/// `now + delay`, and a single commit folds all pending drafts into the
/// predicate once the deadline passes.
#[derive(Debug, Clone)]
pub struct FilterModel {
    predicate: FilterPredicate,
    drafts: BTreeMap<DraftField, String>,
    deadline: Option<Instant>,
    delay: Duration,
}

impl FilterModel {
    pub fn new(delay: Duration) -> Self {
        Self {
            predicate: FilterPredicate::default(),
            drafts: BTreeMap::new(),
            deadline: None,
            delay,
        }
    }

    pub fn predicate(&self) -> &FilterPredicate {
        &self.predicate
    }

    /// When the pending drafts become committable.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Merge a partial change immediately. Returns whether the predicate changed.
    pub fn update(&mut self, patch: &FilterPatch) -> bool {
        self.predicate.apply(patch)
    }

    /// Back to the all-wildcard predicate; pending drafts are discarded.
    pub fn reset(&mut self) -> bool {
        self.drafts.clear();
        self.deadline = None;
        let changed = !self.predicate.is_wildcard();
        self.predicate = FilterPredicate::default();
        changed
    }

    /// Record a keystroke for a debounced field.
    pub fn input(&mut self, field: DraftField, raw: impl Into<String>, now: Instant) {
        self.drafts.insert(field, raw.into());
        self.deadline = Some(now + self.delay);
    }

    /// Commit pending drafts if the inactivity window has elapsed.
    ///
    /// Returns the committed patch (possibly a no-op patch if every draft was
    /// unparsable), or `None` if nothing was due.
    pub fn commit_due(&mut self, now: Instant) -> Option<FilterPatch> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;

        let mut patch = FilterPatch::default();
        for (field, raw) in std::mem::take(&mut self.drafts) {
            let Some(value) = parse_draft(&raw) else {
                debug!(?field, raw = %raw, "ignoring unparsable filter input");
                continue;
            };
            match field {
                DraftField::PriceMin => patch.price_min = Some(value),
                DraftField::PriceMax => patch.price_max = Some(value),
                DraftField::DistanceMax => patch.distance_max = Some(value),
            }
        }
        self.predicate.apply(&patch);
        debug!(?patch, "committed debounced filter input");
        Some(patch)
    }
}

/// Empty text clears the bound; a finite non-negative number sets it;
/// anything else leaves the field untouched.
fn parse_draft(raw: &str) -> Option<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(None);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(Some)
}
