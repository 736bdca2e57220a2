//! Conjunctive listing filter and the listings query built on top of it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::Listing;

/// The current query predicate. Absent fields (and empty sets) impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterPredicate {
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub distance_max: Option<f64>,
    pub room_types: BTreeSet<String>,
    pub neighbourhoods: BTreeSet<String>,
    pub min_reviews: Option<u32>,
    pub availability_min: Option<u32>,
}

/// A partial update to a [`FilterPredicate`].
///
/// The outer `Option` says whether the field is touched; for scalar fields the
/// inner `Option` is the new value (`None` clears the bound). Set fields are
/// replaced wholesale; an empty set clears the constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterPatch {
    pub price_min: Option<Option<f64>>,
    pub price_max: Option<Option<f64>>,
    pub distance_max: Option<Option<f64>>,
    pub room_types: Option<BTreeSet<String>>,
    pub neighbourhoods: Option<BTreeSet<String>>,
    pub min_reviews: Option<Option<u32>>,
    pub availability_min: Option<Option<u32>>,
}

impl FilterPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl FilterPredicate {
    /// Merge `patch` into the predicate, leaving untouched fields alone.
    ///
    /// Returns whether the predicate actually changed.
    pub fn apply(&mut self, patch: &FilterPatch) -> bool {
        let before = self.clone();
        if let Some(v) = patch.price_min {
            self.price_min = v;
        }
        if let Some(v) = patch.price_max {
            self.price_max = v;
        }
        if let Some(v) = patch.distance_max {
            self.distance_max = v;
        }
        if let Some(v) = &patch.room_types {
            self.room_types = v.clone();
        }
        if let Some(v) = &patch.neighbourhoods {
            self.neighbourhoods = v.clone();
        }
        if let Some(v) = patch.min_reviews {
            self.min_reviews = v;
        }
        if let Some(v) = patch.availability_min {
            self.availability_min = v;
        }
        *self != before
    }

    /// True when no field constrains anything.
    pub fn is_wildcard(&self) -> bool {
        *self == Self::default()
    }

    /// Evaluate the predicate against a listing snapshot.
    pub fn matches(&self, listing: &Listing) -> bool {
        self.price_min.is_none_or(|min| listing.price >= min)
            && self.price_max.is_none_or(|max| listing.price <= max)
            && self
                .distance_max
                .is_none_or(|max| listing.distance_from_center <= max)
            && (self.room_types.is_empty() || self.room_types.contains(&listing.room_type))
            && (self.neighbourhoods.is_empty()
                || self.neighbourhoods.contains(&listing.neighbourhood))
            && self
                .min_reviews
                .is_none_or(|min| listing.number_of_reviews >= min)
            && self
                .availability_min
                .is_none_or(|min| listing.availability_365 >= min)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Effective parameters of a listings read: pagination, sort, and predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingsQuery {
    pub page: u32,
    pub limit: u32,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub filter: FilterPredicate,
}

impl ListingsQuery {
    pub fn new(filter: FilterPredicate, limit: u32) -> Self {
        Self {
            page: 1,
            limit,
            sort_by: None,
            sort_order: None,
            filter,
        }
    }
}

impl Default for ListingsQuery {
    fn default() -> Self {
        Self::new(FilterPredicate::default(), 50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(price: f64, room_type: &str, reviews: u32) -> Listing {
        Listing {
            price,
            room_type: room_type.into(),
            number_of_reviews: reviews,
            distance_from_center: 2.0,
            availability_365: 200,
            ..Default::default()
        }
    }

    #[test]
    fn wildcard_matches_everything() {
        let f = FilterPredicate::default();
        assert!(f.is_wildcard());
        assert!(f.matches(&listing(0.0, "", 0)));
        assert!(f.matches(&listing(9999.0, "Shared room", 500)));
    }

    #[test]
    fn apply_merges_only_touched_fields() {
        let mut f = FilterPredicate {
            price_max: Some(300.0),
            ..Default::default()
        };
        let changed = f.apply(&FilterPatch {
            price_min: Some(Some(100.0)),
            ..Default::default()
        });
        assert!(changed);
        assert_eq!(f.price_min, Some(100.0));
        assert_eq!(f.price_max, Some(300.0));
    }

    #[test]
    fn apply_can_clear_a_bound() {
        let mut f = FilterPredicate {
            price_max: Some(300.0),
            ..Default::default()
        };
        f.apply(&FilterPatch {
            price_max: Some(None),
            ..Default::default()
        });
        assert!(f.is_wildcard());
    }

    #[test]
    fn apply_reports_no_change() {
        let mut f = FilterPredicate {
            min_reviews: Some(5),
            ..Default::default()
        };
        assert!(!f.apply(&FilterPatch {
            min_reviews: Some(Some(5)),
            ..Default::default()
        }));
        assert!(!f.apply(&FilterPatch::default()));
    }

    #[test]
    fn conjunctive_matching() {
        let f = FilterPredicate {
            price_min: Some(100.0),
            price_max: Some(200.0),
            room_types: ["Private room".to_string()].into(),
            min_reviews: Some(10),
            ..Default::default()
        };
        assert!(f.matches(&listing(150.0, "Private room", 10)));
        assert!(!f.matches(&listing(250.0, "Private room", 10)));
        assert!(!f.matches(&listing(150.0, "Entire home/apt", 10)));
        assert!(!f.matches(&listing(150.0, "Private room", 9)));
    }

    #[test]
    fn empty_room_type_set_is_wildcard() {
        let mut f = FilterPredicate {
            room_types: ["Hotel room".to_string()].into(),
            ..Default::default()
        };
        f.apply(&FilterPatch {
            room_types: Some(BTreeSet::new()),
            ..Default::default()
        });
        assert!(f.is_wildcard());
    }
}
