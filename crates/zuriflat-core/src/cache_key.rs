//! Canonical cache keys for remote reads.
//!
//! Every read is addressed by an [`Endpoint`] plus its effective parameters.
//! The builders below normalise those parameters into a single string so that
//! two semantically-equal parameter sets always produce equal (and equally
//! hashed) keys:
//!
//! - every parameter slot is always present, in a fixed order
//! - an absent optional value is written as `~`
//! - sets (room types, neighbourhoods, explained ids) are sorted and deduplicated
//! - free-text values escape the separators `\ , ; | = ~` with a backslash
//! - floats are written in shortest round-trip form with `-0` folded into `0`
//!
//! Example: `listings|page=1;limit=50;sort_by=~;order=~;price_min=100;...`

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ListingId, ListingsQuery, SessionId};

/// Sentinel for an absent parameter.
const ABSENT: &str = "~";

/// Upper bound on listings explained in one explainability read.
pub const MAX_EXPLAINED: usize = 3;

/// Remote endpoints of the listing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Endpoint {
    Listings,
    Listing,
    Recommendations,
    Projection,
    Explainability,
    Clusters,
    InitialSample,
    /// The single mutating call. Never cached.
    SubmitRating,
}

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::Listings => "listings",
            Endpoint::Listing => "listing",
            Endpoint::Recommendations => "recommendations",
            Endpoint::Projection => "projection",
            Endpoint::Explainability => "explainability",
            Endpoint::Clusters => "clusters",
            Endpoint::InitialSample => "initial_sample",
            Endpoint::SubmitRating => "submit_rating",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Projection view mode: a raw attribute pair or the first two principal components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    #[default]
    Raw,
    Pca,
}

impl ProjectionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectionMode::Raw => "raw",
            ProjectionMode::Pca => "pca",
        }
    }
}

/// Effective parameters of a projection read.
///
/// Attribute order is meaningful (first is the x axis), so it is kept as given.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionParams {
    pub attributes: Vec<String>,
    pub mode: ProjectionMode,
    pub filter_outliers: bool,
}

/// Canonical cache key: endpoint, optional session scope, normalised parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    endpoint: Endpoint,
    session: Option<SessionId>,
    params: String,
}

impl CacheKey {
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// The session this entry is scoped to, if any.
    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    pub fn params(&self) -> &str {
        &self.params
    }

    pub fn listings(query: &ListingsQuery) -> Self {
        let f = &query.filter;
        let params = [
            slot("page", query.page.to_string()),
            slot("limit", query.limit.to_string()),
            slot("sort_by", opt(query.sort_by.as_deref().map(escape))),
            slot("order", opt(query.sort_order.map(|o| o.as_str()))),
            slot("price_min", opt_f64(f.price_min)),
            slot("price_max", opt_f64(f.price_max)),
            slot("distance_max", opt_f64(f.distance_max)),
            slot("room_types", set(f.room_types.iter().map(String::as_str))),
            slot("neighbourhoods", set(f.neighbourhoods.iter().map(String::as_str))),
            slot("min_reviews", opt(f.min_reviews)),
            slot("availability_min", opt(f.availability_min)),
        ]
        .join(";");
        Self::unscoped(Endpoint::Listings, params)
    }

    pub fn listing(id: &ListingId) -> Self {
        Self::unscoped(Endpoint::Listing, slot("id", escape(id.as_str())))
    }

    pub fn recommendations(session: &SessionId, limit: u32) -> Self {
        Self::scoped(
            Endpoint::Recommendations,
            session,
            slot("limit", limit.to_string()),
        )
    }

    pub fn projection(params: &ProjectionParams) -> Self {
        let attributes = if params.attributes.is_empty() {
            ABSENT.to_string()
        } else {
            params
                .attributes
                .iter()
                .map(|a| escape(a))
                .collect::<Vec<_>>()
                .join(",")
        };
        let joined = [
            slot("attributes", attributes),
            slot("mode", params.mode.as_str().to_string()),
            slot("outliers", params.filter_outliers.to_string()),
        ]
        .join(";");
        Self::unscoped(Endpoint::Projection, joined)
    }

    /// Key for an explainability read; `ids` are canonicalised with [`explained_ids`].
    pub fn explainability(session: &SessionId, ids: &[ListingId]) -> Self {
        let ids = explained_ids(ids);
        Self::scoped(
            Endpoint::Explainability,
            session,
            slot("ids", set(ids.iter().map(ListingId::as_str))),
        )
    }

    pub fn clusters() -> Self {
        Self::unscoped(Endpoint::Clusters, String::new())
    }

    pub fn initial_sample() -> Self {
        Self::unscoped(Endpoint::InitialSample, String::new())
    }

    fn unscoped(endpoint: Endpoint, params: String) -> Self {
        Self {
            endpoint,
            session: None,
            params,
        }
    }

    fn scoped(endpoint: Endpoint, session: &SessionId, params: String) -> Self {
        Self {
            endpoint,
            session: Some(session.clone()),
            params,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint)?;
        if let Some(session) = &self.session {
            write!(f, "|{session}")?;
        }
        if !self.params.is_empty() {
            write!(f, "|{}", self.params)?;
        }
        Ok(())
    }
}

/// Canonical id list for an explainability read.
///
/// Keeps the first [`MAX_EXPLAINED`] distinct, non-blank ids in the given
/// order, then sorts them, so `[B, A]` and `[A, B, A]` request the same thing.
pub fn explained_ids(ids: &[ListingId]) -> Vec<ListingId> {
    let mut out: Vec<ListingId> = Vec::with_capacity(MAX_EXPLAINED);
    for id in ids {
        if out.len() == MAX_EXPLAINED {
            break;
        }
        if !id.is_empty() && !out.contains(id) {
            out.push(id.clone());
        }
    }
    out.sort();
    out
}

fn slot(name: &str, value: String) -> String {
    format!("{name}={value}")
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| ABSENT.to_string(), |v| v.to_string())
}

fn opt_f64(value: Option<f64>) -> String {
    value.map_or_else(|| ABSENT.to_string(), canonical_f64)
}

/// Shortest round-trip decimal, with negative zero folded into zero.
fn canonical_f64(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{value}")
    }
}

fn set<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let mut items: Vec<&str> = items.collect();
    if items.is_empty() {
        return ABSENT.to_string();
    }
    items.sort_unstable();
    items.dedup();
    items.into_iter().map(escape).collect::<Vec<_>>().join(",")
}

/// Backslash-escape the characters that separate or mark key slots.
fn escape(item: &str) -> String {
    let mut out = String::with_capacity(item.len());
    for c in item.chars() {
        if matches!(c, '\\' | ',' | ';' | '|' | '=' | '~') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
