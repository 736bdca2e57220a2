//! Per-view render models. Each panel carries its own readiness, so one
//! view's failure never blocks another.

use zuriflat_core::color::Color;
use zuriflat_core::{ClusterCentroid, FeatureContribution, Listing, ListingId, Rating};
use zuriflat_state::Style;
use zuriflat_sync::ApiError;

/// Readiness of one view.
#[derive(Debug, Clone, PartialEq)]
pub enum Panel<T> {
    /// The view's read is disabled (nothing focused, nothing to explain, ...).
    Disabled,
    Ready(T),
    Failed(ApiError),
}

impl<T> Panel<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Panel::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Panel::Disabled)
    }

    /// Build the view from a ready value; disabled and failed pass through.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Panel<U> {
        match self {
            Panel::Ready(v) => Panel::Ready(f(v)),
            Panel::Disabled => Panel::Disabled,
            Panel::Failed(err) => Panel::Failed(err),
        }
    }
}

impl<T> From<Result<Option<T>, ApiError>> for Panel<T> {
    fn from(result: Result<Option<T>, ApiError>) -> Self {
        match result {
            Ok(Some(v)) => Panel::Ready(v),
            Ok(None) => Panel::Disabled,
            Err(err) => Panel::Failed(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedRow {
    pub listing: Listing,
    pub score: f64,
    pub style: Style,
    /// The user's own rating from this session, confirmed or not.
    pub rating: Option<Rating>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedList {
    pub rows: Vec<RankedRow>,
    pub model_trained: bool,
    pub ratings_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub listing: Listing,
    pub style: Style,
    pub cluster: Option<(u32, Color)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub markers: Vec<Marker>,
    pub centroids: Vec<ClusterCentroid>,
    pub total: u64,
    /// Clusters are decoration; their failure is reported without failing the map.
    pub clusters_error: Option<ApiError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub id: ListingId,
    pub x: f64,
    pub y: f64,
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterView {
    pub points: Vec<ScatterPoint>,
    pub x_label: String,
    pub y_label: String,
    pub explained_variance: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadarSeries {
    pub id: ListingId,
    pub name: String,
    pub values: [f64; 5],
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadarView {
    pub axes: [&'static str; 5],
    pub series: Vec<RadarSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContributionBars {
    pub id: ListingId,
    pub name: String,
    pub predicted_score: f64,
    pub intercept: f64,
    /// Largest absolute contribution first.
    pub contributions: Vec<FeatureContribution>,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContributionView {
    pub bars: Vec<ContributionBars>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub listing: Listing,
    pub style: Style,
    pub rating: Option<Rating>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationView {
    pub listings: Vec<Listing>,
    /// How many sample listings the user has rated locally.
    pub rated: usize,
    pub model_trained: bool,
}
