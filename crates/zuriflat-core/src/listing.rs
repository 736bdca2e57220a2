//! Rental listing snapshots as served by the remote source.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Opaque listing identifier.
///
/// The backend emits identifiers either as JSON strings or as integers
/// (large integers lose precision in JavaScript clients, so newer endpoints
/// stringify them). Both forms decode to the same string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ListingId(String);

impl ListingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the identifier is blank (used to reject no-op focus and selection).
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListingId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ListingId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for ListingId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Int(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Int(n) => Self(n.to_string()),
        })
    }
}

/// A read-only listing snapshot keyed by [`ListingId`].
///
/// The backend replaces NaN/Inf with `null`, so numeric attributes decode
/// `null` as zero instead of failing the whole response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Listing {
    pub id: ListingId,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    pub host_name: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub neighbourhood: String,
    #[serde(deserialize_with = "nullable")]
    pub latitude: f64,
    #[serde(deserialize_with = "nullable")]
    pub longitude: f64,
    #[serde(deserialize_with = "nullable")]
    pub room_type: String,
    #[serde(deserialize_with = "nullable")]
    pub price: f64,
    #[serde(deserialize_with = "count")]
    pub minimum_nights: u32,
    #[serde(deserialize_with = "count")]
    pub number_of_reviews: u32,
    pub last_review: Option<String>,
    pub reviews_per_month: Option<f64>,
    #[serde(deserialize_with = "count")]
    pub calculated_host_listings_count: u32,
    #[serde(deserialize_with = "count")]
    pub availability_365: u32,
    #[serde(deserialize_with = "nullable")]
    pub distance_from_center: f64,
}

/// Attributes that can be projected or compared numerically.
pub const NUMERIC_ATTRIBUTES: &[&str] = &[
    "price",
    "distance_from_center",
    "minimum_nights",
    "number_of_reviews",
    "availability_365",
    "calculated_host_listings_count",
];

impl Listing {
    /// Look up a numeric attribute by its wire name.
    pub fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "price" => Some(self.price),
            "distance_from_center" => Some(self.distance_from_center),
            "minimum_nights" => Some(self.minimum_nights as f64),
            "number_of_reviews" => Some(self.number_of_reviews as f64),
            "availability_365" => Some(self.availability_365 as f64),
            "calculated_host_listings_count" => Some(self.calculated_host_listings_count as f64),
            "latitude" => Some(self.latitude),
            "longitude" => Some(self.longitude),
            "reviews_per_month" => self.reviews_per_month,
            _ => None,
        }
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A whole-number count that may arrive as `12`, `12.0` or `null`.
fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<f64>::deserialize(deserializer)? else {
        return Ok(0);
    };
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) {
        Ok(value as u32)
    } else {
        Err(serde::de::Error::custom(format!(
            "expected a non-negative whole count, got {value}"
        )))
    }
}
