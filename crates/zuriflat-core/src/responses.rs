//! Request/response contracts of the remote listing service.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Listing, ListingId, ProjectionMode, SessionId};

/// One page of listings matching a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingsPage {
    pub apartments: Vec<Listing>,
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub apartment: Listing,
    pub predicted_score: f64,
}

/// Ranked recommendations for a session, score-descending as returned by the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub recommendations: Vec<Recommendation>,
    pub session_id: SessionId,
    pub model_trained: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub apartment_id: ListingId,
    pub x: f64,
    pub y: f64,
    pub apartment: Listing,
}

/// 2-D points from a raw attribute pair or a PCA projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub points: Vec<ProjectionPoint>,
    pub x_label: String,
    pub y_label: String,
    #[serde(default)]
    pub explained_variance: Option<Vec<f64>>,
    pub mode: ProjectionMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature_name: String,
    pub contribution: f64,
    pub coefficient: f64,
    pub normalized_value: f64,
}

/// Intercept plus per-feature contributions behind one listing's predicted score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub apartment_id: ListingId,
    pub apartment: Listing,
    pub predicted_score: f64,
    pub intercept: f64,
    pub contributions: Vec<FeatureContribution>,
}

impl Explanation {
    /// Contributions ordered by absolute magnitude, largest first.
    pub fn ranked(&self) -> Vec<&FeatureContribution> {
        let mut ranked: Vec<&FeatureContribution> = self.contributions.iter().collect();
        ranked.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
        ranked
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationSet {
    pub explanations: Vec<Explanation>,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub apartment_id: ListingId,
    pub cluster_id: u32,
    pub apartment: Listing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterCentroid {
    pub cluster_id: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSet {
    pub clusters: Vec<ClusterAssignment>,
    pub centroids: Vec<ClusterCentroid>,
}

/// Fixed-size bootstrap set for cold-start calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialSample {
    pub apartments: Vec<Listing>,
    pub sample_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rating must be between 1 and 5, got {0}")]
pub struct InvalidRating(pub u8);

/// A user rating in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, InvalidRating> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidRating(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = InvalidRating;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRequest {
    pub session_id: SessionId,
    pub apartment_id: ListingId,
    pub rating: Rating,
}

/// Server acknowledgement of a rating, with the session's cumulative count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingAck {
    #[serde(default = "accepted")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub ratings_count: u32,
}

fn accepted() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_range_is_enforced() {
        assert!(Rating::new(0).is_err());
        assert_eq!(Rating::new(1).unwrap().get(), 1);
        assert_eq!(Rating::new(5).unwrap().get(), 5);
        assert_eq!(Rating::new(6), Err(InvalidRating(6)));
    }

    #[test]
    fn rating_rejects_out_of_range_json() {
        assert!(serde_json::from_str::<Rating>("4").is_ok());
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }

    #[test]
    fn rating_request_wire_shape() {
        let req = RatingRequest {
            session_id: SessionId::from("session_1_abcdefg"),
            apartment_id: ListingId::from("42"),
            rating: Rating::new(4).unwrap(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "session_id": "session_1_abcdefg",
                "apartment_id": "42",
                "rating": 4
            })
        );
    }

    #[test]
    fn rating_ack_tolerates_minimal_body() {
        let ack: RatingAck = serde_json::from_str(r#"{"ratings_count": 3}"#).unwrap();
        assert!(ack.success);
        assert_eq!(ack.ratings_count, 3);
    }

    #[test]
    fn explanation_ranks_by_magnitude() {
        let contribution = |name: &str, c: f64| FeatureContribution {
            feature_name: name.into(),
            contribution: c,
            coefficient: 1.0,
            normalized_value: c,
        };
        let explanation = Explanation {
            apartment_id: ListingId::from("1"),
            apartment: Listing::default(),
            predicted_score: 3.5,
            intercept: 3.0,
            contributions: vec![
                contribution("price", 0.2),
                contribution("distance_from_center", -0.9),
                contribution("number_of_reviews", 0.4),
            ],
        };
        let names: Vec<&str> = explanation
            .ranked()
            .iter()
            .map(|c| c.feature_name.as_str())
            .collect();
        assert_eq!(
            names,
            ["distance_from_center", "number_of_reviews", "price"]
        );
    }

    #[test]
    fn recommendation_set_decodes_integer_ids() {
        let json = r#"{
            "recommendations": [
                {"apartment": {"id": 11, "name": "A"}, "predicted_score": 4.2},
                {"apartment": {"id": "12", "name": "B"}, "predicted_score": 3.9}
            ],
            "session_id": "s",
            "model_trained": true
        }"#;
        let set: RecommendationSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.recommendations[0].apartment.id.as_str(), "11");
        assert_eq!(set.recommendations[1].apartment.id.as_str(), "12");
    }
}
