//! HTTP client for the listing service's REST endpoints.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::info;
use zuriflat_core::{
    ClusterSet, DashboardConfig, ExplanationSet, InitialSample, Listing, ListingId, ListingsPage,
    ListingsQuery, Projection, ProjectionParams, RatingAck, RatingRequest, RecommendationSet,
    SessionId,
};

use crate::{ApiError, ListingApi};

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Server {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

type Query = Vec<(&'static str, String)>;

/// Listing service client over reqwest.
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    /// Build a client for `config.backend_url` with the configured request timeout.
    pub fn new(config: &DashboardConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &Query) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.base_url);
        info!(url = %url, params = query.len(), "GET");
        let resp = self.client.get(&url).query(query).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }
}

fn listings_query(query: &ListingsQuery) -> Query {
    let mut pairs: Query = vec![
        ("page", query.page.to_string()),
        ("limit", query.limit.to_string()),
    ];
    if let Some(sort_by) = &query.sort_by {
        pairs.push(("sort_by", sort_by.clone()));
    }
    if let Some(order) = query.sort_order {
        pairs.push(("sort_order", order.as_str().to_string()));
    }
    let f = &query.filter;
    let bounds = [
        ("price_min", f.price_min),
        ("price_max", f.price_max),
        ("distance_max", f.distance_max),
    ];
    for (name, value) in bounds {
        if let Some(v) = value {
            pairs.push((name, v.to_string()));
        }
    }
    for room_type in &f.room_types {
        pairs.push(("room_types", room_type.clone()));
    }
    for neighbourhood in &f.neighbourhoods {
        pairs.push(("neighbourhoods", neighbourhood.clone()));
    }
    if let Some(v) = f.min_reviews {
        pairs.push(("min_reviews", v.to_string()));
    }
    if let Some(v) = f.availability_min {
        pairs.push(("availability_min", v.to_string()));
    }
    pairs
}

fn projection_query(params: &ProjectionParams) -> Query {
    vec![
        ("attributes", params.attributes.join(",")),
        ("mode", params.mode.as_str().to_string()),
        ("filter_outliers", params.filter_outliers.to_string()),
    ]
}

fn explainability_query(session: &SessionId, ids: &[ListingId]) -> Query {
    let ids: Vec<&str> = ids.iter().map(ListingId::as_str).collect();
    vec![
        ("session_id", session.to_string()),
        ("apartment_ids", ids.join(",")),
    ]
}

#[async_trait]
impl ListingApi for HttpApi {
    async fn listings(&self, query: &ListingsQuery) -> Result<ListingsPage, ApiError> {
        let page: ListingsPage = self.get("/apartments", &listings_query(query)).await?;
        info!(count = page.apartments.len(), total = page.total, "fetched listings");
        Ok(page)
    }

    async fn listing(&self, id: &ListingId) -> Result<Listing, ApiError> {
        self.get(&format!("/apartments/{id}"), &Vec::new()).await
    }

    async fn recommendations(
        &self,
        session: &SessionId,
        limit: u32,
    ) -> Result<RecommendationSet, ApiError> {
        let query = vec![
            ("session_id", session.to_string()),
            ("limit", limit.to_string()),
        ];
        let set: RecommendationSet = self.get("/recommendations", &query).await?;
        info!(
            count = set.recommendations.len(),
            trained = set.model_trained,
            "fetched recommendations"
        );
        Ok(set)
    }

    async fn projection(&self, params: &ProjectionParams) -> Result<Projection, ApiError> {
        self.get("/pca", &projection_query(params)).await
    }

    async fn explainability(
        &self,
        session: &SessionId,
        ids: &[ListingId],
    ) -> Result<ExplanationSet, ApiError> {
        self.get("/explainability", &explainability_query(session, ids))
            .await
    }

    async fn clusters(&self) -> Result<ClusterSet, ApiError> {
        self.get("/clusters", &Vec::new()).await
    }

    async fn initial_sample(&self) -> Result<InitialSample, ApiError> {
        self.get("/initial-sample", &Vec::new()).await
    }

    async fn submit_rating(&self, request: &RatingRequest) -> Result<RatingAck, ApiError> {
        let url = format!("{}/ratings", self.base_url);
        info!(url = %url, apartment = %request.apartment_id, "submitting rating");
        let resp = self.client.post(&url).json(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let ack: RatingAck = resp.json().await?;
        info!(count = ack.ratings_count, "rating accepted");
        Ok(ack)
    }
}
