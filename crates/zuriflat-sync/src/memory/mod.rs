//! In-process listing service: the full remote contract over a fixed listing set.
//!
//! Serves offline CLI sessions from a JSON fixture and doubles as the test
//! backend for the query cache and the coordinator. Every call is counted per
//! endpoint; failures and latency can be injected.

mod stats;

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};
use zuriflat_core::listing::NUMERIC_ATTRIBUTES;
use zuriflat_core::{
    ClusterAssignment, ClusterCentroid, ClusterSet, Endpoint, Explanation, ExplanationSet,
    FeatureContribution, InitialSample, Listing, ListingId, ListingsPage, ListingsQuery,
    Projection, ProjectionMode, ProjectionParams, ProjectionPoint, Rating, RatingAck,
    RatingRequest, Recommendation, RecommendationSet, SessionId, SortOrder,
};

use self::stats::{Pca, Ridge, standardize};
use crate::{ApiError, ListingApi};

/// Standardised features the preference model is fitted on.
pub const MODEL_FEATURES: [&str; 5] = [
    "price",
    "distance_from_center",
    "number_of_reviews",
    "availability_365",
    "minimum_nights",
];

/// Ratings needed before a session's model is trained.
pub const MIN_TRAINING_RATINGS: usize = 2;

const RIDGE_ALPHA: f64 = 1.0;
const OUTLIER_Z: f64 = 3.0;
const INITIAL_SAMPLE_SIZE: usize = 20;

#[derive(Default)]
struct Inner {
    calls: HashMap<Endpoint, usize>,
    failures: HashMap<Endpoint, VecDeque<ApiError>>,
    ratings: HashMap<SessionId, BTreeMap<ListingId, Rating>>,
}

pub struct MemoryApi {
    listings: Vec<Listing>,
    /// Row-major z-scores of [`MODEL_FEATURES`], one row per listing.
    features: Vec<Vec<f64>>,
    latency: Option<Duration>,
    inner: Mutex<Inner>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Fixture {
    Page { apartments: Vec<Listing> },
    Bare(Vec<Listing>),
}

impl MemoryApi {
    pub fn new(listings: Vec<Listing>) -> Self {
        let columns: Vec<Vec<f64>> = MODEL_FEATURES
            .iter()
            .map(|name| standardize(&column(&listings, name)))
            .collect();
        let features = (0..listings.len())
            .map(|i| columns.iter().map(|c| c[i]).collect())
            .collect();
        Self {
            listings,
            features,
            latency: None,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Load listings from a JSON file holding either a bare array or a listings page.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixtures {}", path.display()))?;
        let fixture: Fixture = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse fixtures {}", path.display()))?;
        let listings = match fixture {
            Fixture::Page { apartments } => apartments,
            Fixture::Bare(listings) => listings,
        };
        info!(count = listings.len(), path = %path.display(), "loaded fixtures");
        Ok(Self::new(listings))
    }

    /// Delay every call by `latency` after it has been counted.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the next call to `endpoint` with `err`. Queued failures are consumed in order.
    pub fn fail_next(&self, endpoint: Endpoint, err: ApiError) {
        self.lock()
            .failures
            .entry(endpoint)
            .or_default()
            .push_back(err);
    }

    /// Calls made to `endpoint` so far, including failed ones.
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.lock().calls.get(&endpoint).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self, endpoint: Endpoint) -> Result<(), ApiError> {
        let failure = {
            let mut inner = self.lock();
            *inner.calls.entry(endpoint).or_default() += 1;
            inner.failures.get_mut(&endpoint).and_then(VecDeque::pop_front)
        };
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        debug!(%endpoint, "memory backend call");
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn position(&self, id: &ListingId) -> Option<usize> {
        self.listings.iter().position(|l| &l.id == id)
    }

    /// The session's fitted model, or `None` below [`MIN_TRAINING_RATINGS`] known ratings.
    fn model(&self, session: &SessionId) -> Option<Ridge> {
        let inner = self.lock();
        let ratings = inner.ratings.get(session)?;
        let mut rows: Vec<&[f64]> = Vec::new();
        let mut targets = Vec::new();
        for (id, rating) in ratings {
            if let Some(i) = self.position(id) {
                rows.push(&self.features[i]);
                targets.push(f64::from(rating.get()));
            }
        }
        if rows.len() < MIN_TRAINING_RATINGS {
            return None;
        }
        Ridge::fit(&rows, &targets, RIDGE_ALPHA)
    }

    fn explain(&self, model: &Ridge, index: usize) -> Explanation {
        let x = &self.features[index];
        let contributions = MODEL_FEATURES
            .iter()
            .zip(&model.coef)
            .zip(x)
            .map(|((name, coef), value)| FeatureContribution {
                feature_name: (*name).to_string(),
                contribution: coef * value,
                coefficient: *coef,
                normalized_value: *value,
            })
            .collect();
        let listing = &self.listings[index];
        Explanation {
            apartment_id: listing.id.clone(),
            apartment: listing.clone(),
            predicted_score: model.predict(x),
            intercept: model.intercept,
            contributions,
        }
    }
}

fn column(listings: &[Listing], name: &str) -> Vec<f64> {
    listings
        .iter()
        .map(|l| l.attribute(name).unwrap_or(0.0))
        .collect()
}

fn is_numeric(name: &str) -> bool {
    NUMERIC_ATTRIBUTES.contains(&name)
}

fn unknown_attribute(name: &str) -> ApiError {
    ApiError::Server {
        status: 422,
        body: format!("unknown attribute: {name}"),
    }
}

#[async_trait]
impl ListingApi for MemoryApi {
    async fn listings(&self, query: &ListingsQuery) -> Result<ListingsPage, ApiError> {
        self.enter(Endpoint::Listings).await?;
        let mut matched: Vec<&Listing> = self
            .listings
            .iter()
            .filter(|l| query.filter.matches(l))
            .collect();
        if let Some(sort_by) = &query.sort_by {
            if !is_numeric(sort_by) {
                return Err(unknown_attribute(sort_by));
            }
            matched.sort_by(|a, b| {
                let (a, b) = (
                    a.attribute(sort_by).unwrap_or(0.0),
                    b.attribute(sort_by).unwrap_or(0.0),
                );
                match query.sort_order.unwrap_or_default() {
                    SortOrder::Asc => a.total_cmp(&b),
                    SortOrder::Desc => b.total_cmp(&a),
                }
            });
        }
        let page = query.page.max(1);
        let offset = (page as usize - 1) * query.limit as usize;
        let apartments = matched
            .iter()
            .skip(offset)
            .take(query.limit as usize)
            .map(|l| (*l).clone())
            .collect();
        Ok(ListingsPage {
            apartments,
            total: matched.len() as u64,
            page,
            limit: query.limit,
        })
    }

    async fn listing(&self, id: &ListingId) -> Result<Listing, ApiError> {
        self.enter(Endpoint::Listing).await?;
        self.position(id)
            .map(|i| self.listings[i].clone())
            .ok_or_else(|| ApiError::NotFound(format!("/apartments/{id}")))
    }

    async fn recommendations(
        &self,
        session: &SessionId,
        limit: u32,
    ) -> Result<RecommendationSet, ApiError> {
        self.enter(Endpoint::Recommendations).await?;
        let model = self.model(session);
        let mut scored: Vec<(usize, f64)> = match &model {
            Some(model) => self
                .features
                .iter()
                .enumerate()
                .map(|(i, x)| (i, model.predict(x)))
                .collect(),
            None => self
                .listings
                .iter()
                .enumerate()
                .map(|(i, l)| (i, f64::from(l.number_of_reviews)))
                .collect(),
        };
        scored.sort_by(|(ia, a), (ib, b)| {
            b.total_cmp(a)
                .then_with(|| self.listings[*ia].price.total_cmp(&self.listings[*ib].price))
        });
        let recommendations = scored
            .into_iter()
            .take(limit as usize)
            .map(|(i, score)| Recommendation {
                apartment: self.listings[i].clone(),
                predicted_score: score,
            })
            .collect();
        Ok(RecommendationSet {
            recommendations,
            session_id: session.clone(),
            model_trained: model.is_some(),
        })
    }

    async fn projection(&self, params: &ProjectionParams) -> Result<Projection, ApiError> {
        self.enter(Endpoint::Projection).await?;
        if let Some(bad) = params.attributes.iter().find(|a| !is_numeric(a)) {
            return Err(unknown_attribute(bad));
        }
        let z: Vec<Vec<f64>> = params
            .attributes
            .iter()
            .map(|a| standardize(&column(&self.listings, a)))
            .collect();
        let keep = |i: usize| !params.filter_outliers || z.iter().all(|c| c[i].abs() <= OUTLIER_Z);

        let (coords, x_label, y_label, explained_variance): (Vec<(f64, f64)>, _, _, _) =
            match params.mode {
                ProjectionMode::Raw => {
                    let x_name = params.attributes.first().map_or("", String::as_str);
                    let y_name = params.attributes.get(1).map_or(x_name, String::as_str);
                    let coords = self
                        .listings
                        .iter()
                        .map(|l| {
                            (
                                l.attribute(x_name).unwrap_or(0.0),
                                l.attribute(y_name).unwrap_or(0.0),
                            )
                        })
                        .collect();
                    (coords, x_name.to_string(), y_name.to_string(), None)
                }
                ProjectionMode::Pca => {
                    let rows: Vec<Vec<f64>> = if z.len() >= 2 {
                        (0..self.listings.len())
                            .map(|i| z.iter().map(|c| c[i]).collect())
                            .collect()
                    } else {
                        self.features.clone()
                    };
                    let pca = Pca::fit(&rows);
                    let coords = rows.iter().map(|r| pca.transform(r)).collect();
                    (
                        coords,
                        "PC1".to_string(),
                        "PC2".to_string(),
                        Some(pca.explained_variance_ratio.to_vec()),
                    )
                }
            };

        let points = coords
            .into_iter()
            .enumerate()
            .filter(|(i, _)| keep(*i))
            .map(|(i, (x, y))| ProjectionPoint {
                apartment_id: self.listings[i].id.clone(),
                x,
                y,
                apartment: self.listings[i].clone(),
            })
            .collect();
        Ok(Projection {
            points,
            x_label,
            y_label,
            explained_variance,
            mode: params.mode,
        })
    }

    async fn explainability(
        &self,
        session: &SessionId,
        ids: &[ListingId],
    ) -> Result<ExplanationSet, ApiError> {
        self.enter(Endpoint::Explainability).await?;
        let model = self.model(session).ok_or_else(|| ApiError::Server {
            status: 400,
            body: "Model not trained for this session".to_string(),
        })?;
        let explanations = ids
            .iter()
            .filter_map(|id| self.position(id))
            .map(|i| self.explain(&model, i))
            .collect();
        Ok(ExplanationSet {
            explanations,
            session_id: session.clone(),
        })
    }

    async fn clusters(&self) -> Result<ClusterSet, ApiError> {
        self.enter(Endpoint::Clusters).await?;
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, l) in self.listings.iter().enumerate() {
            groups.entry(l.neighbourhood.as_str()).or_default().push(i);
        }
        let mut clusters = Vec::with_capacity(self.listings.len());
        let mut centroids = Vec::with_capacity(groups.len());
        for (cluster_id, members) in groups.values().enumerate() {
            let cluster_id = cluster_id as u32;
            let n = members.len() as f64;
            centroids.push(ClusterCentroid {
                cluster_id,
                latitude: members.iter().map(|&i| self.listings[i].latitude).sum::<f64>() / n,
                longitude: members.iter().map(|&i| self.listings[i].longitude).sum::<f64>() / n,
                size: members.len() as u32,
            });
            clusters.extend(members.iter().map(|&i| ClusterAssignment {
                apartment_id: self.listings[i].id.clone(),
                cluster_id,
                apartment: self.listings[i].clone(),
            }));
        }
        Ok(ClusterSet {
            clusters,
            centroids,
        })
    }

    async fn initial_sample(&self) -> Result<InitialSample, ApiError> {
        self.enter(Endpoint::InitialSample).await?;
        let n = self.listings.len();
        let k = INITIAL_SAMPLE_SIZE.min(n);
        let mut chosen: Vec<usize> = Vec::with_capacity(k);
        if n > 0 {
            chosen.push(0);
            let dist = |a: usize, b: usize| {
                self.features[a]
                    .iter()
                    .zip(&self.features[b])
                    .map(|(x, y)| (x - y).powi(2))
                    .sum::<f64>()
            };
            let mut nearest: Vec<f64> = (0..n).map(|i| dist(0, i)).collect();
            while chosen.len() < k {
                let Some((next, _)) = nearest
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !chosen.contains(i))
                    .max_by(|(_, a), (_, b)| a.total_cmp(b))
                else {
                    break;
                };
                chosen.push(next);
                for (i, d) in nearest.iter_mut().enumerate() {
                    *d = d.min(dist(next, i));
                }
            }
        }
        let apartments: Vec<Listing> = chosen.iter().map(|&i| self.listings[i].clone()).collect();
        Ok(InitialSample {
            sample_size: apartments.len() as u32,
            apartments,
        })
    }

    async fn submit_rating(&self, request: &RatingRequest) -> Result<RatingAck, ApiError> {
        self.enter(Endpoint::SubmitRating).await?;
        let mut inner = self.lock();
        let session = inner.ratings.entry(request.session_id.clone()).or_default();
        session.insert(request.apartment_id.clone(), request.rating);
        let ratings_count = session.len() as u32;
        info!(session = %request.session_id, count = ratings_count, "rating recorded");
        Ok(RatingAck {
            success: true,
            message: "Rating recorded".to_string(),
            ratings_count,
        })
    }
}

/// A small deterministic listing set for tests across the workspace.
pub fn sample_listings() -> Vec<Listing> {
    let rows = [
        ("1", "Altstadt", "Entire home/apt", 180.0, 0.4, 210, 120),
        ("2", "Altstadt", "Private room", 95.0, 0.6, 88, 300),
        ("3", "Wiedikon", "Entire home/apt", 140.0, 2.1, 64, 45),
        ("4", "Wiedikon", "Private room", 70.0, 2.5, 12, 365),
        ("5", "Oerlikon", "Entire home/apt", 120.0, 5.2, 33, 200),
        ("6", "Oerlikon", "Shared room", 45.0, 5.8, 5, 90),
        ("7", "Seefeld", "Entire home/apt", 260.0, 1.3, 150, 30),
        ("8", "Seefeld", "Private room", 110.0, 1.6, 41, 180),
    ];
    rows.into_iter()
        .enumerate()
        .map(|(i, (id, hood, room, price, dist, reviews, avail))| Listing {
            id: ListingId::from(id),
            name: format!("{room} in {hood}"),
            neighbourhood: hood.to_string(),
            room_type: room.to_string(),
            price,
            distance_from_center: dist,
            number_of_reviews: reviews,
            availability_365: avail,
            minimum_nights: 1 + i as u32 % 3,
            latitude: 47.37 + i as f64 * 0.005,
            longitude: 8.54 + i as f64 * 0.004,
            ..Default::default()
        })
        .collect()
}
