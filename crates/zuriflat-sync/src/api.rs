//! The remote listing service contract.

use std::sync::Arc;

use async_trait::async_trait;
use zuriflat_core::{
    ClusterSet, ExplanationSet, InitialSample, Listing, ListingId, ListingsPage, ListingsQuery,
    Projection, ProjectionParams, RatingAck, RatingRequest, RecommendationSet, SessionId,
};

use crate::ApiError;

/// Every read the dashboard consumes plus the single rating write.
#[async_trait]
pub trait ListingApi: Send + Sync {
    async fn listings(&self, query: &ListingsQuery) -> Result<ListingsPage, ApiError>;

    /// One listing, or [`ApiError::NotFound`].
    async fn listing(&self, id: &ListingId) -> Result<Listing, ApiError>;

    async fn recommendations(
        &self,
        session: &SessionId,
        limit: u32,
    ) -> Result<RecommendationSet, ApiError>;

    async fn projection(&self, params: &ProjectionParams) -> Result<Projection, ApiError>;

    async fn explainability(
        &self,
        session: &SessionId,
        ids: &[ListingId],
    ) -> Result<ExplanationSet, ApiError>;

    async fn clusters(&self) -> Result<ClusterSet, ApiError>;

    async fn initial_sample(&self) -> Result<InitialSample, ApiError>;

    async fn submit_rating(&self, request: &RatingRequest) -> Result<RatingAck, ApiError>;
}

#[async_trait]
impl<A: ListingApi + ?Sized> ListingApi for Arc<A> {
    async fn listings(&self, query: &ListingsQuery) -> Result<ListingsPage, ApiError> {
        (**self).listings(query).await
    }

    async fn listing(&self, id: &ListingId) -> Result<Listing, ApiError> {
        (**self).listing(id).await
    }

    async fn recommendations(
        &self,
        session: &SessionId,
        limit: u32,
    ) -> Result<RecommendationSet, ApiError> {
        (**self).recommendations(session, limit).await
    }

    async fn projection(&self, params: &ProjectionParams) -> Result<Projection, ApiError> {
        (**self).projection(params).await
    }

    async fn explainability(
        &self,
        session: &SessionId,
        ids: &[ListingId],
    ) -> Result<ExplanationSet, ApiError> {
        (**self).explainability(session, ids).await
    }

    async fn clusters(&self) -> Result<ClusterSet, ApiError> {
        (**self).clusters().await
    }

    async fn initial_sample(&self) -> Result<InitialSample, ApiError> {
        (**self).initial_sample().await
    }

    async fn submit_rating(&self, request: &RatingRequest) -> Result<RatingAck, ApiError> {
        (**self).submit_rating(request).await
    }
}
