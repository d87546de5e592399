//! Axum extractor that deserialises JSON request bodies

use crate::error::StudentPerfError;

use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Json},
    http::Request,
};
use serde::de::DeserializeOwned;

/// An axum extractor based on the Json extractor whose rejections are rendered as a
/// [StudentPerfError], so malformed bodies get the same `{"error": ...}` shape as every other
/// failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPayload<T>(pub T);

#[async_trait]
impl<T, S, B> FromRequest<S, B> for JsonPayload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    Json<T>: FromRequest<S, B, Rejection = JsonRejection>,
    B: Send + 'static,
{
    type Rejection = StudentPerfError;

    /// Extract a `JsonPayload` from a `Request`.
    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonPayload(value))
    }
}
