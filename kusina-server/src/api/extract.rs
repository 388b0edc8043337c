//! Extractors that reject with [`AppError`] instead of axum's plain-text bodies

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use http::request::Parts;

use crate::utils::AppError;
use crate::utils::error::{from_json_rejection, from_query_rejection};

/// JSON body
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(from_json_rejection)?;
        Ok(Self(value))
    }
}

/// Query string
pub struct AppQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(from_query_rejection)?;
        Ok(Self(value))
    }
}
