use axum::extract::{FromRequestParts, Path, rejection::PathRejection};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::files::FileError;

/// A `Path<T>` wrapper for file routes. A path that fails to parse gets the
/// same structured not-found response as a lookup that matched nothing.
pub struct AppPath<T>(pub T);

impl<S, T> FromRequestParts<S> for AppPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e: PathRejection| {
                tracing::debug!(error = %e.body_text(), "Rejected file path");
                AppError::from(FileError::NotFound)
            })?;
        Ok(AppPath(value))
    }
}
