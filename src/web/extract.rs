use axum::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::response::Response;
use tracing::debug;

use crate::web::error::not_found_page;

/// Record id taken from the route's `{id}` parameter. Anything that is not an
/// `i64` names no record, so it renders the not-found page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for RecordId
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| not_found_page())?;
        match raw.parse::<i64>() {
            Ok(id) => Ok(RecordId(id)),
            Err(e) => {
                debug!(id = %raw, error = %e, "Path id is not a record id");
                Err(not_found_page())
            }
        }
    }
}
