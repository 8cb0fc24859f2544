use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::{debug, error, warn};

use crate::error::FyyurError;
use crate::web::templates::{NotFoundTemplate, ServerErrorTemplate};

impl IntoResponse for FyyurError {
    fn into_response(self) -> Response {
        match &self {
            FyyurError::NotFound { entity, id } => {
                debug!(entity, id, "Requested record does not exist");
                not_found_page()
            }
            FyyurError::Validation(errors) => {
                warn!(%errors, "Unhandled validation failure");
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()).into_response()
            }
            _ => {
                error!(error = %self, "Request failed");
                render_page(StatusCode::INTERNAL_SERVER_ERROR, &ServerErrorTemplate)
            }
        }
    }
}

pub fn not_found_page() -> Response {
    render_page(StatusCode::NOT_FOUND, &NotFoundTemplate)
}

/// Renders an error page, falling back to plain text if the template fails.
fn render_page<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render error page");
            (status, status.canonical_reason().unwrap_or("Error").to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            FyyurError::not_found("Venue", 9).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            FyyurError::database("disk I/O error").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            FyyurError::Validation(Default::default()).into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
