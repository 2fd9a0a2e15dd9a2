use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum AppError {
    /// Answered with a Basic credentials challenge for `realm`.
    #[error("Authorization required")]
    Unauthorized { realm: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        if let Some(app_error) = e.downcast_ref::<AppError>() {
            return app_error.clone();
        }
        AppError::InternalServerError(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            AppError::Unauthorized { realm } => {
                let mut response = (status, "Unauthorized").into_response();
                let challenge = format!("Basic realm=\"{}\"", realm.replace('"', "'"));
                if let Ok(value) = HeaderValue::from_str(&challenge) {
                    response
                        .headers_mut()
                        .insert(header::WWW_AUTHENTICATE, value);
                }
                response
            }
            AppError::BadRequest(_) => (status, "Bad Request").into_response(),
            // Details stay in the log, clients get a generic message.
            AppError::InternalServerError(_) => {
                (status, "Internal Server Error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_carries_single_challenge() {
        let response = AppError::Unauthorized {
            realm: "Staff \"only\"".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenges: Vec<_> = response
            .headers()
            .get_all(header::WWW_AUTHENTICATE)
            .iter()
            .collect();
        assert_eq!(challenges.len(), 1);
        assert_eq!(challenges[0], "Basic realm=\"Staff 'only'\"");
    }

    #[test]
    fn test_internal_error_has_no_challenge() {
        let error = AppError::InternalServerError("store down".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn test_bad_request_has_no_challenge() {
        let response = AppError::BadRequest("bad path".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }
}
