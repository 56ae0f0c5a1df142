//! Mapping store failures onto wire errors.

use actix_web::http::StatusCode;
use actix_web::HttpResponse;

use freon_db::DbError;
use freon_types::error::ErrorBody;
use freon_types::ErrorKind;

/// A handler failure, rendered as `{"message": "<kind token>"}` with a 5xx
/// status so clients can branch on the kind instead of scraping prose.
#[derive(Debug, thiserror::Error)]
#[error("{}", .0.wire_token())]
pub struct ApiError(pub ErrorKind);

impl ApiError {
    /// A failure of the server itself rather than the request.
    pub fn internal() -> Self {
        ApiError(ErrorKind::NetworkError)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        if let DbError::Sqlite(ref inner) = err {
            tracing::error!(error = %inner, "store failure");
        }
        ApiError(err.kind())
    }
}

impl From<ErrorKind> for ApiError {
    fn from(kind: ErrorKind) -> Self {
        ApiError(kind)
    }
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::from(self.0))
    }
}
