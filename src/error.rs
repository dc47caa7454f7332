use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;

/// HTTP-facing error: a status code plus a message safe to show to callers.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn not_initialized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub fn internal_error(err: impl fmt::Display) -> AppError {
    tracing::error!(error = %err, "internal error");
    AppError::internal("Internal server error")
}

pub fn map_db_error(err: sqlx::Error) -> AppError {
    let status = match &err {
        sqlx::Error::RowNotFound => StatusCode::NOT_FOUND,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") => StatusCode::CONFLICT,
            Some("23503") => StatusCode::BAD_REQUEST,
            Some("23502") => StatusCode::BAD_REQUEST,
            Some("22P02") => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    tracing::error!(error = %err, status = %status, "database error");

    let message = match status {
        StatusCode::NOT_FOUND => "Resource not found",
        StatusCode::CONFLICT => "Resource already exists",
        StatusCode::BAD_REQUEST => "Invalid request",
        _ => "Database error",
    };

    AppError::new(status, message)
}

/// The six error kinds from the pipeline's error-handling design: each one
/// carries its own recovery policy rather than being collapsed into a single
/// catch-all.
#[derive(Debug)]
pub enum PipelineError {
    /// HTTP/network failure talking to Model-Manager, the weather provider,
    /// or a DB timeout. Policy: log, skip the smallest affected unit.
    TransientExternal(String),
    /// Malformed provider JSON, a bad CSV row, an unparseable timestamp.
    DataParse(String),
    /// A model requested a feature the resolver cannot map.
    UnsupportedFeature(String),
    /// Opaque-model deserialization failed.
    ArtifactDecode(String),
    /// Internal contract violated (e.g. mismatched input lengths in a metric
    /// calculation). Not recoverable by the caller; surfaces as a 500.
    Invariant(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::TransientExternal(msg) => write!(f, "transient external error: {msg}"),
            PipelineError::DataParse(msg) => write!(f, "data parse error: {msg}"),
            PipelineError::UnsupportedFeature(msg) => write!(f, "unsupported feature: {msg}"),
            PipelineError::ArtifactDecode(msg) => write!(f, "artifact decode error: {msg}"),
            PipelineError::Invariant(msg) => write!(f, "invariant violated: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Invariant(msg) => internal_error(msg),
            PipelineError::UnsupportedFeature(msg) => AppError::bad_request(msg),
            PipelineError::DataParse(msg) => AppError::bad_request(msg),
            PipelineError::ArtifactDecode(msg) => internal_error(msg),
            PipelineError::TransientExternal(msg) => internal_error(msg),
        }
    }
}
