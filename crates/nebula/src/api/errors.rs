use core::error::Error;

use poem::http::StatusCode;

/// API errors
#[derive(Debug, derive_more::Display)]
pub enum ApiError {
    #[display("Graph not ready: no layout is running yet")]
    GraphNotReady,
    #[display("Node not found: {id}")]
    NodeNotFound { id: String },
    #[display("Server error: {message}")]
    ServerError { message: String },
}

impl Error for ApiError {}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::GraphNotReady => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NodeNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::ServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApiError> for poem::Error {
    fn from(err: ApiError) -> Self {
        let status = err.status();
        poem::Error::from_string(err.to_string(), status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_and_status() {
        let not_ready = ApiError::GraphNotReady;
        assert_eq!(
            not_ready.to_string(),
            "Graph not ready: no layout is running yet"
        );
        assert_eq!(not_ready.status(), StatusCode::SERVICE_UNAVAILABLE);

        let missing = ApiError::NodeNotFound { id: "ghost".into() };
        assert_eq!(missing.to_string(), "Node not found: ghost");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let server = ApiError::ServerError {
            message: "bind failed".into(),
        };
        assert_eq!(server.to_string(), "Server error: bind failed");
        assert_eq!(poem::Error::from(server).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
