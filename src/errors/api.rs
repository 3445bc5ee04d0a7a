use thiserror::Error;

/* Errors raised by the live price client. The portfolio never sees them directly:
the fetcher logs them and answers with a missing price (NaN). */
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("{0}")]
    ApiCallError(String),
    #[error("Rate limited by {0}")]
    RateLimited(String),
    #[error("Error during serde deserialisation: {0}")]
    DeserializationError(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.status().is_some_and(|status| status.as_u16() == 429) {
            return ApiError::RateLimited(e.url().map(|u| u.to_string()).unwrap_or_default());
        }
        if e.is_decode() {
            return ApiError::DeserializationError(e.to_string());
        }
        ApiError::ApiCallError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_request_error() {
        let e = reqwest::Client::new().get("not a url").build().unwrap_err();
        let error = ApiError::from(e);
        assert!(matches!(error, ApiError::ApiCallError(_)));
        assert!(!error.to_string().is_empty());
    }
}
