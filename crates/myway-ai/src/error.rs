use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation unavailable")]
    Unavailable,
    #[error("generation timed out")]
    Timeout,
    #[error("failed to build http client: {0}")]
    HttpClientBuild(#[source] reqwest::Error),
    #[error("request to generation provider failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("generation provider returned {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("generation provider returned an unusable response: {0}")]
    InvalidResponse(String),
}

// Transport errors drop the request URL before they can reach a log line.
impl From<reqwest::Error> for GenerationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            GenerationError::Timeout
        } else {
            GenerationError::Request(error.without_url())
        }
    }
}
