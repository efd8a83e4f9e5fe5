use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("all {keys} API keys are rate limited")]
    RateLimited { keys: usize },

    #[error("failed to decode {service} response: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("no {0} configured")]
    NotConfigured(&'static str),
}

impl FetchError {
    /// Transport failures, overload and rate limiting are worth another try.
    /// Client errors and undecodable bodies are not.
    pub fn is_retriable(&self) -> bool {
        match self {
            FetchError::Transport { .. } | FetchError::RateLimited { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Decode { .. } | FetchError::NotConfigured(_) => false,
        }
    }
}
