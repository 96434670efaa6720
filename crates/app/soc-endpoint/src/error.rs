use thiserror::Error;

#[derive(Error, Debug)]
pub enum EndpointError {
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP client configuration error: {0}")]
    Client(#[source] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, EndpointError>;
