/// Errors specific to the streaming layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("auth token must not be empty")]
    MissingToken,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
