/// Errors specific to the projection layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("stream error: {0}")]
    Stream(#[from] liveboard_stream::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
