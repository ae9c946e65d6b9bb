use crate::api_error::ApiError;

/// Core error type for the inbox client.
///
/// Adapter crates map transport failures into [`ApiError`] at the boundary;
/// everything else ends up here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("api error: {0}")]
    Api(#[from] ApiError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
