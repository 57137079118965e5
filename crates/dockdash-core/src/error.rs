use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid container descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
