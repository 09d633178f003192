use crate::{buffer::BufferError, config::ConfigError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Window class registration, window creation, SDL init and the like.
    #[error("platform error: {0}")]
    Platform(String),
}

pub type Result<T> = std::result::Result<T, Error>;
