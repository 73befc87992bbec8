use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("terminal error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The drawing surface is unusable, e.g. a terminal with no rows.
    #[error("surface unavailable: {0}")]
    Surface(String),
}

pub type AppResult<T> = Result<T, AppError>;
