use thiserror::Error;

/// Fatal errors raised while bringing the server up.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0:#}")]
    Config(#[from] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Initialization failed: {0}")]
    Initialization(String),
}
