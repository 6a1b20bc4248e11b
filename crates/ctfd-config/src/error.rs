use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid trusted proxy pattern: {0}")]
    InvalidProxyPattern(#[from] regex::Error),
}
