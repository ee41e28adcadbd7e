use thiserror::Error;

pub type Result<T> = std::result::Result<T, WeheadError>;

#[derive(Error, Debug)]
pub enum WeheadError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Connection attempt timed out")]
    ConnectTimeout,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Configuration error: {0}")]
    Config(String),
}
