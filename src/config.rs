use crate::error::{Result, WeheadError};
use secrecy::SecretBox;
use std::env;
use std::time::Duration;

/// Fixed Wehead messaging endpoint. The scheme is rewritten to wss/ws when
/// the socket is dialed.
pub const DEFAULT_BASE_URL: &str = "https://sio-experiment-2-ule2kkd6ca-wl.a.run.app";

/// Sub-path the endpoint expects the socket handshake on.
pub const DEFAULT_SOCKET_PATH: &str = "msg";

const TOKEN_ENV: &str = "WEHEAD_TOKEN";
const URL_ENV: &str = "WEHEAD_URL";
const SOCKET_PATH_ENV: &str = "WEHEAD_SOCKET_PATH";
const CONNECT_TIMEOUT_ENV: &str = "WEHEAD_CONNECT_TIMEOUT_SECS";

/// Connection settings for a single device handle.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub base_url: String,
    pub socket_path: String,
    /// Budget for the whole connect attempt, retries included.
    pub connect_timeout: Duration,
    /// Redial with a short backoff while the budget lasts.
    pub retry: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
            connect_timeout: Duration::from_secs(100),
            retry: true,
        }
    }
}

impl DeviceConfig {
    /// Defaults overridden by `WEHEAD_URL`, `WEHEAD_SOCKET_PATH` and
    /// `WEHEAD_CONNECT_TIMEOUT_SECS` where set.
    pub fn from_env() -> Self {
        // Load .env file if it exists (for development)
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        if let Ok(url) = env::var(URL_ENV) {
            config.base_url = url;
        }
        if let Ok(path) = env::var(SOCKET_PATH_ENV) {
            config.socket_path = path;
        }
        if let Ok(secs) = env::var(CONNECT_TIMEOUT_ENV) {
            match secs.parse::<u64>() {
                Ok(secs) => config.connect_timeout = Duration::from_secs(secs),
                Err(_) => log::warn!("Ignoring invalid {}: {}", CONNECT_TIMEOUT_ENV, secs),
            }
        }
        config
    }
}

/// Load the auth token from `WEHEAD_TOKEN` (a `.env` file works too).
pub fn load_token() -> Result<SecretBox<String>> {
    dotenvy::dotenv().ok();

    let token = env::var(TOKEN_ENV).map_err(|_| {
        log::error!("Missing required environment variable: {}", TOKEN_ENV);
        log::error!("Create a .env file in the project root with:");
        log::error!("{}=your_token_here", TOKEN_ENV);
        WeheadError::Config(format!("missing environment variable {}", TOKEN_ENV))
    })?;

    if token.trim().is_empty() {
        return Err(WeheadError::Config(format!(
            "{} is set but empty",
            TOKEN_ENV
        )));
    }

    Ok(SecretBox::new(Box::new(token)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_matches_device_endpoint() {
        let config = DeviceConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.socket_path, "msg");
        assert_eq!(config.connect_timeout, Duration::from_secs(100));
        assert!(config.retry);
    }

    #[test]
    #[serial]
    fn env_overrides_apply() {
        env::set_var(URL_ENV, "https://example.test");
        env::set_var(CONNECT_TIMEOUT_ENV, "5");
        let config = DeviceConfig::from_env();
        env::remove_var(URL_ENV);
        env::remove_var(CONNECT_TIMEOUT_ENV);

        assert_eq!(config.base_url, "https://example.test");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.socket_path, "msg");
    }

    #[test]
    #[serial]
    fn bad_timeout_value_falls_back_to_default() {
        env::set_var(CONNECT_TIMEOUT_ENV, "soon");
        let config = DeviceConfig::from_env();
        env::remove_var(CONNECT_TIMEOUT_ENV);

        assert_eq!(config.connect_timeout, Duration::from_secs(100));
    }

    #[test]
    #[serial]
    fn empty_token_is_rejected() {
        env::set_var(TOKEN_ENV, "   ");
        let result = load_token();
        env::remove_var(TOKEN_ENV);

        assert!(result.is_err());
    }
}
