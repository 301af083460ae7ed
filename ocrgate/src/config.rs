use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn non_blank_env(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

/// Connection settings for the remote OCR service.
///
/// Read once at startup and shared behind an `Arc`; never mutated afterwards.
#[derive(Clone)]
pub struct RemoteConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub api_version: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub poll_interval_ms: u64,
    pub poll_timeout_secs: u64,
    /// Answer with a synthetic demo outcome when credentials are missing.
    pub demo_fallback: bool,
}

impl RemoteConfig {
    /// True when both endpoint and key are present and non-blank.
    pub fn is_configured(&self) -> bool {
        let filled = |value: &Option<String>| {
            value.as_deref().is_some_and(|v| !v.trim().is_empty())
        };
        filled(&self.endpoint) && filled(&self.api_key)
    }

    /// The key reduced to `***` plus its last four characters, for logs.
    pub fn masked_key(&self) -> String {
        match self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            Some(key) => {
                let tail: String = key
                    .chars()
                    .rev()
                    .take(4)
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect();
                format!("***{tail}")
            }
            None => "(none)".to_string(),
        }
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.masked_key())
            .field("api_version", &self.api_version)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("demo_fallback", &self.demo_fallback)
            .finish()
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: non_blank_env("AZURE_VISION_ENDPOINT"),
            api_key: non_blank_env("AZURE_VISION_KEY"),
            api_version: env::var("AZURE_VISION_API_VERSION")
                .unwrap_or_else(|_| "v3.2".to_string()),
            connect_timeout_secs: parse_env_or("AZURE_VISION_CONNECT_TIMEOUT_SECS", 10),
            request_timeout_secs: parse_env_or("AZURE_VISION_REQUEST_TIMEOUT_SECS", 30),
            max_retries: parse_env_or("AZURE_VISION_MAX_RETRIES", 3),
            retry_backoff_ms: parse_env_or("AZURE_VISION_RETRY_BACKOFF_MILLIS", 500),
            poll_interval_ms: parse_env_or("AZURE_VISION_POLL_INTERVAL_MILLIS", 1000),
            poll_timeout_secs: parse_env_or("AZURE_VISION_POLL_TIMEOUT_SECS", 30),
            demo_fallback: parse_env_or("OCR_DEMO_FALLBACK", true),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("OCRGATE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("OCRGATE_PORT", 8080),
                max_upload_bytes: parse_env_or("OCR_MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            },
            remote: RemoteConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
