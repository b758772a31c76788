//! Configuration module
//!
//! Client configuration is owned by each client instance. Nothing here is
//! process-global: two clients in the same process may use different masters,
//! cache lifetimes and timeouts.

use std::env;
use std::time::Duration;

const DEFAULT_MASTER_URL: &str = "http://localhost:9333";
const CACHE_TTL_SECS: u64 = 60;
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    /// Master base URL, e.g. `http://localhost:9333`
    pub master_url: String,
    /// Optional filer base URL, e.g. `http://localhost:8888`
    pub filer_url: Option<String>,
    /// How long a volume lookup stays fresh in the location cache
    pub cache_ttl: Duration,
    /// Applied to every HTTP request
    pub request_timeout: Duration,
    /// Address volume servers by their public URL instead of the internal one
    pub prefer_public_url: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            master_url: DEFAULT_MASTER_URL.to_string(),
            filer_url: None,
            cache_ttl: Duration::from_secs(CACHE_TTL_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            prefer_public_url: false,
        }
    }
}

impl ClientConfig {
    pub fn new(master_url: impl Into<String>) -> Self {
        Self {
            master_url: master_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from the environment (and `.env` if present).
    ///
    /// Recognised variables: `WEED_MASTER_URL`, `WEED_FILER_URL`,
    /// `WEED_CACHE_TTL_SECS`, `WEED_REQUEST_TIMEOUT_SECS`, `WEED_PREFER_PUBLIC_URL`.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let master_url =
            env::var("WEED_MASTER_URL").unwrap_or_else(|_| DEFAULT_MASTER_URL.to_string());

        let filer_url = env::var("WEED_FILER_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let cache_ttl_secs = env::var("WEED_CACHE_TTL_SECS")
            .unwrap_or_else(|_| CACHE_TTL_SECS.to_string())
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("WEED_CACHE_TTL_SECS must be an integer: {}", e))?;

        let request_timeout_secs = env::var("WEED_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| REQUEST_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("WEED_REQUEST_TIMEOUT_SECS must be an integer: {}", e))?;

        let prefer_public_url = env::var("WEED_PREFER_PUBLIC_URL")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        let config = Self {
            master_url,
            filer_url,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
            prefer_public_url,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        validate_base_url("master_url", &self.master_url)?;
        if let Some(filer_url) = &self.filer_url {
            validate_base_url("filer_url", filer_url)?;
        }
        if self.request_timeout.is_zero() {
            return Err(anyhow::anyhow!("request_timeout must be greater than zero"));
        }
        Ok(())
    }

    pub fn with_filer_url(mut self, filer_url: impl Into<String>) -> Self {
        self.filer_url = Some(filer_url.into());
        self
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_prefer_public_url(mut self, prefer_public_url: bool) -> Self {
        self.prefer_public_url = prefer_public_url;
        self
    }

    /// Master URL without a trailing slash.
    pub fn master_base(&self) -> &str {
        self.master_url.trim_end_matches('/')
    }
}

fn validate_base_url(field: &str, url: &str) -> Result<(), anyhow::Error> {
    let url = url.trim();
    if url.is_empty() {
        return Err(anyhow::anyhow!("{} must not be empty", field));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(anyhow::anyhow!(
            "{} must start with http:// or https://, got {}",
            field,
            url
        ));
    }
    Ok(())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
