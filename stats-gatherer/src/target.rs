use crate::error::{
    CollectError,
    Result,
};
use logstash_gatherer_config::{
    Category,
    Config,
    TlsConfig,
};
use percent_encoding::percent_decode_str;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_PREFIX: &str = "/_node/stats";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const MIN_TIMEOUT: Duration = Duration::from_secs(1);

/// One configured node with everything resolved that is needed to query it.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// The address as configured, possibly with credentials.
    pub address: String,
    /// `scheme://host[:port]` without credentials or path.
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: TlsConfig,
    pub timeout: Duration,
    pub api_prefix: String,
    pub categories: Vec<Category>,
}

impl Target {
    /// Credentials embedded in `address` take precedence over the configured
    /// username and password. Timeouts below one second fall back to five.
    pub fn resolve(address: &str, config: &Config) -> Result<Self> {
        let url = Url::parse(address).map_err(|e| CollectError::config(address, e))?;
        let host = url
            .host_str()
            .ok_or_else(|| CollectError::config(address, "address has no host"))?;
        let base_url = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };

        let (username, password) = if url.username().is_empty() {
            (
                config.username.clone().filter(|username| !username.is_empty()),
                config.password.clone(),
            )
        } else {
            let password = url
                .password()
                .map(|password| decode_userinfo(address, password))
                .transpose()?;
            (Some(decode_userinfo(address, url.username())?), password)
        };

        let timeout = match config.timeout {
            Some(timeout) if timeout >= MIN_TIMEOUT => timeout,
            _ => DEFAULT_TIMEOUT,
        };

        let api_prefix = match config.api_prefix.trim().trim_end_matches('/') {
            "" => DEFAULT_API_PREFIX.to_string(),
            prefix if prefix.starts_with('/') => prefix.to_string(),
            prefix => format!("/{prefix}"),
        };

        Ok(Self {
            address: address.to_string(),
            base_url,
            username,
            password,
            tls: config.tls.clone(),
            timeout,
            api_prefix,
            categories: config.selected_categories(),
        })
    }

    /// Path requesting every selected category at once.
    pub fn stats_path(&self) -> String {
        format!("{}/{}", self.api_prefix, Category::join(&self.categories))
    }
}

/// Userinfo stays percent-encoded in a parsed URL.
fn decode_userinfo(address: &str, raw: &str) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| CollectError::config(address, format!("credentials are not valid UTF-8: {e}")))
}
