use crate::{
    error::{
        CollectError,
        Result,
    },
    model::StatusDocument,
    target::Target,
};
use logstash_gatherer_config::Config;
use reqwest::{
    Certificate,
    Identity,
    StatusCode,
};
use std::path::Path;
use tracing::{
    debug,
    instrument,
};

/// HTTP client bound to a single node.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    target: Target,
}

fn read_pem(address: &str, path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| CollectError::config(address, format!("cannot read {}: {e}", path.display())))
}

impl ApiClient {
    pub fn new(target: Target) -> Result<Self> {
        let address = target.address.as_str();
        let mut builder = reqwest::Client::builder()
            .timeout(target.timeout)
            .no_proxy()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));

        if let Some(ca) = &target.tls.ssl_ca {
            let certificate = Certificate::from_pem(&read_pem(address, ca)?)
                .map_err(|e| CollectError::config(address, format!("invalid CA certificate: {e}")))?;
            builder = builder.add_root_certificate(certificate);
        }

        match (&target.tls.ssl_cert, &target.tls.ssl_key) {
            (Some(cert), Some(key)) => {
                let mut pem = read_pem(address, cert)?;
                pem.push(b'\n');
                pem.extend(read_pem(address, key)?);
                let identity = Identity::from_pem(&pem)
                    .map_err(|e| CollectError::config(address, format!("invalid client certificate: {e}")))?;
                builder = builder.identity(identity);
            }
            (None, None) => {}
            _ => return Err(CollectError::config(address, "ssl_cert and ssl_key must be set together")),
        }

        if target.tls.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().map_err(|e| CollectError::config(address, e))?;
        Ok(Self { http, target })
    }

    pub fn from_config(address: &str, config: &Config) -> Result<Self> {
        Self::new(Target::resolve(address, config)?)
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Fetches the selected categories in a single request.
    pub async fn fetch_stats(&self) -> Result<StatusDocument> {
        self.fetch(&self.target.stats_path()).await
    }

    /// GETs `path` relative to the node's base URL and decodes the body.
    ///
    /// A single attempt is made. Non-200 responses are drained but not decoded.
    #[instrument(level = "debug", skip(self), fields(host = %self.target.base_url))]
    pub async fn fetch(&self, path: &str) -> Result<StatusDocument> {
        let endpoint = format!("{}{}", self.target.base_url, path);
        let mut request = self.http.get(&endpoint);
        if let Some(username) = &self.target.username {
            request = request.basic_auth(username, self.target.password.as_deref());
        }

        let response = request.send().await.map_err(|e| self.request_error(path, e))?;
        let status = response.status();
        debug!(%status, "Received response");

        if status != StatusCode::OK {
            if let Err(err) = response.bytes().await {
                debug!(%err, "Discarding response body failed");
            }
            return Err(CollectError::HttpStatus {
                host: self.target.base_url.clone(),
                endpoint: path.to_string(),
                code: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.request_error(path, e))?;
        serde_json::from_slice(&body).map_err(|source| CollectError::Decode {
            host: self.target.base_url.clone(),
            endpoint: path.to_string(),
            source,
        })
    }

    fn request_error(&self, path: &str, source: reqwest::Error) -> CollectError {
        let host = self.target.base_url.clone();
        let endpoint = path.to_string();
        if source.is_connect() || source.is_timeout() {
            CollectError::Network { host, endpoint, source }
        } else {
            CollectError::Transport { host, endpoint, source }
        }
    }
}
