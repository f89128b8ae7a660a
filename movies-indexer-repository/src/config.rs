//! Configuration types for the OpenSearch client.

use std::time::Duration;

/// Connection settings for the search engine.
#[derive(Debug, Clone)]
pub struct OpenSearchConfig {
    /// Host name, optionally with an `http://` or `https://` scheme.
    pub host: String,
    pub port: u16,
    /// Timeout applied to every HTTP request.
    pub request_timeout: Duration,
}

impl Default for OpenSearchConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9200,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl OpenSearchConfig {
    /// Create a config for the given endpoint with the default timeout.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// The base URL of the cluster, e.g. `http://localhost:9200`.
    pub fn url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}:{}", host, self.port)
        } else {
            format!("http://{}:{}", host, self.port)
        }
    }
}
