//! API server configuration

use serde::Deserialize;

/// HTTP API configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiConfig {
    /// Address to bind the HTTP server to (e.g. "0.0.0.0:8084")
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Requests taking longer than this are answered with 408 (in seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Entries per page for `GET /mailing`
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_listen_address() -> String {
    "0.0.0.0:8084".to_string()
}

const fn default_request_timeout() -> u64 {
    60
}

const fn default_page_size() -> usize {
    20
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            request_timeout_secs: default_request_timeout(),
            page_size: default_page_size(),
        }
    }
}
