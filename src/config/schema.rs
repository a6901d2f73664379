//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the render proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Origin server that receives every request not served by the renderer.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Crawler rendering settings.
    pub render: RenderConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Upstream (origin) configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Origin address (e.g., "127.0.0.1:3000"). Without one, non-rendered
    /// requests are answered with 404.
    pub address: Option<String>,
}

/// Timeout configuration for the host pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Which string the exclude pattern is tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExcludeMatch {
    /// Test the user-agent string. Compatible with existing deployments even
    /// though an extension pattern will rarely match a user agent.
    #[default]
    UserAgent,
    /// Test the request path.
    Path,
}

/// Crawler rendering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Render service base URL. The `chrome` scheme designates an in-process
    /// engine; every other scheme is treated as a remote render proxy.
    pub proxy: String,

    /// Regex for requests that must never be rendered. Defaults to common
    /// static file extensions.
    pub exclude_url_pattern: Option<String>,

    /// Regex selecting crawler user agents. Defaults to the built-in catalog.
    pub user_agent_pattern: Option<String>,

    /// Render deadline in milliseconds.
    pub timeout_ms: u64,

    /// Values of the forwarded-host header that may replace the request host.
    pub allowed_forwarded_hosts: Vec<String>,

    /// Header carrying the client-asserted host.
    pub forwarded_host_header: String,

    /// Subject of the exclude pattern.
    pub exclude_match: ExcludeMatch,

    /// Ask the render service to inject the shadow DOM polyfill.
    pub inject_shady_dom: bool,
}

/// The reference render service aborts after 10 seconds, give it a little more.
pub const DEFAULT_RENDER_TIMEOUT_MS: u64 = 11_000;

pub const DEFAULT_FORWARDED_HOST_HEADER: &str = "X-Forwarded-Host";

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            proxy: String::new(),
            exclude_url_pattern: None,
            user_agent_pattern: None,
            timeout_ms: DEFAULT_RENDER_TIMEOUT_MS,
            allowed_forwarded_hosts: Vec::new(),
            forwarded_host_header: DEFAULT_FORWARDED_HOST_HEADER.to_string(),
            exclude_match: ExcludeMatch::UserAgent,
            inject_shady_dom: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
