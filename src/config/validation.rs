//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that patterns compile and a renderer can be selected
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::uri::Authority;
use axum::http::HeaderName;
use regex::Regex;
use thiserror::Error;

use crate::config::schema::{ProxyConfig, RenderConfig};
use crate::render::RenderTarget;

/// A single semantic problem in the configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("render.proxy is required")]
    MissingProxy,

    #[error("specified proxy is not a valid url: {url}: {reason}")]
    InvalidProxy { url: String, reason: String },

    #[error("render mechanism is not available for scheme '{scheme}', select it using the proxy option")]
    NoRenderer { scheme: String },

    #[error("unable to parse {field}: {source}")]
    InvalidPattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("unable to build render client: {0}")]
    HttpClient(String),

    #[error("invalid forwarded host header name: {0}")]
    InvalidHeaderName(String),

    #[error("render.timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("render.timeout_ms ({render_ms}) must be below timeouts.request_secs ({request_secs}s)")]
    RenderTimeoutExceedsRequest { render_ms: u64, request_secs: u64 },

    #[error("invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("invalid upstream address: {0}")]
    InvalidUpstream(String),
}

/// Validate the whole configuration, collecting every error.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Some(address) = &config.upstream.address {
        if Authority::from_str(address).is_err() {
            errors.push(ValidationError::InvalidUpstream(address.clone()));
        }
    }

    errors.extend(validate_render(&config.render));

    // The request timeout wraps the render call and would answer first.
    if config.render.timeout_ms >= config.timeouts.request_secs.saturating_mul(1000) {
        errors.push(ValidationError::RenderTimeoutExceedsRequest {
            render_ms: config.render.timeout_ms,
            request_secs: config.timeouts.request_secs,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate only the render section.
pub fn validate_render(config: &RenderConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.proxy.is_empty() {
        errors.push(ValidationError::MissingProxy);
    } else {
        match RenderTarget::parse(&config.proxy) {
            Ok(RenderTarget::InProcess) => errors.push(ValidationError::NoRenderer {
                scheme: RenderTarget::IN_PROCESS_SCHEME.to_string(),
            }),
            Ok(RenderTarget::Proxy(_)) => {}
            Err(e) => errors.push(e),
        }
    }

    if let Some(pattern) = &config.exclude_url_pattern {
        if let Err(source) = Regex::new(pattern) {
            errors.push(ValidationError::InvalidPattern {
                field: "exclude pattern",
                source,
            });
        }
    }

    if let Some(pattern) = &config.user_agent_pattern {
        if let Err(source) = Regex::new(pattern) {
            errors.push(ValidationError::InvalidPattern {
                field: "user agent pattern",
                source,
            });
        }
    }

    if HeaderName::from_bytes(config.forwarded_host_header.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeaderName(
            config.forwarded_host_header.clone(),
        ));
    }

    if config.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    errors
}
