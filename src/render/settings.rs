//! Compiled render layer settings.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderName;

use crate::config::validation::ValidationError;
use crate::config::RenderConfig;
use crate::crawler::Classifier;
use crate::render::{select_renderer, RenderOptions, Renderer};

/// Everything a request needs to decide and render, built once at startup.
///
/// Read-only after construction and shared between requests through `Arc`.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub classifier: Classifier,
    pub renderer: Arc<dyn Renderer>,
    pub timeout: Duration,
    pub allowed_forwarded_hosts: Vec<String>,
    pub forwarded_host_header: HeaderName,
    pub options: RenderOptions,
}

impl RenderSettings {
    /// Compile patterns and select the renderer for `config`.
    ///
    /// Fails closed: any error means the render layer must not be installed.
    pub fn from_config(config: &RenderConfig) -> Result<Self, ValidationError> {
        let renderer = select_renderer(&config.proxy)?;
        Self::with_renderer(config, renderer)
    }

    /// Same as [`RenderSettings::from_config`] with an explicit renderer.
    pub fn with_renderer(
        config: &RenderConfig,
        renderer: Arc<dyn Renderer>,
    ) -> Result<Self, ValidationError> {
        let classifier = Classifier::new(
            config.user_agent_pattern.as_deref(),
            config.exclude_url_pattern.as_deref(),
            config.exclude_match,
        )?;

        let forwarded_host_header = HeaderName::from_bytes(config.forwarded_host_header.as_bytes())
            .map_err(|_| ValidationError::InvalidHeaderName(config.forwarded_host_header.clone()))?;

        if config.timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout);
        }

        Ok(Self {
            classifier,
            renderer,
            timeout: Duration::from_millis(config.timeout_ms),
            allowed_forwarded_hosts: config.allowed_forwarded_hosts.clone(),
            forwarded_host_header,
            options: RenderOptions {
                inject_shady_dom: config.inject_shady_dom,
            },
        })
    }
}
