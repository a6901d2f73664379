//! Render backend subsystem.
//!
//! # Data Flow
//! ```text
//! RenderConfig.proxy (at startup)
//!     → RenderTarget::parse (scheme selects the implementation)
//!     → select_renderer → Arc<dyn Renderer>
//!
//! Per request:
//!     RenderRequest (absolute URL + options) + deadline
//!     → Renderer::render
//!     → RenderResponse (status, headers, streaming body) or RenderError
//! ```
//!
//! # Design Decisions
//! - Implementation chosen once at startup, never per request
//! - Every call carries a deadline; timeouts are a distinct error variant
//! - No retries: one failed render is one failed request

pub mod proxy;
pub mod settings;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::time::Instant;
use url::Url;

use crate::config::validation::ValidationError;

pub use proxy::ProxyRenderer;
pub use settings::RenderSettings;

/// Optional capabilities requested from the render service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Inject the web components shadow DOM polyfill before rendering.
    pub inject_shady_dom: bool,
}

/// A single page to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Absolute URL (scheme, host, path and query).
    pub url: String,
    pub options: RenderOptions,
}

/// Rendered page as returned by the backend.
///
/// The body is streamed; dropping the response releases the connection.
#[derive(Debug)]
pub struct RenderResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

/// Errors that can occur while invoking a render backend.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The backend did not answer before the deadline.
    #[error("render timed out after {0:?}")]
    Timeout(Duration),

    /// Network or protocol failure talking to the backend.
    #[error("render request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The render endpoint could not be built for the target.
    #[error("unable to create render request: {0}")]
    InvalidTarget(String),
}

impl RenderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RenderError::Timeout(_))
    }
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        let status = if self.is_timeout() {
            StatusCode::GATEWAY_TIMEOUT
        } else {
            StatusCode::BAD_GATEWAY
        };
        status.into_response()
    }
}

/// A backend able to turn a URL into rendered HTML.
pub trait Renderer: Send + Sync + std::fmt::Debug {
    /// Render `request`, giving up once `deadline` is reached.
    fn render<'a>(
        &'a self,
        request: &'a RenderRequest,
        deadline: Instant,
    ) -> BoxFuture<'a, Result<RenderResponse, RenderError>>;
}

/// Render target selected by the scheme of the configured proxy URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    /// Embedded browser engine. Not shipped with this build.
    InProcess,
    /// Remote render service reached over HTTP.
    Proxy(Url),
}

impl RenderTarget {
    pub const IN_PROCESS_SCHEME: &'static str = "chrome";

    pub fn parse(proxy: &str) -> Result<Self, ValidationError> {
        let url = Url::parse(proxy).map_err(|e| ValidationError::InvalidProxy {
            url: proxy.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() == Self::IN_PROCESS_SCHEME {
            return Ok(RenderTarget::InProcess);
        }

        if url.cannot_be_a_base() {
            return Err(ValidationError::InvalidProxy {
                url: proxy.to_string(),
                reason: "url cannot be used as a base".to_string(),
            });
        }

        Ok(RenderTarget::Proxy(url))
    }
}

/// Build the renderer for the configured proxy target.
pub fn select_renderer(proxy: &str) -> Result<Arc<dyn Renderer>, ValidationError> {
    match RenderTarget::parse(proxy)? {
        RenderTarget::InProcess => Err(ValidationError::NoRenderer {
            scheme: RenderTarget::IN_PROCESS_SCHEME.to_string(),
        }),
        RenderTarget::Proxy(base) => Ok(Arc::new(ProxyRenderer::new(base)?)),
    }
}
