//! Remote render service client.
//!
//! Issues `GET {base}/render/{encoded url}` against a Rendertron compatible
//! service. The target URL is pushed as a single path segment so that its
//! `/`, `?` and `#` never leak into the outer request.

use std::time::Duration;

use axum::body::Body;
use futures_util::future::BoxFuture;
use tokio::time::Instant;
use url::Url;

use crate::config::validation::ValidationError;
use crate::render::{RenderError, RenderRequest, RenderResponse, Renderer};

const SHADY_DOM_QUERY: &str = "wc-inject-shadydom=true";

/// Renderer backed by an HTTP render service.
#[derive(Debug, Clone)]
pub struct ProxyRenderer {
    base: Url,
    client: reqwest::Client,
}

impl ProxyRenderer {
    /// Create a renderer for the given service base URL.
    ///
    /// The render service is reached directly, environment proxies are ignored.
    pub fn new(base: Url) -> Result<Self, ValidationError> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| ValidationError::HttpClient(e.to_string()))?;
        Ok(Self { base, client })
    }

    /// Build the outbound URL for a render request.
    pub fn endpoint(&self, request: &RenderRequest) -> Result<Url, RenderError> {
        let mut endpoint = self.base.clone();
        endpoint
            .path_segments_mut()
            .map_err(|_| RenderError::InvalidTarget(self.base.to_string()))?
            .pop_if_empty()
            .push("render")
            .push(&request.url);

        if request.options.inject_shady_dom {
            endpoint.set_query(Some(SHADY_DOM_QUERY));
        } else {
            endpoint.set_query(None);
        }
        Ok(endpoint)
    }
}

impl Renderer for ProxyRenderer {
    fn render<'a>(
        &'a self,
        request: &'a RenderRequest,
        deadline: Instant,
    ) -> BoxFuture<'a, Result<RenderResponse, RenderError>> {
        Box::pin(async move {
            let endpoint = self.endpoint(request)?;
            // The request timeout also bounds the streamed body.
            let budget = deadline.saturating_duration_since(Instant::now());

            tracing::debug!(endpoint = %endpoint, budget = ?budget, "Calling render service");

            let response = self
                .client
                .get(endpoint)
                .timeout(budget)
                .send()
                .await
                .map_err(|e| classify(e, budget))?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = Body::from_stream(response.bytes_stream());

            Ok(RenderResponse {
                status,
                headers,
                body,
            })
        })
    }
}

fn classify(error: reqwest::Error, budget: Duration) -> RenderError {
    if error.is_timeout() {
        RenderError::Timeout(budget)
    } else {
        RenderError::Transport(error)
    }
}
