//! Crawler render middleware.
//!
//! Crawlers get the page from the render service, every other request
//! continues down the pipeline untouched.
//!
//! ```text
//! classify ──reject──▶ next.run(request)
//!    │
//!  accept
//!    ▼
//! resolve url ─▶ render (deadline) ──error──▶ 502 / 504
//!                    │
//!                    ▼
//!                  relay
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::{self, Next},
    response::Response,
    Router,
};

use crate::crawler::resolve_host;
use crate::http::request::{inbound_scheme, path_and_query, request_host, target_url};
use crate::http::response::relay;
use crate::observability::metrics;
use crate::render::{RenderError, RenderRequest, RenderSettings};

/// Install the render middleware in front of every route of `router`.
pub fn install(router: Router, settings: Arc<RenderSettings>) -> Router {
    router.layer(middleware::from_fn_with_state(settings, render_middleware))
}

pub async fn render_middleware(
    State(settings): State<Arc<RenderSettings>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, RenderError> {
    // obs-text bytes are legal in a User-Agent; decode lossily so the
    // readable part still matches.
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .map(|v| String::from_utf8_lossy(v.as_bytes()))
        .unwrap_or_default();

    if !settings
        .classifier
        .should_render(&user_agent, request.uri().path())
    {
        metrics::record_passthrough();
        drop(user_agent);
        return Ok(next.run(request).await);
    }

    let start_time = Instant::now();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let forwarded = request
        .headers()
        .get(&settings.forwarded_host_header)
        .map(|v| v.as_bytes());
    let host = resolve_host(
        request_host(&request),
        forwarded,
        &settings.allowed_forwarded_hosts,
    );
    let url = target_url(inbound_scheme(&request), host, path_and_query(&request));

    tracing::debug!(
        request_id = %request_id,
        user_agent = %user_agent,
        url = %url,
        "Rendering page for crawler"
    );

    let render_request = RenderRequest {
        url,
        options: settings.options,
    };
    let deadline = tokio::time::Instant::now() + settings.timeout;
    let outcome = tokio::time::timeout_at(
        deadline,
        settings.renderer.render(&render_request, deadline),
    )
    .await
    .unwrap_or_else(|_| Err(RenderError::Timeout(settings.timeout)));

    match outcome {
        Ok(rendered) => {
            tracing::debug!(
                request_id = %request_id,
                url = %render_request.url,
                status = %rendered.status,
                "Render service answered"
            );
            metrics::record_render(rendered.status.as_u16(), start_time);
            Ok(relay(rendered, render_request.url))
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                url = %render_request.url,
                error = %e,
                "unable to render page"
            );
            metrics::record_render_failure(e.is_timeout(), start_time);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExcludeMatch, RenderConfig};
    use crate::render::{RenderResponse, Renderer};
    use axum::http::{HeaderMap, HeaderValue, StatusCode};
    use futures_util::future::BoxFuture;
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Renderer that records every URL and answers with a fixed page.
    #[derive(Debug, Default)]
    struct FakeRenderer {
        calls: Mutex<Vec<RenderRequest>>,
        delay: Option<Duration>,
        fail: bool,
    }

    impl FakeRenderer {
        fn calls(&self) -> Vec<RenderRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Renderer for FakeRenderer {
        fn render<'a>(
            &'a self,
            request: &'a RenderRequest,
            _deadline: tokio::time::Instant,
        ) -> BoxFuture<'a, Result<RenderResponse, RenderError>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(request.clone());
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                if self.fail {
                    return Err(RenderError::InvalidTarget(request.url.clone()));
                }
                let mut headers = HeaderMap::new();
                headers.insert("content-type", HeaderValue::from_static("text/html"));
                headers.append("link", HeaderValue::from_static("</a.css>; rel=preload"));
                headers.append("link", HeaderValue::from_static("</b.js>; rel=preload"));
                Ok(RenderResponse {
                    status: StatusCode::OK,
                    headers,
                    body: Body::from("<html>ok</html>"),
                })
            })
        }
    }

    fn app(renderer: Arc<FakeRenderer>, config: RenderConfig) -> Router {
        let settings = RenderSettings::with_renderer(&config, renderer).unwrap();
        let router = Router::new().fallback(|| async { "origin" });
        install(router, Arc::new(settings))
    }

    fn request(user_agent: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("Host", "example.com")
            .header("User-Agent", user_agent)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_crawler_is_rendered() {
        let renderer = Arc::new(FakeRenderer::default());
        let app = app(renderer.clone(), RenderConfig::default());

        let response = app.oneshot(request("Slackbot", "/article?id=5")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/html");
        assert_eq!(response.headers().get_all("link").iter().count(), 2);
        assert_eq!(body_string(response).await, "<html>ok</html>");

        let calls = renderer.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "http://example.com/article?id=5");
        assert!(!calls[0].options.inject_shady_dom);
    }

    #[tokio::test]
    async fn test_browser_passes_through() {
        let renderer = Arc::new(FakeRenderer::default());
        let app = app(renderer.clone(), RenderConfig::default());

        let response = app
            .oneshot(request("Mozilla/5.0 (regular browser)", "/article"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "origin");
        assert!(renderer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_user_agent_passes_through() {
        let renderer = Arc::new(FakeRenderer::default());
        let app = app(renderer.clone(), RenderConfig::default());

        let req = Request::builder()
            .uri("/article")
            .header("Host", "example.com")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();

        assert_eq!(body_string(response).await, "origin");
        assert!(renderer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_static_path_depends_on_exclude_subject() {
        let by_user_agent = RenderConfig {
            user_agent_pattern: Some("Googlebot".to_string()),
            ..RenderConfig::default()
        };
        let renderer = Arc::new(FakeRenderer::default());
        let response = app(renderer.clone(), by_user_agent)
            .oneshot(request("Googlebot", "/logo.png"))
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "<html>ok</html>");
        assert_eq!(renderer.calls().len(), 1);

        let by_path = RenderConfig {
            user_agent_pattern: Some("Googlebot".to_string()),
            exclude_match: ExcludeMatch::Path,
            ..RenderConfig::default()
        };
        let renderer = Arc::new(FakeRenderer::default());
        let response = app(renderer.clone(), by_path)
            .oneshot(request("Googlebot", "/logo.png"))
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "origin");
        assert!(renderer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_trusted_forwarded_host() {
        let config = RenderConfig {
            allowed_forwarded_hosts: vec!["a.example".to_string(), "b.example".to_string()],
            inject_shady_dom: true,
            ..RenderConfig::default()
        };
        let renderer = Arc::new(FakeRenderer::default());
        let app = app(renderer.clone(), config);

        let mut trusted = request("Twitterbot", "/p");
        trusted
            .headers_mut()
            .insert("x-forwarded-host", HeaderValue::from_static("a.example"));
        app.clone().oneshot(trusted).await.unwrap();

        let mut untrusted = request("Twitterbot", "/p");
        untrusted
            .headers_mut()
            .insert("x-forwarded-host", HeaderValue::from_static("c.example"));
        app.oneshot(untrusted).await.unwrap();

        let calls = renderer.calls();
        assert_eq!(calls[0].url, "http://a.example/p");
        assert_eq!(calls[1].url, "http://example.com/p");
        assert!(calls[0].options.inject_shady_dom);
    }

    #[tokio::test]
    async fn test_custom_forwarded_host_header() {
        let config = RenderConfig {
            allowed_forwarded_hosts: vec!["www.example.com".to_string()],
            forwarded_host_header: "X-Original-Host".to_string(),
            ..RenderConfig::default()
        };
        let renderer = Arc::new(FakeRenderer::default());
        let app = app(renderer.clone(), config);

        let mut req = request("bingbot", "/");
        req.headers_mut()
            .insert("x-forwarded-host", HeaderValue::from_static("www.example.com"));
        req.headers_mut()
            .insert("x-original-host", HeaderValue::from_static("www.example.com"));
        app.oneshot(req).await.unwrap();

        assert_eq!(renderer.calls()[0].url, "http://www.example.com/");
    }

    #[tokio::test]
    async fn test_non_utf8_user_agent_is_rendered() {
        let renderer = Arc::new(FakeRenderer::default());
        let app = app(renderer.clone(), RenderConfig::default());

        let mut req = request("placeholder", "/article");
        req.headers_mut().insert(
            "user-agent",
            HeaderValue::from_bytes(b"Slackbot-LinkExpanding 1.0 \xe9").unwrap(),
        );
        let response = app.oneshot(req).await.unwrap();

        assert_eq!(body_string(response).await, "<html>ok</html>");
        assert_eq!(renderer.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_non_ascii_forwarded_host_is_trusted() {
        let config = RenderConfig {
            allowed_forwarded_hosts: vec!["bücher.example".to_string()],
            ..RenderConfig::default()
        };
        let renderer = Arc::new(FakeRenderer::default());
        let app = app(renderer.clone(), config);

        let mut req = request("Slackbot", "/p");
        req.headers_mut().insert(
            "x-forwarded-host",
            HeaderValue::from_bytes("bücher.example".as_bytes()).unwrap(),
        );
        app.oneshot(req).await.unwrap();

        assert_eq!(renderer.calls()[0].url, "http://bücher.example/p");
    }

    #[tokio::test]
    async fn test_tls_request_renders_https_url() {
        let renderer = Arc::new(FakeRenderer::default());
        let app = app(renderer.clone(), RenderConfig::default());

        let mut req = request("LinkedInBot", "/post");
        req.extensions_mut().insert(crate::http::request::InboundTls);
        app.oneshot(req).await.unwrap();

        assert_eq!(renderer.calls()[0].url, "https://example.com/post");
    }

    #[tokio::test]
    async fn test_render_failure_is_bad_gateway() {
        let renderer = Arc::new(FakeRenderer {
            fail: true,
            ..FakeRenderer::default()
        });
        let app = app(renderer.clone(), RenderConfig::default());

        let response = app.oneshot(request("Slackbot", "/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(renderer.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_slow_renderer_times_out() {
        let renderer = Arc::new(FakeRenderer {
            delay: Some(Duration::from_secs(30)),
            ..FakeRenderer::default()
        });
        let config = RenderConfig {
            timeout_ms: 100,
            ..RenderConfig::default()
        };
        let app = app(renderer, config);

        let started = Instant::now();
        let response = app.oneshot(request("Slackbot", "/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
