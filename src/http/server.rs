//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the render middleware in front of the origin
//! - Wire up middleware (tracing, timeout, request ID)
//! - Forward everything the renderer does not take to the upstream origin
//! - Serve plain TCP or TLS with graceful shutdown

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::uri::{Authority, PathAndQuery, Scheme},
    http::{Request, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
    Extension, Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::validation::ValidationError;
use crate::config::ProxyConfig;
use crate::http::middleware::render;
use crate::http::request::InboundTls;
use crate::net::tls::load_tls_config;
use crate::render::RenderSettings;

/// Application state injected into the origin handler.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Option<Authority>,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server hosting the render layer.
pub struct HttpServer {
    config: ProxyConfig,
    settings: Arc<RenderSettings>,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails if the render layer cannot be activated.
    pub fn new(config: ProxyConfig) -> Result<Self, ValidationError> {
        let settings = RenderSettings::from_config(&config.render)?;
        Self::with_settings(config, settings)
    }

    /// Create a server around already compiled render settings.
    pub fn with_settings(
        config: ProxyConfig,
        settings: RenderSettings,
    ) -> Result<Self, ValidationError> {
        let upstream = config
            .upstream
            .address
            .as_deref()
            .map(|addr| {
                Authority::from_str(addr)
                    .map_err(|_| ValidationError::InvalidUpstream(addr.to_string()))
            })
            .transpose()?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            config,
            settings: Arc::new(settings),
            state: AppState { upstream, client },
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(&self, tls: bool) -> Router {
        let origin = Router::new()
            .fallback(forward_handler)
            .with_state(self.state.clone());

        let router = render::install(origin, self.settings.clone())
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        if tls {
            router.layer(Extension(InboundTls))
        } else {
            router
        }
    }

    /// Run the server, accepting connections on the given listener until
    /// shutdown is signalled.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;

        match self.config.listener.tls.clone() {
            Some(tls) => {
                let tls_config = load_tls_config(&tls).await?;
                let app = self.build_router(true).into_make_service();

                tracing::info!(address = %addr, "HTTPS server starting");

                let handle = axum_server::Handle::new();
                let shutdown_handle = handle.clone();
                tokio::spawn(async move {
                    let _ = shutdown.recv().await;
                    shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
                });

                axum_server::from_tcp_rustls(listener.into_std()?, tls_config)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
            None => {
                let app = self.build_router(false);

                tracing::info!(address = %addr, "HTTP server starting");

                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                    })
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Origin handler: forwards the request unchanged to the upstream.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let Some(authority) = state.upstream.clone() else {
        return (StatusCode::NOT_FOUND, "No upstream configured").into_response();
    };

    let (mut parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(authority);
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Unable to build upstream uri");
            return (StatusCode::BAD_REQUEST, "Invalid request uri").into_response();
        }
    };
    parts.version = Version::HTTP_11;

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
