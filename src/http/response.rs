//! Rendered response relay.
//!
//! # Responsibilities
//! - Copy the render service status and every header value
//! - Stream the rendered body to the client without buffering
//! - Log body failures and early client disconnects
//!
//! # Design Decisions
//! - Headers and status are sent before the body, so a failure while
//!   streaming cannot be turned into an error status anymore; the stream
//!   is aborted instead
//! - The render body is owned by the relay stream and dropped exactly once

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::{Body, BodyDataStream, Bytes};
use axum::response::Response;
use futures_util::Stream;

use crate::observability::metrics;
use crate::render::RenderResponse;

/// Turn a render backend response into the client response.
pub fn relay(rendered: RenderResponse, url: String) -> Response {
    let RenderResponse {
        status,
        headers,
        body,
    } = rendered;

    let stream = RelayStream {
        inner: body.into_data_stream(),
        url,
        started: Instant::now(),
        finished: false,
    };

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    for (name, value) in headers.iter() {
        response.headers_mut().append(name, value.clone());
    }
    response
}

/// Body stream that reports how the copy ended.
struct RelayStream {
    inner: BodyDataStream,
    url: String,
    started: Instant,
    finished: bool,
}

impl Stream for RelayStream {
    type Item = Result<Bytes, axum::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Err(e))) => {
                this.finished = true;
                tracing::error!(url = %this.url, error = %e, "error writing response to client");
                metrics::record_relay_failure();
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                tracing::debug!(url = %this.url, elapsed = ?this.started.elapsed(), "Rendered body sent");
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl Drop for RelayStream {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(url = %self.url, "Client went away before the rendered body was sent");
            metrics::record_relay_failure();
        }
    }
}
