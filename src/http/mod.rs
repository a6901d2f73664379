//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request id, tracing)
//!     → middleware/render.rs (classify, render or pass through)
//!         → request.rs (scheme, host, original target)
//!         → response.rs (relay rendered status, headers, body)
//!     → server.rs forward_handler (origin) for everything else
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::InboundTls;
pub use server::HttpServer;
