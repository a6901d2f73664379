//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → tls.rs (optional TLS handshake via axum-server/rustls)
//!     → Hand off to HTTP layer, tagged with InboundTls when encrypted
//! ```

pub mod tls;
