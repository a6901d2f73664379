//! Crawler classification subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (User-Agent, path, forwarded host)
//!     → classifier.rs (bot pattern, exclude pattern)
//!     → host.rs (trusted forwarded host or request host)
//!     → Return: render decision + canonical host
//! ```
//!
//! # Design Decisions
//! - Pure functions of request metadata, no I/O
//! - Compiled at startup, shared read-only between requests

pub mod classifier;
pub mod host;

pub use classifier::Classifier;
pub use host::resolve_host;
