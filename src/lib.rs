//! Crawler render proxy library.

pub mod config;
pub mod crawler;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod render;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use render::{RenderSettings, Renderer};
