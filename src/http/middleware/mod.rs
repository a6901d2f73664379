//! Request pipeline middleware.

pub mod render;

pub use render::{install, render_middleware};
