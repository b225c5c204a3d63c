//! HTTP transport layer.

pub mod dto;
pub mod http;

pub use http::build_router;
