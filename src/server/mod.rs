//! # Server Module
//!
//! Wire-level types and the HTTP transport.
//!
//! - [`Request`] - method, path, query/body parameters and headers of one request
//! - [`ResponseEnvelope`] / [`HttpResponse`] - what the resolver answers
//! - [`HttpServer`] - `tiny_http` front end feeding requests to a
//!   [`RouteResolver`](crate::resolver::RouteResolver)
//!
//! The resolver never touches the transport; tests drive it with [`Request`]
//! values built by hand.

mod http_server;
mod request;
mod response;

pub use http_server::{HttpServer, ServerHandle, DEFAULT_MAX_BODY_BYTES};
pub use request::{parse_form, HeaderVec, Request, MAX_INLINE_HEADERS};
pub use response::{HttpResponse, ResponseEnvelope, JSON_CONTENT_TYPE};
