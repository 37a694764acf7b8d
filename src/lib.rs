//! # brrtresolver
//!
//! **brrtresolver** is a small HTTP request resolver: given a request's verb
//! and path it finds the registered handler, gates it on the caller's roles,
//! coerces the raw query or body parameters into the handler's declared types,
//! invokes it, optionally projects the result, and answers with a uniform JSON
//! envelope.
//!
//! ## Architecture
//!
//! - **[`router`]** - `HttpMethod` and exact-match `RouteDescriptor`
//! - **[`security`]** - `AuthRequirement`, the `Authenticator` trait and the HS512 JWT authenticator
//! - **[`binder`]** - parameter declarations and the coercion matrix
//! - **[`mapper`]** - `ResultMapper` projections and `#[derive(MapTarget)]`
//! - **[`registry`]** - services, their handler declarations and the ordered `ServiceContainer`
//! - **[`resolver`]** - the `RouteResolver` pipeline and error translation
//! - **[`server`]** - `Request` parsing, the response envelope and a `tiny_http` transport
//! - **[`config`]**, **[`logging`]**, **[`cli`]** - process plumbing for the `brrtresolver` binary
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as server::HttpServer
//!     participant Resolver as resolver::RouteResolver
//!     participant Registry as registry::ServiceRegistry
//!     participant Auth as security::Authenticator
//!     participant Binder as binder
//!     participant Service
//!
//!     Client->>Server: GET /user?id=7
//!     Server->>Resolver: resolve(Request)
//!     Resolver->>Registry: candidates() / resolve(id)
//!     Registry-->>Resolver: first handler matching GET /user
//!     Resolver->>Auth: require_auth(roles)
//!     Auth-->>Resolver: Identity | AuthError (401)
//!     Resolver->>Binder: bind_parameters(specs, query)
//!     Binder-->>Resolver: typed args | MalformedRequest (400)
//!     Resolver->>Service: call(handler, args)
//!     Service-->>Resolver: Value | ServiceError (200 + codes)
//!     Resolver-->>Server: {"errors": [], "response": ...}
//!     Server-->>Client: 200 application/json
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtresolver::binder::{ParamType, ParameterSpec};
//! use brrtresolver::error::{DispatchError, ServiceError};
//! use brrtresolver::registry::{HandlerSpec, Service, ServiceContainer};
//! use brrtresolver::resolver::{HandlerArgs, RouteResolver};
//! use brrtresolver::server::Request;
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! struct Orders;
//!
//! impl Service for Orders {
//!     fn handlers(&self) -> Vec<HandlerSpec> {
//!         vec![HandlerSpec::post("place", "/orders")
//!             .param(ParameterSpec::new("qty", ParamType::Int))]
//!     }
//!
//!     fn call(&self, _handler: &str, args: HandlerArgs) -> Result<Value, DispatchError> {
//!         match args.int("qty")? {
//!             qty if qty > 100 => Err(ServiceError::with_codes([1001, 1002]).into()),
//!             qty => Ok(json!({ "qty": qty })),
//!         }
//!     }
//! }
//!
//! let resolver = RouteResolver::new(ServiceContainer::new().with_service("orders", Arc::new(Orders)));
//!
//! let res = resolver.resolve(&Request::post("/orders").with_body("qty", "500"));
//! assert_eq!(res.status, 200);
//! assert_eq!(res.body, json!({"errors": [1001, 1002], "response": null}));
//!
//! let res = resolver.resolve(&Request::get("/does-not-exist"));
//! assert_eq!(res.status, 404);
//! ```
//!
//! ## Runtime Considerations
//!
//! Resolution is synchronous and keeps all per-request state on the stack.
//! The registry and the authenticator are shared read-only, so one
//! `RouteResolver` can be used from many threads. No timeouts are applied to
//! handlers; bound latency at the transport if needed.

// `#[derive(MapTarget)]` expands to `::brrtresolver::...` paths.
extern crate self as brrtresolver;

pub mod binder;
pub mod cli;
pub mod config;
pub mod echo;
pub mod error;
pub mod ids;
pub mod logging;
pub mod mapper;
pub mod registry;
pub mod resolver;
pub mod router;
pub mod security;
pub mod server;

pub use error::{AsCode, DispatchError, ServiceError};
pub use registry::{HandlerSpec, Service, ServiceContainer, ServiceRegistry};
pub use resolver::{HandlerArgs, RouteResolver};
pub use server::{HttpResponse, Request, ResponseEnvelope};
