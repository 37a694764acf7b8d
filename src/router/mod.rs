//! # Router Module
//!
//! Route declarations and the match predicate used by the resolver.
//!
//! ## Overview
//!
//! Every handler is declared with exactly one [`RouteDescriptor`]: an HTTP verb
//! and an exact path. There is no pattern syntax. A request matches when its
//! verb equals the declared verb's canonical string and its path equals the
//! declared path byte for byte:
//!
//! - case-sensitive
//! - no trailing-slash normalization (`/user` and `/user/` are different routes)
//! - no `{param}` segments or wildcards
//!
//! ```rust
//! use brrtresolver::router::{HttpMethod, RouteDescriptor};
//!
//! let route = RouteDescriptor::get("/user");
//! assert!(route.matches("GET", "/user"));
//! assert!(!route.matches("POST", "/user"));
//! assert!(!route.matches("GET", "/user/"));
//! assert_eq!(route.method(), HttpMethod::Get);
//! ```
//!
//! Ordering between several matching routes is not the router's concern: the
//! resolver walks handlers in registration order and the first match wins.

mod core;
#[cfg(test)]
mod tests;

pub use core::{HttpMethod, RouteDescriptor, UnsupportedMethod};
