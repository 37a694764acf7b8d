//! # CLI Module
//!
//! Command line of the `brrtresolver` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Serve the built-in echo service over HTTP:
//!
//! ```bash
//! brrtresolver serve --config brrtresolver.yaml --addr 127.0.0.1:8080
//! ```
//!
//! ### `token`
//!
//! Print a JWT signed with the configured secret:
//!
//! ```bash
//! brrtresolver token --config brrtresolver.yaml --user-id 7 --role 1 --role 2 --minutes 60
//! ```
//!
//! ### `routes`
//!
//! List the built-in routes in the order they are tried.

mod commands;


pub use commands::{build_resolver, builtin_services, route_table, run_cli, Cli, Commands};
