//! # Service Registry
//!
//! Services are the handler-bearing objects the resolver searches. Each one
//! declares its handlers with a [`HandlerSpec`] per method, in the order they
//! should be tried, and executes them by name in [`Service::call`].
//!
//! The resolver never builds services. It asks a [`ServiceRegistry`] for the
//! ordered list of candidate identifiers and resolves each one; a candidate that
//! is declared but has no instance is skipped.
//!
//! ```rust
//! use brrtresolver::binder::{ParamType, ParameterSpec};
//! use brrtresolver::error::DispatchError;
//! use brrtresolver::registry::{HandlerSpec, Service, ServiceContainer};
//! use brrtresolver::resolver::HandlerArgs;
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! struct UserService;
//!
//! impl Service for UserService {
//!     fn handlers(&self) -> Vec<HandlerSpec> {
//!         vec![HandlerSpec::get("get_user", "/user")
//!             .param(ParameterSpec::new("id", ParamType::Int))]
//!     }
//!
//!     fn call(&self, handler: &str, args: HandlerArgs) -> Result<Value, DispatchError> {
//!         match handler {
//!             "get_user" => Ok(json!({ "id": args.int("id")? })),
//!             other => Err(DispatchError::Internal(anyhow::anyhow!("unknown handler {other}"))),
//!         }
//!     }
//! }
//!
//! let container = ServiceContainer::new().with_service("users", Arc::new(UserService));
//! assert_eq!(container.len(), 1);
//! ```

use crate::binder::ParameterSpec;
use crate::error::DispatchError;
use crate::mapper::ResultMapper;
use crate::resolver::HandlerArgs;
use crate::router::{HttpMethod, RouteDescriptor};
use crate::security::AuthRequirement;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Declaration of one handler method of a service.
#[derive(Debug, Clone)]
pub struct HandlerSpec {
    /// Method identity passed back to [`Service::call`].
    pub name: String,
    /// Verb + exact path.
    pub route: RouteDescriptor,
    /// Roles required, if the handler is guarded.
    pub auth: Option<AuthRequirement>,
    /// Projection applied to the result, if any.
    pub mapper: Option<ResultMapper>,
    /// Parameters in declared order.
    pub params: Vec<ParameterSpec>,
}

impl HandlerSpec {
    /// Handler `name` served at `route`.
    pub fn new(name: impl Into<String>, route: RouteDescriptor) -> Self {
        Self {
            name: name.into(),
            route,
            auth: None,
            mapper: None,
            params: Vec::new(),
        }
    }

    /// Handler `name` served at `GET path`.
    pub fn get(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, RouteDescriptor::new(HttpMethod::Get, path))
    }

    /// Handler `name` served at `POST path`.
    pub fn post(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, RouteDescriptor::new(HttpMethod::Post, path))
    }

    /// Append a parameter.
    #[must_use]
    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Guard the handler.
    #[must_use]
    pub fn authenticated(mut self, requirement: AuthRequirement) -> Self {
        self.auth = Some(requirement);
        self
    }

    /// Project the handler's result.
    #[must_use]
    pub fn map(mut self, mapper: ResultMapper) -> Self {
        self.mapper = Some(mapper);
        self
    }
}

/// A handler-bearing service.
///
/// Must be safe for concurrent read-only use; instances live for the whole
/// process.
pub trait Service: Send + Sync {
    /// Handler declarations, in the order they are tried.
    fn handlers(&self) -> Vec<HandlerSpec>;

    /// Run handler `handler` with bound arguments.
    fn call(&self, handler: &str, args: HandlerArgs) -> Result<Value, DispatchError>;
}

/// Registry lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Identifier is a candidate but no instance is registered for it.
    #[error("service '{0}' is not registered")]
    NotRegistered(String),
}

/// Source of candidate services.
pub trait ServiceRegistry: Send + Sync {
    /// Candidate service identifiers, in resolution order.
    fn candidates(&self) -> Vec<String>;

    /// Singleton instance for `id`.
    fn resolve(&self, id: &str) -> Result<Arc<dyn Service>, RegistryError>;
}

/// Registration-ordered [`ServiceRegistry`].
///
/// Candidates are tried in the order they were first declared or registered.
#[derive(Clone, Default)]
pub struct ServiceContainer {
    candidates: Vec<String>,
    services: HashMap<String, Arc<dyn Service>>,
}

impl ServiceContainer {
    /// Empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` as a candidate without an instance.
    pub fn declare(&mut self, id: impl Into<String>) {
        let id = id.into();
        if !self.candidates.contains(&id) {
            self.candidates.push(id);
        }
    }

    /// Register the instance for `id`, declaring it if needed.
    ///
    /// Re-registering keeps the original position and replaces the instance.
    pub fn register(&mut self, id: impl Into<String>, service: Arc<dyn Service>) {
        let id = id.into();
        self.declare(id.clone());
        if self.services.insert(id.clone(), service).is_some() {
            warn!(service = %id, "Replaced existing service instance");
        } else {
            info!(
                service = %id,
                total_services = self.services.len(),
                "Service registered"
            );
        }
    }

    /// Builder variant of [`register`](Self::register).
    #[must_use]
    pub fn with_service(mut self, id: impl Into<String>, service: Arc<dyn Service>) -> Self {
        self.register(id, service);
        self
    }

    /// Number of registered instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// `true` if no instance is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceRegistry for ServiceContainer {
    fn candidates(&self) -> Vec<String> {
        self.candidates.clone()
    }

    fn resolve(&self, id: &str) -> Result<Arc<dyn Service>, RegistryError> {
        self.services
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotRegistered(id.to_string()))
    }
}
