//! Resolver core module - match, authorize, bind, invoke, map.

use crate::binder::{bind_parameters, ParamType, ParamValue, MAX_INLINE_PARAMS};
use crate::error::DispatchError;
use crate::ids::RequestId;
use crate::registry::{HandlerSpec, Service, ServiceRegistry};
use crate::router::HttpMethod;
use crate::security::{AuthRequirement, Authenticator, Identity};
use crate::server::{HttpResponse, Request, ResponseEnvelope};
use anyhow::anyhow;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, info_span};

/// Bound arguments in declared order.
pub type BoundArgs = SmallVec<[(String, ParamValue); MAX_INLINE_PARAMS]>;

/// Arguments handed to [`Service::call`].
///
/// Holds the coerced parameters in declared order and, when the caller is
/// logged in, their [`Identity`]. The typed accessors fail with
/// [`DispatchError::Internal`]: a handler asking for an argument it did not
/// declare, or with another type, is a programming error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerArgs {
    values: BoundArgs,
    identity: Option<Identity>,
}

impl HandlerArgs {
    /// Arguments from bound values and an optional caller identity.
    #[must_use]
    pub fn new(values: BoundArgs, identity: Option<Identity>) -> Self {
        Self { values, identity }
    }

    /// Raw bound value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// All bound values, in declared order.
    #[must_use]
    pub fn values(&self) -> &[(String, ParamValue)] {
        &self.values
    }

    /// Authenticated caller, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        ty: ParamType,
        extract: impl FnOnce(&'a ParamValue) -> Option<T>,
    ) -> Result<Option<T>, DispatchError> {
        let value = self
            .get(name)
            .ok_or_else(|| DispatchError::Internal(anyhow!("argument '{name}' is not declared")))?;
        if value.is_null() {
            return Ok(None);
        }
        extract(value)
            .map(Some)
            .ok_or_else(|| DispatchError::Internal(anyhow!("argument '{name}' is not {ty}")))
    }

    fn required<T>(name: &str, value: Option<T>) -> Result<T, DispatchError> {
        value.ok_or_else(|| DispatchError::Internal(anyhow!("argument '{name}' is null")))
    }

    /// Integer argument.
    pub fn int(&self, name: &str) -> Result<i64, DispatchError> {
        Self::required(name, self.opt_int(name)?)
    }

    /// Nullable integer argument.
    pub fn opt_int(&self, name: &str) -> Result<Option<i64>, DispatchError> {
        self.typed(name, ParamType::Int, ParamValue::as_i64)
    }

    /// Float argument.
    pub fn float(&self, name: &str) -> Result<f64, DispatchError> {
        Self::required(name, self.opt_float(name)?)
    }

    /// Nullable float argument.
    pub fn opt_float(&self, name: &str) -> Result<Option<f64>, DispatchError> {
        self.typed(name, ParamType::Float, ParamValue::as_f64)
    }

    /// Boolean argument.
    pub fn bool(&self, name: &str) -> Result<bool, DispatchError> {
        Self::required(name, self.opt_bool(name)?)
    }

    /// Nullable boolean argument.
    pub fn opt_bool(&self, name: &str) -> Result<Option<bool>, DispatchError> {
        self.typed(name, ParamType::Bool, ParamValue::as_bool)
    }

    /// String argument.
    pub fn str(&self, name: &str) -> Result<&str, DispatchError> {
        Self::required(name, self.opt_str(name)?)
    }

    /// Nullable string argument.
    pub fn opt_str(&self, name: &str) -> Result<Option<&str>, DispatchError> {
        self.typed(name, ParamType::String, ParamValue::as_str)
    }

    /// Array argument.
    pub fn array(&self, name: &str) -> Result<&[ParamValue], DispatchError> {
        Self::required(name, self.opt_array(name)?)
    }

    /// Nullable array argument.
    pub fn opt_array(&self, name: &str) -> Result<Option<&[ParamValue]>, DispatchError> {
        self.typed(name, ParamType::Array, ParamValue::as_array)
    }
}

/// Serialize a handler result into the envelope payload.
pub fn respond<T: Serialize>(value: &T) -> Result<Value, DispatchError> {
    serde_json::to_value(value)
        .map_err(|e| DispatchError::Internal(anyhow::Error::new(e).context("serializing handler result")))
}

/// Matched handler, built per resolution and discarded afterwards.
#[derive(Clone)]
pub struct HandlerDescriptor {
    /// Registry identifier of the owning service.
    pub service_id: String,
    /// Owning service instance.
    pub service: Arc<dyn Service>,
    /// Route, auth, mapping and parameter declarations.
    pub spec: HandlerSpec,
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("service_id", &self.service_id)
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Route resolution and dispatch pipeline.
///
/// Shared collaborators (registry, authenticator) are only read; one resolver
/// can serve any number of requests, each resolution keeps its state on the
/// stack.
pub struct RouteResolver {
    registry: Arc<dyn ServiceRegistry>,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl RouteResolver {
    /// Resolver over `registry`, without an authenticator.
    pub fn new(registry: impl ServiceRegistry + 'static) -> Self {
        Self {
            registry: Arc::new(registry),
            authenticator: None,
        }
    }

    /// Authenticator consulted for guarded handlers.
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Every declared handler, in resolution order.
    ///
    /// Unregistered candidates are left out.
    #[must_use]
    pub fn routes(&self) -> Vec<(String, HandlerSpec)> {
        self.registry
            .candidates()
            .into_iter()
            .filter_map(|id| self.registry.resolve(&id).ok().map(|svc| (id, svc)))
            .flat_map(|(id, svc)| {
                svc.handlers()
                    .into_iter()
                    .map(move |spec| (id.clone(), spec))
            })
            .collect()
    }

    /// First handler whose route matches, services and handlers taken in
    /// enumeration order.
    #[must_use]
    pub fn find_handler(&self, method: &str, path: &str) -> Option<HandlerDescriptor> {
        for service_id in self.registry.candidates() {
            let service = match self.registry.resolve(&service_id) {
                Ok(service) => service,
                Err(e) => {
                    debug!(service = %service_id, error = %e, "Skipping unregistered service");
                    continue;
                }
            };
            if let Some(spec) = service
                .handlers()
                .into_iter()
                .find(|h| h.route.matches(method, path))
            {
                debug!(
                    service = %service_id,
                    handler_name = %spec.name,
                    route = %spec.route,
                    "Route matched"
                );
                return Some(HandlerDescriptor {
                    service_id,
                    service,
                    spec,
                });
            }
        }
        None
    }

    /// Run the pipeline and return the (possibly projected) handler result.
    ///
    /// # Errors
    ///
    /// Any [`DispatchError`]; the handler runs only once routing, auth and
    /// binding have succeeded.
    pub fn dispatch(&self, req: &Request) -> Result<Value, DispatchError> {
        let HandlerDescriptor {
            service_id,
            service,
            spec,
        } = self
            .find_handler(&req.method, &req.path)
            .ok_or_else(|| DispatchError::NotFound {
                method: req.method.clone(),
                path: req.path.clone(),
            })?;

        let identity = match &spec.auth {
            Some(requirement) => Some(self.authorize(req, &spec, requirement)?),
            None => self
                .authenticator
                .as_ref()
                .and_then(|a| a.identify(&req.security())),
        };

        let source = match spec.route.method() {
            HttpMethod::Get => &req.query,
            HttpMethod::Post => req.body_params()?,
        };
        let args = HandlerArgs::new(bind_parameters(&spec.params, source)?, identity);

        let execution_start = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| service.call(&spec.name, args)));
        info!(
            service = %service_id,
            handler_name = %spec.name,
            execution_time_ms = execution_start.elapsed().as_millis() as u64,
            outcome = handler_outcome(&result),
            "Handler execution complete"
        );
        let value = match result {
            Ok(outcome) => outcome?,
            Err(payload) => {
                let panic_message = panic_message(payload.as_ref());
                error!(
                    service = %service_id,
                    handler_name = %spec.name,
                    panic_message = %panic_message,
                    "Handler panicked"
                );
                return Err(DispatchError::Internal(anyhow!(
                    "handler '{}' panicked: {panic_message}",
                    spec.name
                )));
            }
        };

        match &spec.mapper {
            Some(mapper) => mapper.apply(value).map_err(|e| {
                DispatchError::Internal(anyhow::Error::new(e).context(format!(
                    "projecting result of '{}' onto {}",
                    spec.name,
                    mapper.shape()
                )))
            }),
            None => Ok(value),
        }
    }

    /// Resolve `req` into its HTTP response. Never fails.
    pub fn resolve(&self, req: &Request) -> HttpResponse {
        let request_id = RequestId::for_request(req);
        let span = info_span!(
            "resolve",
            request_id = %request_id,
            method = %req.method,
            path = %req.path
        );
        let _guard = span.enter();

        let start = Instant::now();
        let response = match self.dispatch(req) {
            Ok(payload) => HttpResponse::envelope(200, &ResponseEnvelope::success(payload)),
            Err(e) => error_response(e),
        };
        info!(
            status = response.status,
            latency_ms = start.elapsed().as_millis() as u64,
            "Request resolved"
        );
        response
    }

    fn authorize(
        &self,
        req: &Request,
        spec: &HandlerSpec,
        requirement: &AuthRequirement,
    ) -> Result<Identity, DispatchError> {
        let authenticator = self.authenticator.as_ref().ok_or_else(|| {
            DispatchError::Internal(anyhow!(
                "handler '{}' requires authentication but no authenticator is configured",
                spec.name
            ))
        })?;
        authenticator
            .require_auth(&req.security(), requirement.required_roles())
            .map_err(|e| {
                e.log();
                DispatchError::Unauthorized(e)
            })
    }
}

/// Translate a failure into its response.
///
/// HTTP-classified kinds carry their status as the single error code, service
/// errors keep status 200, anything else is a logged 500 diagnostic.
#[must_use]
pub fn error_response(err: DispatchError) -> HttpResponse {
    match err {
        DispatchError::Service(e) => {
            debug!(codes = ?e.codes(), "Service error");
            HttpResponse::envelope(200, &ResponseEnvelope::failure(e.codes().to_vec()))
        }
        DispatchError::Internal(e) => {
            let details: Vec<String> = e.chain().skip(1).map(ToString::to_string).collect();
            error!(error = %e, details = ?details, "Unclassified failure");
            HttpResponse::internal(&e)
        }
        other @ (DispatchError::MalformedRequest(_)
        | DispatchError::Unauthorized(_)
        | DispatchError::NotFound { .. }) => {
            let status = other.http_status().unwrap_or(500);
            debug!(kind = other.kind(), error = %other, status, "Request rejected");
            HttpResponse::envelope(status, &ResponseEnvelope::failure(vec![i64::from(status)]))
        }
    }
}

/// Log label for a handler call: `ok`, the error kind, or `panic`.
pub(super) fn handler_outcome(
    result: &thread::Result<Result<Value, DispatchError>>,
) -> &'static str {
    match result {
        Ok(Ok(_)) => "ok",
        Ok(Err(e)) => e.kind(),
        Err(_) => "panic",
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
