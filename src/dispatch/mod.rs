//! The dispatcher: compiled route tables and the per-request pipeline.
//!
//! A [`Dispatcher`] is built once from a finalized sequence of
//! [`RouteTable`]s and is read-only afterwards, so it can be shared across
//! threads behind an `Arc`. Every call to [`Dispatcher::handle`] runs:
//!
//! 1. request preparation by the [`Host`], inside a fresh request scope
//! 2. URL matching; routing signals (not found, method not allowed,
//!    redirect) go straight to [`Host::build_recovered`]
//! 3. the owning table's first hooks (once per table) and pre hooks
//! 4. the handler
//! 5. the post hooks, which see the handler's output
//!
//! A fault from steps 3 to 5 is offered to the owning table's error
//! handlers; the first one registered for a class the fault `is_a` wins.
//! Unclaimed [`APPLICATION_EXCEPTION`](crate::APPLICATION_EXCEPTION) faults
//! are answered like step 2's routing signals. Any other fault nobody handles
//! reaches [`Host::build_unhandled`] untouched.

mod host;
mod matcher;

#[cfg(test)]
mod tests;

pub use {
    host::{Host, Prepared, Recovered, RoutingSignal},
    matcher::{Lookup, PathRouter, UrlMatcher},
};

use {
    crate::{
        Arguments, Error, Fault, Handler, Injector, Resolver, Result, RouteTable, Scope,
        Signature, Value,
        config::RoutingConfig,
        resolve::{CONFIG, PATH_ARGS},
    },
    std::{fmt, sync::Arc},
};

/// A compiled route: its handler and the table it was registered in.
struct Endpoint<T> {
    handler: Handler<T>,
    table: Arc<RouteTable<T>>,
    config: Value,
}

/// A compiled application.
pub struct Dispatcher<H: Host, R: Resolver = Injector> {
    host: H,
    resolver: R,
    matcher: Box<dyn UrlMatcher>,
    endpoints: Vec<Endpoint<H::Output>>,
    tables: Vec<Arc<RouteTable<H::Output>>>,
}

impl<H: Host, R: Resolver> Dispatcher<H, R> {
    /// Compiles `tables` with a default [`PathRouter`].
    pub fn compile<I>(tables: I, host: H, resolver: R) -> Result<Self>
    where
        I: IntoIterator<Item = RouteTable<H::Output>>,
    {
        Self::compile_with(tables, host, resolver, PathRouter::default())
    }

    /// Compiles `tables` with a [`PathRouter`] configured by `routing`.
    pub fn compile_with_routing<I>(
        tables: I,
        host: H,
        resolver: R,
        routing: RoutingConfig,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = RouteTable<H::Output>>,
    {
        Self::compile_with(tables, host, resolver, PathRouter::new(routing))
    }

    /// Compiles `tables` into `matcher`.
    ///
    /// Each route is inserted as `prefix + pattern`. The first matcher error
    /// aborts compilation.
    pub fn compile_with<I, M>(tables: I, host: H, resolver: R, mut matcher: M) -> Result<Self>
    where
        I: IntoIterator<Item = RouteTable<H::Output>>,
        M: UrlMatcher + 'static,
    {
        let mut endpoints = Vec::new();
        let mut frozen = Vec::new();

        for table in tables {
            let table = Arc::new(table);
            let config: Value = Arc::new(table.config().clone());

            for route in table.routes() {
                let pattern = format!("{}{}", table.prefix().unwrap_or_default(), route.pattern());
                matcher.insert(&pattern, route.methods(), endpoints.len())?;
                tracing::debug!(
                    pattern = %pattern,
                    methods = %route.methods(),
                    handler = route.handler().name(),
                    "Route compiled"
                );
                endpoints.push(Endpoint {
                    handler: route.handler().clone(),
                    table: table.clone(),
                    config: config.clone(),
                });
            }
            frozen.push(table);
        }

        tracing::info!(
            routes = endpoints.len(),
            tables = frozen.len(),
            "Dispatcher compiled"
        );

        Ok(Self {
            host,
            resolver,
            matcher: Box::new(matcher),
            endpoints,
            tables: frozen,
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// The compiled tables, in compilation order.
    pub fn tables(&self) -> &[Arc<RouteTable<H::Output>>] {
        &self.tables
    }

    pub fn route_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Runs the request pipeline and returns the host's response.
    ///
    /// The only error is [`ErrorKind::EmptyResponse`](crate::ErrorKind::EmptyResponse):
    /// every fault raised by application code ends up in one of the host's
    /// response builders.
    pub fn handle(&self, request: H::Request) -> Result<H::Response> {
        let mut scope = self.resolver.scope();
        let response = self.run(request, &mut scope);
        drop(scope);
        response.ok_or_else(|| Error::empty_response("request pipeline produced no response"))
    }

    fn run(&self, request: H::Request, scope: &mut R::Scope) -> Option<H::Response> {
        let prepared = match self.host.prepare_request(request, scope) {
            Ok(prepared) => prepared,
            Err(fault) => {
                tracing::error!(
                    class = fault.class().name(),
                    error = %fault,
                    "Request preparation failed"
                );
                return self.host.build_unhandled(fault);
            }
        };

        let index = match self.matcher.lookup(&prepared.path, &prepared.method) {
            Lookup::Matched { endpoint, params } => {
                scope.provide(PATH_ARGS, Arc::new(params));
                endpoint
            }
            Lookup::NotFound => return self.signal(RoutingSignal::NotFound, &prepared),
            Lookup::MethodNotAllowed { allowed } => {
                return self.signal(RoutingSignal::MethodNotAllowed { allowed }, &prepared);
            }
            Lookup::Redirect { location } => {
                let location = match &prepared.query {
                    Some(query) => format!("{location}?{query}"),
                    None => location,
                };
                let location = absolute_location(&prepared.root_url, &location);
                return self.signal(RoutingSignal::Redirect { location }, &prepared);
            }
        };

        let Some(endpoint) = self.endpoints.get(index) else {
            let fault = Fault::runtime(format!("URL matcher returned unknown endpoint {index}"));
            return self.host.build_unhandled(fault);
        };
        scope.provide(CONFIG, endpoint.config.clone());

        tracing::debug!(
            method = %prepared.method,
            path = %prepared.path,
            handler = endpoint.handler.name(),
            "Dispatching request"
        );

        match execute(endpoint, scope) {
            Ok(output) => self.host.build_success(output),
            Err(fault) => self.recover(&endpoint.table, fault, &prepared, scope),
        }
    }

    fn signal(&self, signal: RoutingSignal, prepared: &Prepared) -> Option<H::Response> {
        tracing::debug!(
            method = %prepared.method,
            path = %prepared.path,
            signal = %signal,
            "Routing signal"
        );
        self.host.build_recovered(Recovered::Routing(signal))
    }

    fn recover(
        &self,
        table: &RouteTable<H::Output>,
        fault: Fault,
        prepared: &Prepared,
        scope: &mut R::Scope,
    ) -> Option<H::Response> {
        let Some(handler) = table.error_handler_for(&fault) else {
            if let Some(signal) = fault.routing_signal() {
                let signal = match signal.clone() {
                    RoutingSignal::Redirect { location } => RoutingSignal::Redirect {
                        location: absolute_location(&prepared.root_url, &location),
                    },
                    signal => signal,
                };
                return self.signal(signal, prepared);
            }
            tracing::error!(
                class = fault.class().name(),
                error = %fault,
                "Unhandled fault"
            );
            return self.host.build_unhandled(fault);
        };

        tracing::warn!(
            class = fault.class().name(),
            error = %fault,
            handler = handler.name(),
            "Recovering fault"
        );

        let recovered =
            arguments(handler.signature(), scope).and_then(|args| handler.call(&args, &fault));
        match recovered {
            Ok(value) => self.host.build_recovered(Recovered::Handled(value)),
            Err(error_handler_fault) => {
                tracing::error!(
                    class = error_handler_fault.class().name(),
                    error = %error_handler_fault,
                    original = %fault,
                    handler = handler.name(),
                    "Error handler failed"
                );
                self.host.build_unhandled(error_handler_fault)
            }
        }
    }
}

/// Hooks, handler and post hooks of one matched request.
fn execute<T, S: Scope>(endpoint: &Endpoint<T>, scope: &mut S) -> std::result::Result<T, Fault> {
    let table = &endpoint.table;

    table.run_first_hooks_once(|hook| hook.call(&arguments(hook.signature(), scope)?))?;

    for hook in table.pre_hooks() {
        hook.call(&arguments(hook.signature(), scope)?)?;
    }

    let handler = &endpoint.handler;
    let output = handler.call(&arguments(handler.signature(), scope)?)?;

    for hook in table.post_hooks() {
        hook.call(&arguments(hook.signature(), scope)?, &output)?;
    }

    Ok(output)
}

fn arguments<S: Scope>(
    signature: Option<&Signature>,
    scope: &mut S,
) -> std::result::Result<Arguments, Fault> {
    match signature {
        Some(signature) => scope.resolve(signature),
        None => Ok(Arguments::new()),
    }
}

/// Makes a root-relative redirect location absolute against `root_url`.
fn absolute_location(root_url: &str, location: &str) -> String {
    if root_url.is_empty() || !location.starts_with('/') {
        return location.to_string();
    }
    format!(
        "{}/{}",
        root_url.trim_end_matches('/'),
        location.trim_start_matches('/')
    )
}

impl<H: Host + fmt::Debug, R: Resolver> fmt::Debug for Dispatcher<H, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("host", &self.host)
            .field("routes", &self.endpoints.len())
            .field("tables", &self.tables.len())
            .finish()
    }
}
