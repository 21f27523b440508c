//! Test helpers for Dispatcher unit tests
//!
//! The dispatcher is exercised through [`RecordingHost`], a host whose
//! responses are a plain [`Reply`] enum so tests can assert exactly which
//! builder was called and with what.
//!
//! ## Available Helpers
//!
//! - Requests: `TestRequest::get()`, `TestRequest::new()`, `with_root_url()`, `with_query()`
//! - Callables: `text()`, `recording_hook()`, `recording_post_hook()`
//! - Dispatchers: `dispatcher()`, `compile()`
//! - Resolvers: `CountingResolver`, which counts scope creation and release

use crate::{
    Arguments, Composer, Dispatcher, Fault, Handler, Hook, Injector, MethodSet, PostHook,
    Resolver, RouteTable, Scope, Signature, Value,
    dispatch::{Host, Prepared, Recovered, RoutingSignal},
    resolve::InjectorScope,
};
use http::Method;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

#[cfg(test)]
pub(crate) mod concurrency;

// ============================================================================
// Host
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) struct TestRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) root_url: String,
    pub(crate) query: Option<String>,
}

impl TestRequest {
    pub(crate) fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            root_url: String::new(),
            query: None,
        }
    }

    pub(crate) fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub(crate) fn with_root_url(mut self, root_url: &str) -> Self {
        self.root_url = root_url.to_string();
        self
    }

    pub(crate) fn with_query(mut self, query: &str) -> Self {
        self.query = Some(query.to_string());
        self
    }
}

/// Which builder produced the response, and from what.
#[derive(Debug)]
pub(crate) enum Reply {
    Success(String),
    Handled(String),
    NotFound,
    MethodNotAllowed(MethodSet),
    Redirect(String),
    Unhandled(Fault),
}

/// A host that answers with [`Reply`] values.
///
/// An empty handler output is treated as "no response". With `fail_prepare`
/// set, every request fails during preparation.
#[derive(Debug, Default)]
pub(crate) struct RecordingHost {
    pub(crate) fail_prepare: bool,
}

impl Host for RecordingHost {
    type Request = TestRequest;
    type Output = String;
    type Response = Reply;

    fn prepare_request<S: Scope>(
        &self,
        request: TestRequest,
        scope: &mut S,
    ) -> Result<Prepared, Fault> {
        if self.fail_prepare {
            return Err(Fault::value("malformed request"));
        }
        scope.insert("method", request.method.clone());
        scope.insert("path", request.path.clone());
        Ok(Prepared::new(request.root_url, request.path, request.method)
            .with_query(request.query.as_deref()))
    }

    fn build_success(&self, output: String) -> Option<Reply> {
        (!output.is_empty()).then_some(Reply::Success(output))
    }

    fn build_recovered(&self, recovered: Recovered<String>) -> Option<Reply> {
        Some(match recovered {
            Recovered::Handled(output) => Reply::Handled(output),
            Recovered::Routing(RoutingSignal::NotFound) => Reply::NotFound,
            Recovered::Routing(RoutingSignal::MethodNotAllowed { allowed }) => {
                Reply::MethodNotAllowed(allowed)
            }
            Recovered::Routing(RoutingSignal::Redirect { location }) => Reply::Redirect(location),
        })
    }

    fn build_unhandled(&self, fault: Fault) -> Option<Reply> {
        Some(Reply::Unhandled(fault))
    }
}

// ============================================================================
// Callables
// ============================================================================

/// Shared, ordered record of which callables ran.
pub(crate) type Log = Arc<Mutex<Vec<String>>>;

pub(crate) fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub(crate) fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// A handler returning `body`.
pub(crate) fn text(body: &'static str) -> Handler<String> {
    Handler::new(move |_: &Arguments| Ok(body.to_string())).named(body)
}

/// A handler that records `label` and returns it.
pub(crate) fn recording_handler(log: &Log, label: &'static str) -> Handler<String> {
    let log = log.clone();
    Handler::new(move |_: &Arguments| {
        log.lock().unwrap().push(label.to_string());
        Ok(label.to_string())
    })
}

pub(crate) fn recording_hook(log: &Log, label: &'static str) -> Hook {
    let log = log.clone();
    Hook::new(move |_: &Arguments| {
        log.lock().unwrap().push(label.to_string());
        Ok(())
    })
    .named(label)
}

pub(crate) fn recording_post_hook(log: &Log, label: &'static str) -> PostHook<String> {
    let log = log.clone();
    PostHook::new(move |_: &Arguments, output: &String| {
        log.lock().unwrap().push(format!("{label}({output})"));
        Ok(())
    })
    .named(label)
}

/// A handler that reads `path_args:{name}`.
pub(crate) fn echo_param(name: &'static str) -> Handler<String> {
    Handler::new(move |args: &Arguments| Ok(args.get::<String>(name)?.clone()))
        .with_signature(Signature::new().param(name, format!("path_args:{name}")))
}

// ============================================================================
// Dispatchers
// ============================================================================

pub(crate) fn dispatcher(tables: Vec<RouteTable<String>>) -> Dispatcher<RecordingHost> {
    Dispatcher::compile(tables, RecordingHost::default(), Injector::new()).unwrap()
}

pub(crate) fn compile(composer: &Composer<String>) -> Dispatcher<RecordingHost> {
    composer
        .compile(RecordingHost::default(), Injector::new())
        .unwrap()
}

/// A one-table dispatcher from `(pattern, methods, handler)` triples.
pub(crate) fn single_table(
    routes: Vec<(&str, MethodSet, Handler<String>)>,
) -> Dispatcher<RecordingHost> {
    let mut table = RouteTable::new();
    for (pattern, methods, handler) in routes {
        table.add_route(pattern, handler, methods);
    }
    dispatcher(vec![table])
}

// ============================================================================
// Resolvers
// ============================================================================

/// An [`Injector`] that counts the scopes it creates and that get dropped.
#[derive(Debug, Default)]
pub(crate) struct CountingResolver {
    inner: Injector,
    pub(crate) created: Arc<AtomicUsize>,
    pub(crate) dropped: Arc<AtomicUsize>,
}

pub(crate) struct CountingScope {
    inner: InjectorScope,
    dropped: Arc<AtomicUsize>,
}

impl Resolver for CountingResolver {
    type Scope = CountingScope;

    fn scope(&self) -> CountingScope {
        self.created.fetch_add(1, Ordering::SeqCst);
        CountingScope {
            inner: self.inner.scope(),
            dropped: self.dropped.clone(),
        }
    }
}

impl Scope for CountingScope {
    fn provide(&mut self, key: &str, value: Value) {
        self.inner.provide(key, value);
    }

    fn resolve(&mut self, signature: &Signature) -> Result<Arguments, Fault> {
        self.inner.resolve(signature)
    }
}

impl Drop for CountingScope {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}
