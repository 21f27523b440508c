//! Route tables: the mergeable unit of route, hook and error-handler registration.
//!
//! A [`RouteTable`] is a plain value. It records what was registered and in
//! which order, and knows how to merge another table into itself. It performs
//! no routing: patterns are only checked when a
//! [`Dispatcher`](crate::Dispatcher) compiles them.
//!
//! # Merge order
//!
//! `a.merge_from(&b)` treats `b` as the enclosing scope:
//!
//! | field            | result                                    |
//! |------------------|-------------------------------------------|
//! | `pre_hooks`      | `b`'s, then `a`'s                         |
//! | `first_hooks`    | `b`'s, then `a`'s                         |
//! | `post_hooks`     | `a`'s, then `b`'s                         |
//! | `error_handlers` | `a`'s, then classes only `b` handles      |
//! | `routes`, config | key by key, `b` wins                      |
//!
//! Merging is associative and merging an empty table is a no-op.

mod callable;
mod methods;
mod once;

pub use callable::{ErrorHandler, Handler, Hook, PostHook};
pub use methods::MethodSet;

use {
    crate::{ErrorClass, Fault},
    once::FirstRunGate,
    std::fmt,
};

/// A registered route: pattern, accepted methods and handler.
pub struct Route<T> {
    pattern: String,
    methods: MethodSet,
    handler: Handler<T>,
}

impl<T> Route<T> {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn methods(&self) -> &MethodSet {
        &self.methods
    }

    pub fn handler(&self) -> &Handler<T> {
        &self.handler
    }

    fn same_key(&self, pattern: &str, methods: &MethodSet) -> bool {
        self.pattern == pattern && &self.methods == methods
    }
}

impl<T> Clone for Route<T> {
    fn clone(&self) -> Self {
        Self {
            pattern: self.pattern.clone(),
            methods: self.methods.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<T> fmt::Debug for Route<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("methods", &self.methods.to_string())
            .field("handler", &self.handler.name())
            .finish()
    }
}

/// Routes, hooks, error handlers and config for one group of endpoints.
///
/// `T` is the handler output type of the host the table is compiled for.
pub struct RouteTable<T> {
    routes: Vec<Route<T>>,
    prefix: Option<String>,
    pre_hooks: Vec<Hook>,
    first_hooks: Vec<Hook>,
    first_run: FirstRunGate,
    post_hooks: Vec<PostHook<T>>,
    error_handlers: Vec<(&'static ErrorClass, ErrorHandler<T>)>,
    config: toml::Table,
}

impl<T> RouteTable<T> {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            prefix: None,
            pre_hooks: Vec::new(),
            first_hooks: Vec::new(),
            first_run: FirstRunGate::default(),
            post_hooks: Vec::new(),
            error_handlers: Vec::new(),
            config: toml::Table::new(),
        }
    }

    /// Registers `handler` for `pattern` and `methods`.
    ///
    /// Registering the same `(pattern, methods)` pair again replaces the
    /// handler and keeps the route's original position.
    pub fn add_route(
        &mut self,
        pattern: impl Into<String>,
        handler: Handler<T>,
        methods: impl Into<MethodSet>,
    ) {
        let pattern = pattern.into();
        let methods = methods.into();
        match self
            .routes
            .iter_mut()
            .find(|route| route.same_key(&pattern, &methods))
        {
            Some(route) => route.handler = handler,
            None => self.routes.push(Route {
                pattern,
                methods,
                handler,
            }),
        }
    }

    /// Registers a `GET` route.
    pub fn add_get_route(&mut self, pattern: impl Into<String>, handler: Handler<T>) {
        self.add_route(pattern, handler, MethodSet::default());
    }

    pub fn add_pre_hook(&mut self, hook: Hook) {
        self.pre_hooks.push(hook);
    }

    pub fn add_first_hook(&mut self, hook: Hook) {
        self.first_hooks.push(hook);
    }

    pub fn add_post_hook(&mut self, hook: PostHook<T>) {
        self.post_hooks.push(hook);
    }

    /// Registers `handler` for faults that are `class` or derive from it.
    ///
    /// A second registration for the same class replaces the first in place.
    pub fn add_error_handler(&mut self, class: &'static ErrorClass, handler: ErrorHandler<T>) {
        match self.error_handlers.iter_mut().find(|(c, _)| *c == class) {
            Some((_, slot)) => *slot = handler,
            None => self.error_handlers.push((class, handler)),
        }
    }

    pub fn set_config(&mut self, key: impl Into<String>, value: impl Into<toml::Value>) {
        self.config.insert(key.into(), value.into());
    }

    pub fn config_mut(&mut self) -> &mut toml::Table {
        &mut self.config
    }

    /// Sets the mount prefix. `"/"` and `""` clear it.
    pub fn set_prefix(&mut self, prefix: Option<&str>) {
        self.prefix = prefix.and_then(normalize_prefix);
    }

    /// Places the table under an outer mount point, ahead of its own prefix.
    pub fn mount_under(&mut self, outer: Option<&str>) {
        let joined = format!(
            "{}{}",
            outer.unwrap_or_default(),
            self.prefix.as_deref().unwrap_or_default()
        );
        self.prefix = normalize_prefix(&joined);
    }

    /// Merges `other` into `self`, treating `other` as the enclosing scope.
    pub fn merge_from(&mut self, other: &RouteTable<T>) {
        for route in &other.routes {
            self.add_route(
                route.pattern.clone(),
                route.handler.clone(),
                route.methods.clone(),
            );
        }
        self.inherit_from(other);
    }

    /// Like [`RouteTable::merge_from`] but leaves the routes alone.
    ///
    /// This is how a composer pushes its hooks, error handlers and config
    /// down into the tables of its mounted children.
    pub fn inherit_from(&mut self, parent: &RouteTable<T>) {
        self.pre_hooks = concat(&parent.pre_hooks, &self.pre_hooks);
        self.first_hooks = concat(&parent.first_hooks, &self.first_hooks);
        self.post_hooks.extend(parent.post_hooks.iter().cloned());

        for (class, handler) in &parent.error_handlers {
            if !self.error_handlers.iter().any(|(c, _)| c == class) {
                self.error_handlers.push((*class, handler.clone()));
            }
        }

        for (key, value) in &parent.config {
            self.config.insert(key.clone(), value.clone());
        }
    }

    /// Returns an independent table sharing the same callables.
    pub fn copy(&self) -> Self {
        Self {
            routes: self.routes.clone(),
            prefix: self.prefix.clone(),
            pre_hooks: self.pre_hooks.clone(),
            first_hooks: self.first_hooks.clone(),
            first_run: self.first_run.clone(),
            post_hooks: self.post_hooks.clone(),
            error_handlers: self.error_handlers.clone(),
            config: self.config.clone(),
        }
    }

    /// Runs the first hooks through `runner` once for the table's lifetime.
    ///
    /// Concurrent callers block until the winning caller is done. If a hook
    /// fails, its fault is returned and the next call tries again.
    pub fn run_first_hooks_once<F>(&self, mut runner: F) -> Result<(), Fault>
    where
        F: FnMut(&Hook) -> Result<(), Fault>,
    {
        self.first_run.run_once(|| {
            for hook in &self.first_hooks {
                runner(hook)?;
            }
            Ok(())
        })
    }

    pub fn first_hooks_done(&self) -> bool {
        self.first_run.is_done()
    }

    /// The first registered error handler whose class `fault` is an instance of.
    pub fn error_handler_for(&self, fault: &Fault) -> Option<&ErrorHandler<T>> {
        self.error_handlers
            .iter()
            .find(|(class, _)| fault.is_a(class))
            .map(|(_, handler)| handler)
    }

    pub fn routes(&self) -> &[Route<T>] {
        &self.routes
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn pre_hooks(&self) -> &[Hook] {
        &self.pre_hooks
    }

    pub fn first_hooks(&self) -> &[Hook] {
        &self.first_hooks
    }

    pub fn post_hooks(&self) -> &[PostHook<T>] {
        &self.post_hooks
    }

    pub fn error_handlers(&self) -> &[(&'static ErrorClass, ErrorHandler<T>)] {
        &self.error_handlers
    }

    pub fn config(&self) -> &toml::Table {
        &self.config
    }
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RouteTable<T> {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl<T> fmt::Debug for RouteTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("prefix", &self.prefix)
            .field("routes", &self.routes)
            .field("pre_hooks", &self.pre_hooks.len())
            .field("first_hooks", &self.first_hooks.len())
            .field("post_hooks", &self.post_hooks.len())
            .field(
                "error_handlers",
                &self
                    .error_handlers
                    .iter()
                    .map(|(class, _)| class.name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn concat<C: Clone>(first: &[C], second: &[C]) -> Vec<C> {
    first.iter().chain(second).cloned().collect()
}

/// Normalizes a mount prefix: no trailing `/`, a leading `/`, and `None`
/// for the root.
pub(crate) fn normalize_prefix(prefix: &str) -> Option<String> {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else if trimmed.starts_with('/') {
        Some(trimmed.to_string())
    } else {
        Some(format!("/{trimmed}"))
    }
}
