//! Parameter resolution for handlers, hooks and error handlers.
//!
//! The dispatcher never inspects callables. A callable that wants arguments
//! declares a [`Signature`] mapping each parameter name to a source key, and
//! the request [`Scope`] turns that signature into [`Arguments`]. Values are
//! type-erased ([`Value`]) and recovered with [`Arguments::get`].
//!
//! Source keys are either `key` or `key:name`. The dispatcher itself provides
//! `path_args` ([`Params`]) and `config` ([`toml::Table`]) for every matched
//! request; hosts provide whatever their transport knows about the request.

mod injector;

pub use injector::{Injector, InjectorScope, Provided};

use {
    crate::Fault,
    std::{
        any::{Any, type_name},
        collections::BTreeMap,
        fmt,
        sync::Arc,
    },
};

/// A type-erased value held by a request scope.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Scope key under which matched path parameters are provided.
pub const PATH_ARGS: &str = "path_args";

/// Scope key under which the owning route table's config is provided.
pub const CONFIG: &str = "config";

/// A string-to-string map such as path parameters, query strings or headers.
///
/// Values of this type support `key:name` lookups in the [`Injector`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One declared parameter: the name the callable sees and where it comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    name: String,
    source: String,
}

impl Param {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full source key, e.g. `path_args:id`.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Splits a source key into its base key and optional sub-key.
pub fn split_source(source: &str) -> (&str, Option<&str>) {
    match source.split_once(':') {
        Some((key, name)) => (key, Some(name)),
        None => (source, None),
    }
}

/// The parameters a callable asks the request scope for.
///
/// ```rust
/// use dispatch_kit::Signature;
///
/// let signature = Signature::new()
///     .param("id", "path_args:id")
///     .param("greeting", "hello:world");
/// assert_eq!(signature.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a signature whose parameter names equal their source keys.
    pub fn from_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        keys.into_iter()
            .fold(Self::new(), |signature, key| signature.param(key, key))
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            source: source.into(),
        });
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Resolved argument values, keyed by parameter name.
#[derive(Clone, Default)]
pub struct Arguments {
    values: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// Returns the argument `name` as a `T`.
    ///
    /// Missing arguments and type mismatches are [`RESOLUTION_ERROR`](crate::RESOLUTION_ERROR)
    /// faults, so a `?` inside a handler routes them to the error handlers.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<&T, Fault> {
        let value = self
            .value(name)
            .ok_or_else(|| Fault::resolution(format!("missing argument `{name}`")))?;
        value.downcast_ref::<T>().ok_or_else(|| {
            Fault::resolution(format!(
                "argument `{name}` is not a `{}`",
                type_name::<T>()
            ))
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Per-request value store handed out by a [`Resolver`].
///
/// A scope lives exactly as long as one pass through the dispatcher pipeline
/// and is dropped on every exit path.
pub trait Scope {
    /// Makes `value` available under `key` for the rest of the request.
    fn provide(&mut self, key: &str, value: Value);

    /// Resolves every parameter of `signature`.
    fn resolve(&mut self, signature: &Signature) -> Result<Arguments, Fault>;

    /// Typed convenience over [`Scope::provide`].
    fn insert<T: Any + Send + Sync>(&mut self, key: &str, value: T)
    where
        Self: Sized,
    {
        self.provide(key, Arc::new(value));
    }
}

/// Factory for request scopes, shared by every request of a dispatcher.
pub trait Resolver: Send + Sync + 'static {
    type Scope: Scope;

    fn scope(&self) -> Self::Scope;
}
