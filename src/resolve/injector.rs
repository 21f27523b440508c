use {
    super::{Arguments, Params, Resolver, Scope, Signature, Value, split_source},
    crate::Fault,
    std::{
        any::Any,
        collections::HashMap,
        fmt,
        sync::Arc,
    },
};

type ProviderFn = dyn Fn(&Provided, Option<&str>) -> Result<Value, Fault> + Send + Sync;

/// Values explicitly provided to a request scope so far.
///
/// Providers receive this view so they can build on request data, e.g. a
/// `user` provider reading the `headers` the host provided.
#[derive(Default)]
pub struct Provided {
    values: HashMap<String, Value>,
}

impl Provided {
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.value(key).and_then(|value| value.downcast_ref::<T>())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Provided {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// The default [`Resolver`]: a registry of named providers.
///
/// A provider registered under `key` answers both `key` and `key:name`
/// lookups; it receives the `name` part (or `None`) and the values provided
/// to the request so far. Each distinct source key is computed at most once
/// per request.
///
/// ```rust
/// use dispatch_kit::{Injector, Resolver, Scope, Signature};
///
/// let injector = Injector::new()
///     .factory("answer", || 42_u32)
///     .provider("hello", |_, name| Ok(format!("Hello, {}!", name.unwrap_or("world"))));
///
/// let mut scope = injector.scope();
/// let args = scope
///     .resolve(&Signature::new().param("n", "answer").param("greeting", "hello:ada"))
///     .unwrap();
/// assert_eq!(*args.get::<u32>("n").unwrap(), 42);
/// assert_eq!(args.get::<String>("greeting").unwrap(), "Hello, ada!");
/// ```
#[derive(Clone, Default)]
pub struct Injector {
    providers: Arc<HashMap<String, Arc<ProviderFn>>>,
}

impl Injector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider` under `key`, replacing any earlier registration.
    #[must_use]
    pub fn provider<T, F>(mut self, key: impl Into<String>, provider: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Provided, Option<&str>) -> Result<T, Fault> + Send + Sync + 'static,
    {
        let erased = move |provided: &Provided, name: Option<&str>| {
            provider(provided, name).map(|value| Arc::new(value) as Value)
        };
        Arc::make_mut(&mut self.providers).insert(key.into(), Arc::new(erased));
        self
    }

    /// Registers a provider that ignores its sub-key and request data.
    #[must_use]
    pub fn factory<T, F>(self, key: impl Into<String>, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.provider(key, move |_, _| Ok(factory()))
    }

    pub fn has_provider(&self, key: &str) -> bool {
        self.providers.contains_key(key)
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Resolver for Injector {
    type Scope = InjectorScope;

    fn scope(&self) -> InjectorScope {
        InjectorScope {
            providers: self.providers.clone(),
            provided: Provided::default(),
            cache: HashMap::new(),
        }
    }
}

/// Request scope created by an [`Injector`].
pub struct InjectorScope {
    providers: Arc<HashMap<String, Arc<ProviderFn>>>,
    provided: Provided,
    cache: HashMap<String, Value>,
}

impl InjectorScope {
    pub fn provided(&self) -> &Provided {
        &self.provided
    }

    fn lookup(&mut self, source: &str) -> Result<Value, Fault> {
        if let Some(value) = self.provided.value(source) {
            return Ok(value.clone());
        }
        if let Some(value) = self.cache.get(source) {
            return Ok(value.clone());
        }

        let (key, name) = split_source(source);
        if let Some(provider) = self.providers.get(key) {
            let value = provider(&self.provided, name)?;
            self.cache.insert(source.to_string(), value.clone());
            return Ok(value);
        }

        if let (Some(name), Some(parent)) = (name, self.provided.value(key)) {
            if let Some(params) = parent.downcast_ref::<Params>() {
                if let Some(value) = params.get(name) {
                    return Ok(Arc::new(value.to_string()));
                }
            } else if let Some(table) = parent.downcast_ref::<toml::Table>() {
                if let Some(value) = table.get(name) {
                    return Ok(Arc::new(value.clone()));
                }
            }
        }

        Err(Fault::resolution(format!(
            "nothing provided for `{source}`"
        )))
    }
}

impl Scope for InjectorScope {
    fn provide(&mut self, key: &str, value: Value) {
        self.provided.values.insert(key.to_string(), value);
    }

    fn resolve(&mut self, signature: &Signature) -> Result<Arguments, Fault> {
        let mut args = Arguments::new();
        for param in signature.iter() {
            let value = self.lookup(param.source())?;
            args.insert(param.name(), value);
        }
        Ok(args)
    }
}

impl Drop for InjectorScope {
    fn drop(&mut self) {
        tracing::trace!(
            provided = self.provided.len(),
            computed = self.cache.len(),
            "request scope released"
        );
    }
}
