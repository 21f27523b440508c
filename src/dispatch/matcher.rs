use {
    crate::{MethodSet, Params, Result, config::RoutingConfig},
    http::Method,
    std::{collections::HashMap, fmt},
};

/// Result of looking a request up in a [`UrlMatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Matched { endpoint: usize, params: Params },
    NotFound,
    MethodNotAllowed { allowed: MethodSet },
    /// `location` is root-relative.
    Redirect { location: String },
}

/// Maps `(path, method)` to the endpoint index a route was compiled to.
pub trait UrlMatcher: Send + Sync {
    /// Adds a route. Fails with [`ErrorKind::RouteConflict`](crate::ErrorKind::RouteConflict)
    /// when the pattern cannot coexist with those already inserted.
    fn insert(&mut self, pattern: &str, methods: &MethodSet, endpoint: usize) -> Result<()>;

    fn lookup(&self, path: &str, method: &Method) -> Lookup;
}

/// The default [`UrlMatcher`], backed by `matchit`.
///
/// Patterns use `matchit` syntax: `/users/{id}` and `/files/{*path}`. One
/// pattern may be registered with several method sets; they are tried in
/// insertion order.
pub struct PathRouter {
    router: matchit::Router<usize>,
    slots: Vec<Vec<(MethodSet, usize)>>,
    patterns: HashMap<String, usize>,
    config: RoutingConfig,
}

impl PathRouter {
    pub fn new(config: RoutingConfig) -> Self {
        Self {
            router: matchit::Router::new(),
            slots: Vec::new(),
            patterns: HashMap::new(),
            config,
        }
    }

    fn redirect_target(&self, path: &str) -> Option<String> {
        if !self.config.redirect_trailing_slash || path.ends_with('/') {
            return None;
        }
        let with_slash = format!("{path}/");
        self.router.at(&with_slash).is_ok().then_some(with_slash)
    }
}

impl fmt::Debug for PathRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathRouter")
            .field("patterns", &self.patterns.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for PathRouter {
    fn default() -> Self {
        Self::new(RoutingConfig::default())
    }
}

impl UrlMatcher for PathRouter {
    fn insert(&mut self, pattern: &str, methods: &MethodSet, endpoint: usize) -> Result<()> {
        let methods = if self.config.implicit_head {
            methods.with_implicit_head()
        } else {
            methods.clone()
        };

        if let Some(&slot) = self.patterns.get(pattern) {
            self.slots[slot].push((methods, endpoint));
            return Ok(());
        }

        let slot = self.slots.len();
        self.router.insert(pattern, slot)?;
        self.patterns.insert(pattern.to_string(), slot);
        self.slots.push(vec![(methods, endpoint)]);
        Ok(())
    }

    fn lookup(&self, path: &str, method: &Method) -> Lookup {
        let Ok(matched) = self.router.at(path) else {
            return match self.redirect_target(path) {
                Some(location) => Lookup::Redirect { location },
                None => Lookup::NotFound,
            };
        };

        let candidates = &self.slots[*matched.value];
        match candidates.iter().find(|(methods, _)| methods.contains(method)) {
            Some(&(_, endpoint)) => Lookup::Matched {
                endpoint,
                params: matched.params.iter().collect(),
            },
            None => Lookup::MethodNotAllowed {
                allowed: candidates
                    .iter()
                    .flat_map(|(methods, _)| methods.iter().cloned())
                    .collect(),
            },
        }
    }
}
