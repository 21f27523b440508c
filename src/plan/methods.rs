use {http::Method, std::fmt};

/// An ordered, duplicate-free set of HTTP methods.
///
/// Two sets holding the same methods are equal regardless of the order they
/// were listed in, which makes `(pattern, MethodSet)` usable as a route key.
/// The default set is `{GET}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSet(Vec<Method>);

impl MethodSet {
    pub fn new<I: IntoIterator<Item = Method>>(methods: I) -> Self {
        let mut methods: Vec<Method> = methods.into_iter().collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods.dedup();
        Self(methods)
    }

    pub fn contains(&self, method: &Method) -> bool {
        self.0.contains(method)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Method> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn union(&self, other: &MethodSet) -> MethodSet {
        MethodSet::new(self.0.iter().chain(other.0.iter()).cloned())
    }

    /// Adds `HEAD` when the set accepts `GET`.
    pub(crate) fn with_implicit_head(&self) -> MethodSet {
        if self.contains(&Method::GET) && !self.contains(&Method::HEAD) {
            MethodSet::new(self.0.iter().cloned().chain([Method::HEAD]))
        } else {
            self.clone()
        }
    }
}

impl Default for MethodSet {
    fn default() -> Self {
        Self(vec![Method::GET])
    }
}

impl From<Method> for MethodSet {
    fn from(method: Method) -> Self {
        Self(vec![method])
    }
}

impl<const N: usize> From<[Method; N]> for MethodSet {
    fn from(methods: [Method; N]) -> Self {
        MethodSet::new(methods)
    }
}

impl From<Vec<Method>> for MethodSet {
    fn from(methods: Vec<Method>) -> Self {
        MethodSet::new(methods)
    }
}

impl FromIterator<Method> for MethodSet {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        MethodSet::new(iter)
    }
}

/// Formats as an `Allow` header value, e.g. `GET, HEAD, POST`.
impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Method::as_str).collect();
        f.write_str(&names.join(", "))
    }
}
