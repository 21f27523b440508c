use {
    crate::{Fault, MethodSet, Scope},
    http::Method,
};

/// What a host extracted from a request before routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    /// Absolute URL of the application root, e.g. `http://example.com/`.
    /// Empty when unknown.
    ///
    /// Expected to end with `/`. Redirect locations are joined to it with
    /// exactly one `/` in between, so a root mounted below the host must be
    /// given as `http://example.com/app/`.
    pub root_url: String,
    pub path: String,
    /// Raw query string without the leading `?`, kept on trailing-slash redirects.
    pub query: Option<String>,
    pub method: Method,
}

impl Prepared {
    pub fn new(root_url: impl Into<String>, path: impl Into<String>, method: Method) -> Self {
        Self {
            root_url: root_url.into(),
            path: path.into(),
            query: None,
            method,
        }
    }

    /// Sets the query string. Empty strings count as no query.
    #[must_use]
    pub fn with_query(mut self, query: Option<&str>) -> Self {
        self.query = query.filter(|q| !q.is_empty()).map(str::to_string);
        self
    }
}

/// Outcomes of URL matching that never reach a handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingSignal {
    #[error("no route matches the request path")]
    NotFound,

    #[error("method not allowed, expected one of: {allowed}")]
    MethodNotAllowed { allowed: MethodSet },

    /// `location` is absolute whenever the host supplied a root URL.
    #[error("redirect to {location}")]
    Redirect { location: String },
}

/// A response-worthy outcome other than a handler's normal return.
#[derive(Debug)]
pub enum Recovered<T> {
    /// The value an error handler produced for a fault.
    Handled(T),
    Routing(RoutingSignal),
}

/// The boundary between the dispatcher and a transport.
///
/// A host turns its native request into a [`Prepared`] summary (providing
/// whatever request data handlers may ask for to the scope) and turns every
/// pipeline outcome into its native response. Exactly one of the three
/// `build_*` methods is called per request. Returning `None` from any of them
/// means no response was produced, which the dispatcher reports as
/// [`ErrorKind::EmptyResponse`](crate::ErrorKind::EmptyResponse).
pub trait Host: Send + Sync + 'static {
    type Request;
    /// What handlers and error handlers return.
    type Output;
    type Response;

    fn prepare_request<S: Scope>(
        &self,
        request: Self::Request,
        scope: &mut S,
    ) -> Result<Prepared, Fault>;

    fn build_success(&self, output: Self::Output) -> Option<Self::Response>;

    fn build_recovered(&self, recovered: Recovered<Self::Output>) -> Option<Self::Response>;

    /// Receives the fault exactly as it was raised.
    fn build_unhandled(&self, fault: Fault) -> Option<Self::Response>;
}
