//! HTTP transport for a [`Dispatcher`](crate::Dispatcher), built on axum.
//!
//! [`HttpHost`] is the [`Host`] for buffered `http::Request<Bytes>` requests
//! whose handlers return axum [`Response`]s. [`HttpServer`] serves such a
//! dispatcher with the usual tower-http layers and graceful shutdown.
//!
//! Request data is provided to the request scope under these keys:
//!
//! | key          | type                        |
//! |--------------|-----------------------------|
//! | `method`     | `http::Method`              |
//! | `path`       | `String`                    |
//! | `root_url`   | `String`                    |
//! | `headers`    | [`Params`], lower-case names |
//! | `query`      | [`Params`]                  |
//! | `form`       | [`Params`], urlencoded bodies only |
//! | `body`       | [`Bytes`]                   |
//! | `request_id` | `String`, when present      |
//!
//! Single values are reachable through `key:name` sources, e.g. `query:page` or
//! `headers:user-agent`.

mod server;
mod shutdown;

pub use {
    server::HttpServer,
    shutdown::{ShutdownNotifier, ShutdownPhase},
};

use {
    crate::{
        Fault, Params, Scope,
        config::HttpConfig,
        dispatch::{Host, Prepared, Recovered, RoutingSignal},
        error::{Error, ErrorResponse},
        utils::request_id,
    },
    axum::{
        Json,
        body::Bytes,
        response::{IntoResponse, Response},
    },
    http::{HeaderMap, HeaderValue, Request, StatusCode, header, request::Parts},
    url::{Url, form_urlencoded},
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// The [`Host`] of the HTTP transport.
#[derive(Debug, Clone, Default)]
pub struct HttpHost {
    expose_error_details: bool,
}

impl HttpHost {
    pub fn new(config: &HttpConfig) -> Self {
        Self {
            expose_error_details: config.expose_error_details,
        }
    }

    /// Includes the fault message as `details` in 500 responses.
    #[must_use]
    pub fn with_expose_error_details(mut self, enable: bool) -> Self {
        self.expose_error_details = enable;
        self
    }
}

impl Host for HttpHost {
    type Request = Request<Bytes>;
    type Output = Response;
    type Response = Response;

    fn prepare_request<S: Scope>(
        &self,
        request: Request<Bytes>,
        scope: &mut S,
    ) -> Result<Prepared, Fault> {
        let (parts, body) = request.into_parts();
        let root_url = root_url(&parts);
        let path = parts.uri.path().to_string();

        let headers: Params = parts
            .headers
            .iter()
            .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)))
            .collect();
        let query: Params = parts
            .uri
            .query()
            .map(|query| form_urlencoded::parse(query.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        if is_form(&parts.headers) {
            let form: Params = form_urlencoded::parse(&body).into_owned().collect();
            scope.insert("form", form);
        }
        if let Some(id) = request_id(&parts.headers) {
            scope.insert("request_id", id);
        }

        scope.insert("method", parts.method.clone());
        scope.insert("path", path.clone());
        scope.insert("root_url", root_url.clone());
        scope.insert("headers", headers);
        scope.insert("query", query);
        scope.insert("body", body);

        Ok(Prepared::new(root_url, path, parts.method).with_query(parts.uri.query()))
    }

    fn build_success(&self, output: Response) -> Option<Response> {
        Some(output)
    }

    fn build_recovered(&self, recovered: Recovered<Response>) -> Option<Response> {
        let response = match recovered {
            Recovered::Handled(response) => response,
            Recovered::Routing(RoutingSignal::NotFound) => (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(
                    "ROUTE_NOT_FOUND",
                    "No route matches the request path",
                )),
            )
                .into_response(),
            Recovered::Routing(RoutingSignal::MethodNotAllowed { allowed }) => {
                let body = ErrorResponse::new("METHOD_NOT_ALLOWED", "Method not allowed")
                    .with_details(format!("Allowed methods: {allowed}"));
                let mut response = (StatusCode::METHOD_NOT_ALLOWED, Json(body)).into_response();
                match HeaderValue::from_str(&allowed.to_string()) {
                    Ok(value) => {
                        response.headers_mut().insert(header::ALLOW, value);
                        response
                    }
                    Err(err) => Error::from(err).into_response(),
                }
            }
            Recovered::Routing(RoutingSignal::Redirect { location }) => {
                match HeaderValue::from_str(&location) {
                    Ok(value) => {
                        (StatusCode::PERMANENT_REDIRECT, [(header::LOCATION, value)]).into_response()
                    }
                    Err(err) => Error::from(err).into_response(),
                }
            }
        };
        Some(response)
    }

    fn build_unhandled(&self, fault: Fault) -> Option<Response> {
        tracing::error!(
            class = fault.class().name(),
            error = %fault,
            "Responding with 500 for unhandled fault"
        );
        let mut body = ErrorResponse::new("UNHANDLED_ERROR", "Internal Server Error");
        if self.expose_error_details {
            body = body.with_details(format!("{}: {}", fault.class().name(), fault));
        }
        Some((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
    }
}

/// `{scheme}://{host}/` from the request, or empty when no usable host is known.
fn root_url(parts: &Parts) -> String {
    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| parts.uri.authority().map(|authority| authority.as_str()));
    let Some(host) = host else {
        return String::new();
    };
    let scheme = parts.uri.scheme_str().unwrap_or("http");

    match Url::parse(&format!("{scheme}://{host}/")) {
        Ok(url) => url.to_string(),
        Err(err) => {
            tracing::debug!(host = %host, error = %err, "Ignoring unusable Host header");
            String::new()
        }
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}
