//!
//! Small helpers shared by the config loader and the HTTP transport.
//!
//! - [`RequestIdGenerator`] - keeps or mints the `x-request-id` of each request
//! - [`replace_handlebars_with_env`] - `{{ VAR }}` substitution for config text
//!

use {
    http::{HeaderMap, HeaderValue, Request},
    regex::{Captures, Regex},
    std::{env, sync::LazyLock},
    tower_http::request_id::{MakeRequestId, RequestId},
    uuid::{ContextV7, Timestamp, Uuid},
};

/// Name of the header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Matches `{{ VAR_NAME }}` with optional whitespace around the name.
static HANDLEBAR_REGEXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Z0-9_]+)\s*\}\}").unwrap());

/// Request id source for `SetRequestIdLayer`.
///
/// An incoming `x-request-id` header is kept as is; otherwise a UUIDv7 is
/// generated, so ids sort by arrival time. The id ends up in the request
/// scope as `request_id` and in the `http_request` tracing span.
///
/// ```
/// use dispatch_kit::RequestIdGenerator;
/// use tower_http::request_id::SetRequestIdLayer;
///
/// let layer = SetRequestIdLayer::x_request_id(RequestIdGenerator);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequestIdGenerator;

impl MakeRequestId for RequestIdGenerator {
    fn make_request_id<B>(&mut self, req: &Request<B>) -> Option<RequestId> {
        match req.headers().get(REQUEST_ID_HEADER) {
            Some(value) => Some(RequestId::new(value.clone())),
            None => {
                let cx = ContextV7::new().with_additional_precision();
                let uuid = Uuid::new_v7(Timestamp::now(cx));
                let value = HeaderValue::from_str(&uuid.to_string()).ok()?;
                Some(RequestId::new(value))
            }
        }
    }
}

/// Returns the request id header as a string, if present and valid UTF-8.
pub fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Replaces handlebars-style placeholders with environment variable values.
///
/// Variable names are uppercase letters, digits and underscores. Missing
/// variables are replaced with an empty string and logged at `warn`.
///
/// ```
/// use dispatch_kit::replace_handlebars_with_env;
///
/// let template = "Value: {{ DISPATCH_KIT_MISSING_VAR }}";
/// assert_eq!(replace_handlebars_with_env(template), "Value: ");
/// ```
pub fn replace_handlebars_with_env(input: &str) -> String {
    HANDLEBAR_REGEXP
        .replace_all(input, |caps: &Captures| {
            let var_name = &caps[1];
            env::var(var_name).unwrap_or_else(|_| {
                tracing::warn!(
                    variable = %var_name,
                    "Environment variable not found, substituting with empty string"
                );
                String::new()
            })
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_preserved() {
        let req = Request::builder()
            .header(REQUEST_ID_HEADER, "abc-123")
            .body(())
            .unwrap();
        let id = RequestIdGenerator.make_request_id(&req).unwrap();
        assert_eq!(id.header_value(), "abc-123");
    }

    #[test]
    fn test_request_id_generated_as_uuid_v7() {
        let req = Request::builder().body(()).unwrap();
        let id = RequestIdGenerator.make_request_id(&req).unwrap();
        let uuid = Uuid::parse_str(id.header_value().to_str().unwrap()).unwrap();
        assert_eq!(uuid.get_version_num(), 7);
    }

    #[test]
    fn test_request_id_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_id(&headers), None);
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("r-1"));
        assert_eq!(request_id(&headers), Some("r-1".to_string()));
    }

    #[test]
    fn test_replace_handlebars_with_env_no_variables() {
        let input = "This is a plain string with no variables";
        assert_eq!(replace_handlebars_with_env(input), input);
    }

    #[test]
    fn test_replace_handlebars_with_env_with_variables() {
        unsafe {
            env::set_var("DISPATCH_TEST_HOST", "example.com");
            env::set_var("DISPATCH_TEST_PORT", "8080");
        }
        let input = "Host: {{ DISPATCH_TEST_HOST }}, Port: {{DISPATCH_TEST_PORT}}";
        assert_eq!(
            replace_handlebars_with_env(input),
            "Host: example.com, Port: 8080"
        );
        unsafe {
            env::remove_var("DISPATCH_TEST_HOST");
            env::remove_var("DISPATCH_TEST_PORT");
        }
    }

    #[test]
    fn test_replace_handlebars_with_env_missing_variable() {
        unsafe {
            env::remove_var("DISPATCH_TEST_NONEXISTENT");
        }
        let input = "Value: {{ DISPATCH_TEST_NONEXISTENT }}";
        assert_eq!(replace_handlebars_with_env(input), "Value: ");
    }

    #[test]
    fn test_lowercase_names_are_not_placeholders() {
        let input = "{{ lower_case }}";
        assert_eq!(replace_handlebars_with_env(input), input);
    }
}
