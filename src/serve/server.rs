use {
    super::{
        HttpHost,
        shutdown::{ShutdownNotifier, ShutdownPhase, shutdown_signal},
    },
    crate::{
        Composer, Config, Dispatcher, Injector, Resolver, Result,
        error::{Error, ErrorResponse},
        utils::{REQUEST_ID_HEADER, RequestIdGenerator},
    },
    axum::{
        Json, Router,
        body::Body,
        response::{IntoResponse, Response},
    },
    http::{HeaderName, Request, StatusCode},
    std::{fmt, sync::Arc},
    tokio_util::sync::CancellationToken,
    tower_http::{
        catch_panic::CatchPanicLayer,
        request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
        timeout::TimeoutLayer,
        trace::TraceLayer,
    },
};

/// Serves a [`Dispatcher`] over HTTP.
///
/// The dispatcher pipeline is synchronous, so every request runs on tokio's
/// blocking pool after its body has been buffered.
///
/// ```rust,no_run
/// use axum::response::IntoResponse;
/// use dispatch_kit::{Arguments, Composer, Config, Handler, HttpServer, Injector};
///
/// # async fn example() -> dispatch_kit::Result<()> {
/// let app = Composer::new().route(
///     "/health",
///     Handler::new(|_: &Arguments| Ok("ok".into_response())),
/// );
/// HttpServer::from_composer(&app, Config::default(), Injector::new())?
///     .start()
///     .await
/// # }
/// ```
pub struct HttpServer<R: Resolver = Injector> {
    dispatcher: Arc<Dispatcher<HttpHost, R>>,
    config: Config,
    shutdown_notifier: ShutdownNotifier,
}

impl<R: Resolver> HttpServer<R> {
    /// Wraps an already compiled dispatcher.
    pub fn new(dispatcher: Dispatcher<HttpHost, R>, config: Config) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            config,
            shutdown_notifier: ShutdownNotifier::default(),
        }
    }

    /// Validates `config`, then flattens and compiles `composer` with an
    /// [`HttpHost`] and a URL matcher configured by `config.routing`.
    pub fn from_composer(composer: &Composer<Response>, config: Config, resolver: R) -> Result<Self> {
        config.validate()?;
        let host = HttpHost::new(&config.http);
        let dispatcher = Dispatcher::compile_with_routing(
            composer.flatten(),
            host,
            resolver,
            config.routing.clone(),
        )?;
        Ok(Self::new(dispatcher, config))
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher<HttpHost, R>> {
        &self.dispatcher
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a handle for subscribing to shutdown phases.
    pub fn shutdown_notifier(&self) -> ShutdownNotifier {
        self.shutdown_notifier.clone()
    }

    /// Returns the token cancelled when shutdown starts.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown_notifier.cancellation_token()
    }

    /// Builds the axum router: the dispatcher as fallback plus the transport layers.
    ///
    /// From outermost to innermost: panic catching, request id assignment,
    /// tracing, request id propagation, then the request timeout if one is
    /// configured.
    pub fn into_router(&self) -> Router {
        let dispatcher = self.dispatcher.clone();
        let limit = usize::try_from(self.config.http.max_payload_size_bytes.as_u64())
            .unwrap_or(usize::MAX);

        let mut router = Router::new().fallback(move |request: Request<Body>| {
            let dispatcher = dispatcher.clone();
            async move { dispatch(dispatcher, request, limit).await }
        });

        if let Some(timeout) = self.config.http.request_timeout {
            router = router.layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                timeout,
            ));
        }

        let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);
        router
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                }),
            )
            .layer(SetRequestIdLayer::new(x_request_id, RequestIdGenerator))
            .layer(CatchPanicLayer::custom(
                |err: Box<dyn std::any::Any + Send + 'static>| {
                    let msg = if let Some(s) = err.downcast_ref::<String>() {
                        s.clone()
                    } else if let Some(s) = err.downcast_ref::<&str>() {
                        s.to_string()
                    } else {
                        "unknown panic payload".to_string()
                    };
                    tracing::error!("Service panicked: {}", msg);

                    Response::builder()
                        .status(StatusCode::INTERNAL_SERVER_ERROR)
                        .header(http::header::CONTENT_TYPE, "text/plain; charset=utf-8")
                        .body("Internal Server Error".to_string())
                        .unwrap_or_else(|_| Response::new("Internal Server Error".to_string()))
                },
            ))
    }

    /// Binds `bind_addr:bind_port` and serves until SIGINT or SIGTERM.
    ///
    /// After the signal, in-flight requests get `shutdown_timeout` to finish
    /// before [`ShutdownPhase::GracePeriodEnded`] is announced and the server
    /// returns anyway.
    pub async fn start(self) -> Result<()> {
        let bind_addr = self.config.http.full_bind_addr();
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        tracing::info!("Bound to {}", &bind_addr);
        tracing::info!(
            routes = self.dispatcher.route_count(),
            "Waiting for connections"
        );

        let router = self.into_router();
        let shutdown_timeout = self.config.http.shutdown_timeout;
        let shutdown_notifier = self.shutdown_notifier.clone();
        let mut shutdown_rx = shutdown_notifier.subscribe();

        let serve_future = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal(shutdown_timeout, shutdown_notifier.clone()));

        // The grace period only starts once shutdown has been initiated.
        tokio::select! {
            result = serve_future => {
                tracing::info!("Graceful shutdown completed");
                result?;
            }
            _ = async {
                loop {
                    match shutdown_rx.recv().await {
                        Ok(ShutdownPhase::Initiated) => break,
                        Ok(_) => continue,
                        Err(_) => return,
                    }
                }
                tokio::time::sleep(shutdown_timeout).await;
            } => {
                tracing::warn!("Graceful shutdown timeout expired, forcing shutdown");
                shutdown_notifier.emit(ShutdownPhase::GracePeriodEnded);
            }
        }

        Ok(())
    }
}

/// Buffers the body and runs the dispatcher on the blocking pool.
async fn dispatch<R: Resolver>(
    dispatcher: Arc<Dispatcher<HttpHost, R>>,
    request: Request<Body>,
    limit: usize,
) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, limit, "Request body rejected");
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(ErrorResponse::new(
                    "PAYLOAD_TOO_LARGE",
                    format!("Request body exceeds {limit} bytes"),
                )),
            )
                .into_response();
        }
    };
    let request = Request::from_parts(parts, bytes);

    let span = tracing::Span::current();
    let handled =
        tokio::task::spawn_blocking(move || span.in_scope(|| dispatcher.handle(request))).await;

    match handled {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => err.into_response(),
        Err(join_err) if join_err.is_panic() => std::panic::resume_unwind(join_err.into_panic()),
        Err(join_err) => Error::internal(format!("request task failed: {join_err}")).into_response(),
    }
}

impl<R: Resolver> fmt::Debug for HttpServer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpServer")
            .field("dispatcher", &self.dispatcher)
            .field("bind_addr", &self.config.http.full_bind_addr())
            .field("shutdown_notifier", &self.shutdown_notifier)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Arguments, Fault, Handler, Signature};
    use tower::ServiceExt;

    fn test_config() -> Config {
        Config::from_toml("").unwrap().with_max_payload_size_bytes(16)
    }

    fn echo_server() -> HttpServer {
        let app = Composer::new()
            .route_with(
                "/echo",
                [http::Method::POST],
                Handler::new(|args: &Arguments| {
                    let body = args.get::<axum::body::Bytes>("body")?;
                    Ok(body.clone().into_response())
                })
                .with_signature(Signature::from_keys(["body"])),
            )
            .route(
                "/panic",
                Handler::new(|_: &Arguments| -> std::result::Result<Response, Fault> {
                    panic!("handler exploded")
                }),
            );
        HttpServer::from_composer(&app, test_config(), Injector::new()).unwrap()
    }

    #[tokio::test]
    async fn test_body_is_buffered_and_passed_to_handler() {
        let router = echo_server().into_router();
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .body(Body::from("hello"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"hello");
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let router = echo_server().into_router();
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .body(Body::from("this body is longer than sixteen bytes"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_request_id_is_generated_and_propagated() {
        let router = echo_server().into_router();
        let response = router
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_500() {
        let router = echo_server().into_router();
        let response = router
            .oneshot(Request::builder().uri("/panic").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_from_composer_rejects_invalid_config() {
        let config = test_config().with_bind_port(0);
        let err = HttpServer::from_composer(&Composer::new(), config, Injector::new()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_cancellation_token_shared_with_notifier() {
        let server = echo_server();
        let token = server.cancellation_token();
        server.shutdown_notifier().emit(ShutdownPhase::Initiated);
        assert!(token.is_cancelled());
    }
}
