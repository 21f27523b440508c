//! Benchmarks for measuring dispatch overhead.
//!
//! These benchmarks measure the cost of the request pipeline itself (matching,
//! hooks, argument resolution) and of the HTTP transport wrapped around it.

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use dispatch_kit::{
    Arguments, Composer, Config, Dispatcher, Fault, Handler, Hook, Host, HttpServer, Injector,
    Prepared, Recovered, Scope, Signature,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use http::Method;
use std::hint::black_box;
use tower::ServiceExt;

/// Host that hands back whatever the pipeline produced.
struct BenchHost;

impl Host for BenchHost {
    type Request = &'static str;
    type Output = String;
    type Response = String;

    fn prepare_request<S: Scope>(&self, path: &'static str, _: &mut S) -> Result<Prepared, Fault> {
        Ok(Prepared::new("", path, Method::GET))
    }

    fn build_success(&self, output: String) -> Option<String> {
        Some(output)
    }

    fn build_recovered(&self, recovered: Recovered<String>) -> Option<String> {
        match recovered {
            Recovered::Handled(output) => Some(output),
            Recovered::Routing(signal) => Some(signal.to_string()),
        }
    }

    fn build_unhandled(&self, fault: Fault) -> Option<String> {
        Some(fault.to_string())
    }
}

fn text(body: &'static str) -> Handler<String> {
    Handler::new(move |_: &Arguments| Ok(body.to_string()))
}

/// An application with `hooks` pre hooks and a few static and dynamic routes.
fn app(hooks: usize) -> Composer<String> {
    let users = Composer::new()
        .route("/", text("users"))
        .route(
            "/{id}",
            Handler::new(|args: &Arguments| Ok(args.get::<String>("id")?.clone()))
                .with_signature(Signature::new().param("id", "path_args:id")),
        );

    (0..hooks).fold(
        Composer::new().route("/", text("home")).mount("/users", users),
        |app, _| app.before_request(Hook::new(|_: &Arguments| Ok(()))),
    )
}

fn dispatcher(hooks: usize) -> Dispatcher<BenchHost> {
    app(hooks).compile(BenchHost, Injector::new()).unwrap()
}

/// Benchmark: pipeline for static, parameterized and unknown paths
fn bench_pipeline(c: &mut Criterion) {
    let dispatcher = dispatcher(0);
    let mut group = c.benchmark_group("pipeline");

    for (name, path) in [
        ("static", "/"),
        ("path_args", "/users/42"),
        ("not_found", "/missing"),
        ("redirect", "/users"),
    ] {
        group.bench_with_input(BenchmarkId::new("handle", name), &path, |b, path| {
            b.iter(|| black_box(dispatcher.handle(black_box(*path)).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark: cost of additional pre hooks
fn bench_hook_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("hook_scaling");

    for hooks in [0, 1, 5, 20] {
        let dispatcher = dispatcher(hooks);
        group.bench_with_input(BenchmarkId::new("hooks", hooks), &dispatcher, |b, dispatcher| {
            b.iter(|| black_box(dispatcher.handle("/users/42").unwrap()))
        });
    }

    group.finish();
}

/// Benchmark: full HTTP transport via oneshot
fn bench_http_transport(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let app: Composer<Response> = Composer::new().route(
        "/",
        Handler::new(|_: &Arguments| Ok("OK".into_response())),
    );
    let config = Config::from_toml("").unwrap();
    let router = HttpServer::from_composer(&app, config, Injector::new())
        .unwrap()
        .into_router();

    c.bench_function("http_transport", |b| {
        b.to_async(&rt).iter(|| async {
            let request = Request::builder()
                .method("GET")
                .uri("/")
                .body(Body::empty())
                .unwrap();
            let response = router.clone().oneshot(request).await.unwrap();
            black_box(response)
        })
    });
}

criterion_group!(
    benches,
    bench_pipeline,
    bench_hook_scaling,
    bench_http_transport,
);

criterion_main!(benches);
