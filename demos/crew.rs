//! Crew Example
//!
//! Two composers mounted at the root of a crew, with injected values, hooks
//! on every level and an error route.
//!
//! Run with:
//! ```bash
//! RUST_LOG=info cargo run --example crew
//! ```
//!
//! Then test:
//! ```bash
//! curl http://localhost:3000/
//! curl http://localhost:3000/other/
//! curl http://localhost:3000/foo/
//! curl http://localhost:3000/error/
//! ```
//!
//! Member tables are compiled before the crew's own table, so `/foo/` is
//! answered by the first member even though the crew registers it too.

use axum::response::{IntoResponse, Response};
use dispatch_kit::{
    Arguments, Composer, Config, Fault, Handler, Hook, HttpServer, Injector, Result, Signature,
};

fn text(body: &'static str) -> Handler<Response> {
    Handler::new(move |_: &Arguments| Ok(body.into_response()))
}

fn announce(label: &'static str) -> Hook {
    Hook::new(move |_: &Arguments| {
        tracing::info!("{label}");
        Ok(())
    })
    .named(label)
}

fn greeting_pair() -> Handler<Response> {
    Handler::new(|args: &Arguments| {
        let hello = args.get::<String>("hello")?;
        let eggs = args.get::<&'static str>("eggs")?;
        Ok(format!("({hello:?}, {eggs:?})").into_response())
    })
}

fn injector() -> Injector {
    Injector::new()
        .provider("hello", |_, name| {
            Ok(format!("Hello, {}!", name.unwrap_or("world")))
        })
        .factory("eggs", || "eggs!")
}

#[tokio::main]
async fn main() -> Result<()> {
    let config: Config = r#"
[http]
bind_addr = "127.0.0.1"
bind_port = 3000
expose_error_details = true

[logging]
format = "compact"
    "#
    .parse()?;
    config.setup_tracing();

    let builder = Composer::new()
        .route(
            "/",
            greeting_pair().with_signature(Signature::from_keys(["hello", "eggs"])),
        )
        .before_request(announce("builder.before_request"))
        .route("/foo/", text("This is not the foo you're looking for."));

    let other = Composer::new()
        .route(
            "/other/",
            greeting_pair().with_signature(
                Signature::new()
                    .param("hello", "hello:thing")
                    .param("eggs", "eggs"),
            ),
        )
        .before_request(announce("other.before_request"))
        .route(
            "/error/",
            Handler::new(|_: &Arguments| Err(Fault::runtime("Nope."))),
        );

    let crew = Composer::crew([("/", builder), ("/", other)])
        .route("/foo/", text("This is the right foo."))
        .before_request(announce("crew.before_request"));

    HttpServer::from_composer(&crew, config, injector())?
        .start()
        .await
}
