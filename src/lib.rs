//! # dispatch-kit
//!
//! Composable route tables, hook pipelines and typed error recovery for
//! request dispatch.
//!
//! An application is declared as a tree of [`Composer`]s. Each composer owns a
//! [`RouteTable`] (routes, hooks, error handlers and free-form config) and may
//! mount child composers under URL prefixes. Flattening the tree yields one
//! table per composer, with every child table inheriting the hooks, error
//! handlers and config of the composers above it. A [`Dispatcher`] compiles
//! those tables once and then serves requests concurrently through a fixed
//! pipeline, handing every outcome to a transport-specific [`Host`].
//!
//! # Quick Start
//!
//! ```rust
//! use dispatch_kit::{
//!     Arguments, Composer, Fault, Handler, Hook, Signature, VALUE_ERROR,
//!     ErrorHandler,
//! };
//!
//! let users: Composer<String> = Composer::new()
//!     .route(
//!         "/{id}",
//!         Handler::new(|args: &Arguments| {
//!             let id = args.get::<String>("id")?;
//!             match id.parse::<u32>() {
//!                 Ok(n) => Ok(format!("user #{n}")),
//!                 Err(_) => Err(Fault::value(format!("`{id}` is not a user id"))),
//!             }
//!         })
//!         .with_signature(Signature::new().param("id", "path_args:id")),
//!     )
//!     .errorhandler(
//!         &VALUE_ERROR,
//!         ErrorHandler::new(|_: &Arguments, fault: &Fault| Ok(format!("bad request: {fault}"))),
//!     );
//!
//! let app = Composer::new()
//!     .before_request(Hook::new(|_: &Arguments| Ok(())))
//!     .mount("/users", users);
//!
//! let tables: Vec<_> = app.flatten().collect();
//! assert_eq!(tables.len(), 2);
//! assert_eq!(tables[0].prefix(), Some("/users"));
//! ```
//!
//! To serve the same tree over HTTP, use handlers returning
//! `axum::response::Response` and hand the composer to [`HttpServer`]:
//!
//! ```rust,no_run
//! use axum::response::IntoResponse;
//! use dispatch_kit::{Arguments, Composer, Config, Handler, HttpServer, Injector, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::default();  // Loads from config/{RUST_ENV}.toml
//!     config.setup_tracing();
//!
//!     let app = Composer::new()
//!         .route("/", Handler::new(|_: &Arguments| Ok("Hello, World!".into_response())));
//!
//!     HttpServer::from_composer(&app, config, Injector::new())?
//!         .start()
//!         .await
//! }
//! ```
//!
//! # Request Pipeline
//!
//! For every request the [`Dispatcher`]:
//!
//! 1. opens a request scope and lets the host prepare the request
//! 2. matches the path; not found, method not allowed and trailing-slash
//!    redirects go to [`Host::build_recovered`]
//! 3. runs the owning table's first hooks (once), then its pre hooks
//! 4. calls the handler with arguments resolved from the scope
//! 5. runs the post hooks with the handler's output
//!
//! A [`Fault`] raised in steps 3 to 5 goes to the first error handler of the
//! owning table whose [`ErrorClass`] the fault derives from. Without one, the
//! fault reaches [`Host::build_unhandled`] unchanged.
//!
//! # Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | `plan` | [`RouteTable`], [`MethodSet`] and the callable types |
//! | `compose` | [`Composer`] trees and flattening |
//! | `dispatch` | [`Dispatcher`], [`Host`], [`PathRouter`] |
//! | `resolve` | [`Scope`], [`Resolver`], [`Injector`] |
//! | `fault` | [`Fault`] and the [`ErrorClass`] hierarchy |
//! | `serve` | [`HttpHost`], [`HttpServer`], graceful shutdown |
//! | `config` | Configuration loading and validation ([`Config`]) |
//! | `error` | Framework errors ([`Error`]) |
//!
//! # Error Handling
//!
//! Framework failures (configuration, route conflicts, a pipeline that
//! produced no response) are [`Error`]s with an [`ErrorKind`]. Over HTTP they
//! convert to structured JSON responses:
//!
//! ```json
//! {
//!   "error_code": "EMPTY_RESPONSE",
//!   "message": "request pipeline produced no response"
//! }
//! ```
mod compose;
mod config;
mod dispatch;
mod error;
mod fault;
mod plan;
mod resolve;
mod serve;
mod utils;

pub use compose::*;
pub use config::*;
pub use dispatch::*;
pub use error::*;
pub use fault::*;
pub use plan::*;
pub use resolve::*;
pub use serve::*;
pub use utils::*;

pub type Result<T> = std::result::Result<T, Error>;
