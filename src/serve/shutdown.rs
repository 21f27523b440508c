//! Shutdown notification for [`HttpServer`](crate::HttpServer).
//!
//! Two complementary handles are offered:
//!
//! - **[`CancellationToken`]**: cancelled as soon as shutdown starts. Enough for
//!   background tasks that only need to stop.
//! - **[`ShutdownNotifier::subscribe`]**: a broadcast of every [`ShutdownPhase`],
//!   for components that clean up differently per phase.
//!
//! ```text
//! SIGTERM / SIGINT
//!     │
//!     ├─> Initiated            token cancelled, listener closed
//!     ├─> GracePeriodStarted   in-flight requests draining
//!     └─> GracePeriodEnded     timeout expired, shutdown forced
//! ```
//!
//! ```rust,no_run
//! use dispatch_kit::{Composer, Config, HttpServer, Injector, ShutdownPhase};
//!
//! # async fn example() -> dispatch_kit::Result<()> {
//! let server = HttpServer::from_composer(&Composer::new(), Config::default(), Injector::new())?;
//! let mut shutdown_rx = server.shutdown_notifier().subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(phase) = shutdown_rx.recv().await {
//!         if let ShutdownPhase::GracePeriodStarted { timeout } = phase {
//!             tracing::info!("{}s left to finish work", timeout.as_secs());
//!         }
//!     }
//! });
//! server.start().await
//! # }
//! ```

use {
    std::time::Duration,
    tokio::{signal, sync::broadcast},
    tokio_util::sync::CancellationToken,
};

/// The phases of a graceful shutdown, emitted in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShutdownPhase {
    /// SIGTERM or SIGINT received. The cancellation token is cancelled and
    /// no new connections are accepted.
    Initiated,

    /// In-flight requests are draining for at most `timeout`.
    GracePeriodStarted {
        /// The configured shutdown timeout duration.
        timeout: Duration,
    },

    /// The grace period expired before all requests finished.
    GracePeriodEnded,
}

/// Broadcasts [`ShutdownPhase`]s and owns the shutdown [`CancellationToken`].
///
/// Clones share the same channel and token.
#[derive(Clone)]
pub struct ShutdownNotifier {
    sender: broadcast::Sender<ShutdownPhase>,
    cancel_token: CancellationToken,
}

impl ShutdownNotifier {
    /// Creates a notifier buffering up to `capacity` unread phases per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Subscribes to phases emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownPhase> {
        self.sender.subscribe()
    }

    /// Returns the token cancelled on [`ShutdownPhase::Initiated`].
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    #[must_use]
    pub fn is_shutdown_initiated(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Emits `phase` and returns how many subscribers received it.
    pub(crate) fn emit(&self, phase: ShutdownPhase) -> usize {
        if phase == ShutdownPhase::Initiated {
            self.cancel_token.cancel();
        }
        self.sender.send(phase).unwrap_or(0)
    }
}

impl Default for ShutdownNotifier {
    fn default() -> Self {
        Self::new(16)
    }
}

impl std::fmt::Debug for ShutdownNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownNotifier")
            .field("subscriber_count", &self.sender.receiver_count())
            .field("is_shutdown_initiated", &self.is_shutdown_initiated())
            .finish()
    }
}

/// Resolves once SIGINT or SIGTERM arrives, after announcing the first two
/// shutdown phases. The grace period itself is enforced by the caller.
pub(crate) async fn shutdown_signal(timeout: Duration, notifier: ShutdownNotifier) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => tracing::debug!("Ctrl+C signal received"),
            Err(err) => {
                tracing::warn!("Failed to install Ctrl+C handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal_handler) => {
                signal_handler.recv().await;
                tracing::debug!("SIGTERM signal received");
            }
            Err(err) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!(
        "Shutdown signal received, starting graceful shutdown (timeout: {}s)",
        timeout.as_secs()
    );
    let subscriber_count = notifier.emit(ShutdownPhase::Initiated);
    tracing::debug!(
        "Shutdown initiated notification sent to {} subscriber(s)",
        subscriber_count
    );
    notifier.emit(ShutdownPhase::GracePeriodStarted { timeout });
}
