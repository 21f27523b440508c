//! Faults raised by application code and the class hierarchy used to recover them.
//!
//! A [`Fault`] pairs an [`ErrorClass`] with the original error value, the
//! same way [`Error`](crate::Error) pairs an `ErrorKind` with its source. Error
//! classes form a single-inheritance tree declared as `static`s, and error
//! handlers are matched with [`ErrorClass::is_a`], so a handler registered for
//! a class also recovers every class derived from it.
//!
//! ```rust
//! use dispatch_kit::{ErrorClass, Fault, ERROR};
//!
//! static STORAGE: ErrorClass = ErrorClass::new("StorageError", &ERROR);
//! static TIMEOUT: ErrorClass = ErrorClass::new("StorageTimeout", &STORAGE);
//!
//! let fault = Fault::new(&TIMEOUT, "replica did not answer");
//! assert!(fault.is_a(&STORAGE));
//! assert!(fault.is_a(&ERROR));
//! assert!(!STORAGE.is_a(&TIMEOUT));
//! ```

use crate::{MethodSet, RoutingSignal};
use std::backtrace::Backtrace;
use std::fmt;

/// A named node in the fault class hierarchy.
///
/// Classes compare by name and ancestry, so two declarations with the same
/// name under the same parent are the same class.
#[derive(Debug, PartialEq, Eq)]
pub struct ErrorClass {
    name: &'static str,
    parent: Option<&'static ErrorClass>,
}

impl ErrorClass {
    /// Declares a root class with no parent.
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// Declares a class derived from `parent`.
    pub const fn new(name: &'static str, parent: &'static ErrorClass) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static ErrorClass> {
        self.parent
    }

    /// Returns `true` if `self` is `other` or derives from it.
    pub fn is_a(&self, other: &ErrorClass) -> bool {
        self.lineage().any(|class| class == other)
    }

    /// Iterates over `self` followed by each ancestor up to the root.
    pub fn lineage(&self) -> impl Iterator<Item = &ErrorClass> {
        std::iter::successors(Some(self), |class| class.parent.map(|p| p as &ErrorClass))
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Root of every fault class.
pub static ERROR: ErrorClass = ErrorClass::root("Error");

/// Generic failure raised while serving a request.
pub static RUNTIME_ERROR: ErrorClass = ErrorClass::new("RuntimeError", &ERROR);

/// A value had the right type but an unusable content.
pub static VALUE_ERROR: ErrorClass = ErrorClass::new("ValueError", &ERROR);

/// A callable asked for a parameter the request scope could not supply.
pub static RESOLUTION_ERROR: ErrorClass = ErrorClass::new("ResolutionError", &ERROR);

/// Base of the faults that stand for a routing outcome rather than a failure.
///
/// Faults of these classes carry a [`RoutingSignal`]. Error handlers get the
/// first chance to claim them; unclaimed ones are answered like the matcher's
/// own signals, through [`Host::build_recovered`](crate::Host::build_recovered).
pub static APPLICATION_EXCEPTION: ErrorClass = ErrorClass::new("ApplicationException", &ERROR);

/// Raised by application code to answer "not found".
pub static NOT_FOUND: ErrorClass = ErrorClass::new("NotFound", &APPLICATION_EXCEPTION);

/// Raised by application code to answer "method not allowed".
pub static METHOD_NOT_ALLOWED: ErrorClass =
    ErrorClass::new("MethodNotAllowed", &APPLICATION_EXCEPTION);

/// Raised by application code to redirect the request elsewhere.
pub static REDIRECT: ErrorClass = ErrorClass::new("Redirect", &APPLICATION_EXCEPTION);

/// An error raised by a handler, hook, provider or request preparation.
///
/// The fault keeps the original error value and the backtrace captured where
/// it was created (subject to `RUST_BACKTRACE`). The dispatcher moves faults
/// around but never rebuilds them, so the value reaching an error handler or
/// the unhandled-error builder is the one that was raised.
pub struct Fault {
    class: &'static ErrorClass,
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
    backtrace: Backtrace,
}

impl Fault {
    /// Creates a fault of the given class from any error or message.
    pub fn new<E>(class: &'static ErrorClass, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            class,
            source: error.into(),
            backtrace: Backtrace::capture(),
        }
    }

    /// Creates a [`RUNTIME_ERROR`] fault.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::new(&RUNTIME_ERROR, msg.into())
    }

    /// Creates a [`VALUE_ERROR`] fault.
    pub fn value(msg: impl Into<String>) -> Self {
        Self::new(&VALUE_ERROR, msg.into())
    }

    /// Creates a [`RESOLUTION_ERROR`] fault.
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::new(&RESOLUTION_ERROR, msg.into())
    }

    /// Creates a [`NOT_FOUND`] fault.
    pub fn not_found() -> Self {
        Self::routing(RoutingSignal::NotFound)
    }

    /// Creates a [`METHOD_NOT_ALLOWED`] fault listing the accepted methods.
    pub fn method_not_allowed(allowed: impl Into<MethodSet>) -> Self {
        Self::routing(RoutingSignal::MethodNotAllowed {
            allowed: allowed.into(),
        })
    }

    /// Creates a [`REDIRECT`] fault.
    ///
    /// A location starting with `/` is made absolute against the request's
    /// root URL before it reaches the host.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::routing(RoutingSignal::Redirect {
            location: location.into(),
        })
    }

    /// Wraps `signal` in the [`APPLICATION_EXCEPTION`] subclass matching it.
    pub fn routing(signal: RoutingSignal) -> Self {
        let class = match &signal {
            RoutingSignal::NotFound => &NOT_FOUND,
            RoutingSignal::MethodNotAllowed { .. } => &METHOD_NOT_ALLOWED,
            RoutingSignal::Redirect { .. } => &REDIRECT,
        };
        Self::new(class, signal)
    }

    /// The routing outcome carried by an [`APPLICATION_EXCEPTION`] fault.
    pub fn routing_signal(&self) -> Option<&RoutingSignal> {
        if self.is_a(&APPLICATION_EXCEPTION) {
            self.downcast_ref::<RoutingSignal>()
        } else {
            None
        }
    }

    pub fn class(&self) -> &'static ErrorClass {
        self.class
    }

    /// Returns `true` if this fault's class is `class` or derives from it.
    pub fn is_a(&self, class: &ErrorClass) -> bool {
        self.class.is_a(class)
    }

    /// Returns the original error if it has type `E`.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.downcast_ref::<E>()
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Consumes the fault and returns the original error.
    pub fn into_inner(self) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self.source
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("class", &self.class.name)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}
