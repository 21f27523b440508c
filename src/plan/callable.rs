//! Registered callables: handlers, hooks and error handlers.
//!
//! Every callable carries a name (the function's type name unless renamed)
//! and an optional [`Signature`]. A callable with a signature receives its
//! arguments from the request scope; one without is invoked with empty
//! [`Arguments`]. Callables are cheap to clone and clones share the same
//! function.

use {
    crate::{Arguments, Fault, Signature},
    std::{any::type_name, fmt, sync::Arc},
};

type HandlerFn<T> = dyn Fn(&Arguments) -> Result<T, Fault> + Send + Sync;
type PostHookFn<T> = dyn Fn(&Arguments, &T) -> Result<(), Fault> + Send + Sync;
type ErrorHandlerFn<T> = dyn Fn(&Arguments, &Fault) -> Result<T, Fault> + Send + Sync;

/// A route handler producing the host's output type.
pub struct Handler<T> {
    name: Arc<str>,
    signature: Option<Signature>,
    func: Arc<HandlerFn<T>>,
}

/// A pre-request or first-request hook.
pub type Hook = Handler<()>;

/// A post-request hook observing the handler's output.
pub struct PostHook<T> {
    name: Arc<str>,
    signature: Option<Signature>,
    func: Arc<PostHookFn<T>>,
}

/// Recovers a fault into a value of the host's output type.
pub struct ErrorHandler<T> {
    name: Arc<str>,
    signature: Option<Signature>,
    func: Arc<ErrorHandlerFn<T>>,
}

impl<T> Handler<T> {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Arguments) -> Result<T, Fault> + Send + Sync + 'static,
    {
        Self {
            name: type_name::<F>().into(),
            signature: None,
            func: Arc::new(func),
        }
    }

    pub fn call(&self, args: &Arguments) -> Result<T, Fault> {
        (self.func)(args)
    }
}

impl<T> PostHook<T> {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Arguments, &T) -> Result<(), Fault> + Send + Sync + 'static,
    {
        Self {
            name: type_name::<F>().into(),
            signature: None,
            func: Arc::new(func),
        }
    }

    pub fn call(&self, args: &Arguments, output: &T) -> Result<(), Fault> {
        (self.func)(args, output)
    }
}

impl<T> ErrorHandler<T> {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Arguments, &Fault) -> Result<T, Fault> + Send + Sync + 'static,
    {
        Self {
            name: type_name::<F>().into(),
            signature: None,
            func: Arc::new(func),
        }
    }

    pub fn call(&self, args: &Arguments, fault: &Fault) -> Result<T, Fault> {
        (self.func)(args, fault)
    }
}

macro_rules! callable_common {
    ($callable:ident) => {
        impl<T> $callable<T> {
            /// Replaces the default (type-derived) name.
            #[must_use]
            pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
                self.name = name.into();
                self
            }

            /// Declares the parameters to resolve from the request scope.
            #[must_use]
            pub fn with_signature(mut self, signature: Signature) -> Self {
                self.signature = Some(signature);
                self
            }

            pub fn name(&self) -> &str {
                &self.name
            }

            pub fn signature(&self) -> Option<&Signature> {
                self.signature.as_ref()
            }

            /// Returns `true` if both values wrap the same function.
            pub fn same_as(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.func, &other.func)
            }
        }

        impl<T> Clone for $callable<T> {
            fn clone(&self) -> Self {
                Self {
                    name: self.name.clone(),
                    signature: self.signature.clone(),
                    func: self.func.clone(),
                }
            }
        }

        impl<T> fmt::Debug for $callable<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($callable))
                    .field("name", &self.name)
                    .field("signature", &self.signature)
                    .finish()
            }
        }
    };
}

callable_common!(Handler);
callable_common!(PostHook);
callable_common!(ErrorHandler);
