//! Composers: route tables arranged in a tree of URL prefixes.
//!
//! A [`Composer`] owns one [`RouteTable`] and any number of child composers
//! mounted under prefixes. Registration is fluent, so a composer reads like
//! the application it describes:
//!
//! ```rust
//! use dispatch_kit::{Arguments, Composer, Handler, Hook};
//!
//! let users: Composer<String> = Composer::new()
//!     .route("/", Handler::new(|_: &Arguments| Ok("all users".to_string())))
//!     .route("/{id}", Handler::new(|_: &Arguments| Ok("one user".to_string())));
//!
//! let app = Composer::new()
//!     .before_request(Hook::new(|_: &Arguments| Ok(())))
//!     .route("/", Handler::new(|_: &Arguments| Ok("home".to_string())))
//!     .mount("/users", users);
//!
//! let tables: Vec<_> = app.flatten().collect();
//! assert_eq!(tables.len(), 2);
//! assert_eq!(tables[0].prefix(), Some("/users"));
//! assert_eq!(tables[0].pre_hooks().len(), 1);
//! ```
//!
//! [`Composer::flatten`] turns the tree into the flat table sequence a
//! [`Dispatcher`] compiles: every child table carries its full prefix and
//! has inherited the hooks, error handlers and config of each composer
//! above it.

use {
    crate::{
        Dispatcher, ErrorClass, ErrorHandler, Handler, Hook, Host, MethodSet, PostHook, Resolver,
        Result, RouteTable, plan::normalize_prefix,
    },
    std::{fmt, iter},
};

/// A route table plus child composers mounted under prefixes.
pub struct Composer<T> {
    table: RouteTable<T>,
    children: Vec<(Option<String>, Composer<T>)>,
}

impl<T> Composer<T> {
    pub fn new() -> Self {
        Self {
            table: RouteTable::new(),
            children: Vec::new(),
        }
    }

    /// Creates a composer whose table starts with `config`.
    pub fn with_config(config: toml::Table) -> Self {
        let mut composer = Self::new();
        *composer.table.config_mut() = config;
        composer
    }

    /// Creates a composer whose table config is parsed from TOML.
    pub fn with_config_toml(toml_str: &str) -> Result<Self> {
        let config: toml::Table = toml::from_str(toml_str)?;
        Ok(Self::with_config(config))
    }

    /// Creates a pure aggregator of other composers.
    pub fn crew<'a, I>(members: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Composer<T>)>,
    {
        members
            .into_iter()
            .fold(Self::new(), |crew, (prefix, member)| crew.mount(prefix, member))
    }

    /// Registers a `GET` route.
    #[must_use]
    pub fn route(mut self, pattern: impl Into<String>, handler: Handler<T>) -> Self {
        self.table.add_get_route(pattern, handler);
        self
    }

    #[must_use]
    pub fn route_with(
        mut self,
        pattern: impl Into<String>,
        methods: impl Into<MethodSet>,
        handler: Handler<T>,
    ) -> Self {
        self.table.add_route(pattern, handler, methods);
        self
    }

    #[must_use]
    pub fn before_request(mut self, hook: Hook) -> Self {
        self.table.add_pre_hook(hook);
        self
    }

    #[must_use]
    pub fn before_first_request(mut self, hook: Hook) -> Self {
        self.table.add_first_hook(hook);
        self
    }

    #[must_use]
    pub fn after_request(mut self, hook: PostHook<T>) -> Self {
        self.table.add_post_hook(hook);
        self
    }

    #[must_use]
    pub fn errorhandler(mut self, class: &'static ErrorClass, handler: ErrorHandler<T>) -> Self {
        self.table.add_error_handler(class, handler);
        self
    }

    #[must_use]
    pub fn config_value(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.table.set_config(key, value);
        self
    }

    /// Mounts `child` under `prefix`. A lone `/` mounts it at the root.
    #[must_use]
    pub fn mount(mut self, prefix: &str, child: Composer<T>) -> Self {
        self.children.push((normalize_prefix(prefix), child));
        self
    }

    pub fn table(&self) -> &RouteTable<T> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut RouteTable<T> {
        &mut self.table
    }

    pub fn children(&self) -> impl Iterator<Item = (Option<&str>, &Composer<T>)> {
        self.children
            .iter()
            .map(|(prefix, child)| (prefix.as_deref(), child))
    }

    /// Yields every child's tables, then this composer's own table.
    ///
    /// Child tables are stamped with the mount prefix and inherit this
    /// composer's hooks, error handlers and config (but not its routes).
    /// The result is lazy and holds `1 + sum(child counts)` tables.
    pub fn flatten(&self) -> Box<dyn Iterator<Item = RouteTable<T>> + '_> {
        let children = self.children.iter().flat_map(move |(prefix, child)| {
            child.flatten().map(move |mut table| {
                table.mount_under(prefix.as_deref());
                table.inherit_from(&self.table);
                table
            })
        });
        Box::new(children.chain(iter::once_with(move || self.table.copy())))
    }

    /// Flattens the tree and hands the tables to `factory`.
    pub fn build_with<F, A>(&self, factory: F) -> A
    where
        F: FnOnce(Vec<RouteTable<T>>) -> A,
    {
        factory(self.flatten().collect())
    }

    /// Flattens the tree and compiles it into a [`Dispatcher`].
    pub fn compile<H, R>(&self, host: H, resolver: R) -> Result<Dispatcher<H, R>>
    where
        H: Host<Output = T>,
        R: Resolver,
    {
        self.build_with(|tables| Dispatcher::compile(tables, host, resolver))
    }
}

impl<T> Default for Composer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Composer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composer")
            .field("table", &self.table)
            .field("children", &self.children)
            .finish()
    }
}
