use {crate::Result, serde::Deserialize};

///
/// URL matching behaviour of the default [`PathRouter`](crate::PathRouter).
///
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// When a path without a trailing slash matches nothing but the same path
    /// with one does, answer with a redirect to the slashed path.
    /// Defaults to true.
    #[serde(default = "RoutingConfig::default_true")]
    pub redirect_trailing_slash: bool,

    /// Routes accepting GET also accept HEAD. Defaults to true.
    #[serde(default = "RoutingConfig::default_true")]
    pub implicit_head: bool,
}

impl RoutingConfig {
    fn default_true() -> bool {
        true
    }

    pub fn with_redirect_trailing_slash(mut self, enable: bool) -> Self {
        self.redirect_trailing_slash = enable;
        self
    }

    pub fn with_implicit_head(mut self, enable: bool) -> Self {
        self.implicit_head = enable;
        self
    }

    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        RoutingConfig {
            redirect_trailing_slash: true,
            implicit_head: true,
        }
    }
}
