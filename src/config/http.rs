use {crate::Result, serde::Deserialize, std::time::Duration};

///
/// Configuration for the HTTP transport.
///
/// These settings only matter when a dispatcher is served through
/// [`HttpServer`](crate::HttpServer); the dispatcher itself never reads them.
///
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// IP address to bind the HTTP server to
    /// The default `bind_addr` is "127.0.0.1".
    #[serde(default = "HttpConfig::default_bind_addr")]
    pub bind_addr: String,

    /// Port to bind the HTTP server to
    /// The default `bind_port` is 3000.
    #[serde(default = "HttpConfig::default_bind_port")]
    pub bind_port: u16,

    /// Maximum payload size in bytes for incoming HTTP requests.
    /// Requests with larger bodies are rejected with 413 Payload Too Large
    /// before they reach the dispatcher. Defaults to 32KiB.
    #[serde(default = "HttpConfig::default_max_payload_size_bytes")]
    pub max_payload_size_bytes: byte_unit::Byte,

    /// Maximum allowed time for a request to complete. Slower requests are
    /// answered with 408 Request Timeout. By default `request_timeout` is None.
    #[serde(default, with = "humantime_serde")]
    pub request_timeout: Option<Duration>,

    /// Maximum time to wait for in-flight requests during graceful shutdown.
    /// By default `shutdown_timeout` is set to 30 seconds.
    #[serde(
        default = "HttpConfig::default_shutdown_timeout",
        with = "humantime_serde"
    )]
    pub shutdown_timeout: Duration,

    /// Whether 500 responses for unhandled faults carry the fault message in
    /// their `details` field. Off by default.
    #[serde(default)]
    pub expose_error_details: bool,
}

impl HttpConfig {
    ///
    /// Returns the full bind address as a string in the format "IP:PORT".
    ///
    pub fn full_bind_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.bind_port)
    }

    fn default_bind_addr() -> String {
        "127.0.0.1".into()
    }

    fn default_bind_port() -> u16 {
        3000
    }

    fn default_max_payload_size_bytes() -> byte_unit::Byte {
        byte_unit::Byte::from_u64(32 * 1024)
    }

    fn default_shutdown_timeout() -> Duration {
        Duration::from_secs(30)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bind_addr.trim().is_empty() {
            return Err(crate::Error::invalid_input(
                "HTTP bind_addr is required. Set [http] bind_addr = \"0.0.0.0\" or \"127.0.0.1\" in config.",
            ));
        }

        if self.bind_addr.parse::<std::net::IpAddr>().is_err() {
            return Err(crate::Error::invalid_input(
                "HTTP bind_addr must be a valid IP address. Examples: \"127.0.0.1\", \"0.0.0.0\", \"::1\"",
            ));
        }

        if self.bind_port == 0 {
            return Err(crate::Error::invalid_input(
                "HTTP bind_port must be > 0. Set [http] bind_port = 3000 in config.",
            ));
        }

        if self.max_payload_size_bytes.as_u64() == 0 {
            return Err(crate::Error::invalid_input(
                "HTTP max_payload_size_bytes must be > 0. Set [http] max_payload_size_bytes = \"32KiB\" in config.",
            ));
        }

        Ok(())
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            bind_addr: Self::default_bind_addr(),
            bind_port: Self::default_bind_port(),
            max_payload_size_bytes: Self::default_max_payload_size_bytes(),
            request_timeout: None,
            shutdown_timeout: Self::default_shutdown_timeout(),
            expose_error_details: false,
        }
    }
}
