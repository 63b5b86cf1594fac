use std::sync::OnceLock;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use crate::TransferError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Size of the buffer each body read lands in.
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Configurable options for a file transfer
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Overall timeout for one HTTP transfer, independent of `read_timeout`
    pub request_timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Maximum time a single body read may take before the attempt fails
    pub read_timeout: Duration,

    /// Size of the read buffer
    pub buffer_size: usize,

    /// Files whose declared size meets or exceeds this are refused. `None` disables the cap.
    pub max_file_size: Option<u64>,

    /// User agent string
    pub user_agent: String,

    /// Extra headers sent with every transfer request
    pub headers: HeaderMap,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(24 * 60 * 60),
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_file_size: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: HeaderMap::new(),
        }
    }
}

impl TransferConfig {
    /// Set the size cap; `0` means unlimited.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = (bytes > 0).then_some(bytes);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Add a header that media CDNs insist on, e.g. `Referer`.
    pub fn with_header(mut self, name: &'static str, value: &str) -> Result<Self, TransferError> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransferError::configuration(format!("header {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

/// Install the process-wide rustls crypto provider once.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Create a reqwest Client for raw media transfers
pub fn create_client(config: &TransferConfig) -> Result<Client, TransferError> {
    install_rustls_provider();

    let mut builder = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .redirect(reqwest::redirect::Policy::limited(10));

    if !config.request_timeout.is_zero() {
        builder = builder.timeout(config.request_timeout);
    }

    if !config.connect_timeout.is_zero() {
        builder = builder.connect_timeout(config.connect_timeout);
    }

    builder.build().map_err(TransferError::from)
}
