use std::sync::OnceLock;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::RemoteInvoker;
use crate::error::Result;

/// Install the process-wide rustls crypto provider once.
///
/// reqwest is built without a default provider, so one must be in place before
/// the first client is constructed.
pub(crate) fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// [`RemoteInvoker`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpInvoker {
    client: reqwest::Client,
}

impl HttpInvoker {
    /// Build an invoker with a default client.
    pub fn new() -> Result<Self> {
        install_rustls_provider();
        let client = reqwest::Client::builder()
            .user_agent(concat!("wx-component/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Use a caller-configured client (timeouts, proxies, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteInvoker for HttpInvoker {
    async fn call(&self, url: &str, body: &serde_json::Value) -> Result<Bytes> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?)
    }
}
