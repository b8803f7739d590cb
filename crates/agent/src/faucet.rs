//! Best-effort faucet funding for test networks.

use async_trait::async_trait;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum FaucetError {
    #[error("faucet request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("faucet returned HTTP status {0}")]
    Status(reqwest::StatusCode),
}

#[async_trait]
pub trait FaucetApi: Send + Sync {
    /// Asks the faucet to credit `address`. Best-effort: callers log
    /// failures and move on, a later cycle re-checks the balance.
    async fn request_funds(&self, address: &str) -> Result<(), FaucetError>;
}

/// Form-encoded POST against the faucet's tap endpoint.
pub struct HttpFaucet {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpFaucet {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl FaucetApi for HttpFaucet {
    async fn request_funds(&self, address: &str) -> Result<(), FaucetError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .form(&[("address", address)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FaucetError::Status(response.status()));
        }
        Ok(())
    }
}
