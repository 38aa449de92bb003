//! Outbound HTTP seam for revalidation calls.

use async_trait::async_trait;
use url::Url;

use super::error::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    /// Only a plain 200 counts as a confirmed revalidation.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

#[async_trait]
pub trait RevalidationTransport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<TransportResponse, TransportError>;
}
