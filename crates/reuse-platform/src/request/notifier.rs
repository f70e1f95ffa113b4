//! Outbound hook fired after a request is persisted.

use async_trait::async_trait;
use tracing::info;

use crate::shared::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct RequestCreatedNotice {
    pub request_id: i64,
    pub requester_email: String,
    /// Present when the request references an item
    pub owner_email: Option<String>,
    pub item_title: Option<String>,
}

#[async_trait]
pub trait RequestNotifier: Send + Sync {
    async fn request_created(&self, notice: &RequestCreatedNotice) -> Result<()>;
}

/// Writes one structured log event per notice.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl RequestNotifier for LogNotifier {
    async fn request_created(&self, notice: &RequestCreatedNotice) -> Result<()> {
        info!(
            request_id = notice.request_id,
            requester = %notice.requester_email,
            owner = notice.owner_email.as_deref().unwrap_or("-"),
            item_title = notice.item_title.as_deref().unwrap_or("-"),
            "Request notification"
        );
        Ok(())
    }
}
