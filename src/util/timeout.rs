//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::BidlinkError;

/// Wrap a fallible future with a deadline, mapping expiry to [`BidlinkError::Timeout`].
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, BidlinkError>>,
) -> Result<T, BidlinkError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(BidlinkError::Timeout(duration.as_millis() as u64)),
    }
}
