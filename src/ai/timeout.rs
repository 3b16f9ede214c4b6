//! Timeout helper for long-running async operations.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::ai::timeout::with_timeout;
//!
//! let result = with_timeout(
//!     policy.step_timeout,
//!     async { /* step body */ },
//!     "write article"
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::types::{ArticleError, Result};

/// Execute an async operation with a timeout
///
/// Returns [`ArticleError::Timeout`] if the operation doesn't complete within
/// the specified duration.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(ArticleError::timeout(operation_name, timeout)),
    }
}
