use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Why a browse session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The session was stopped explicitly.
    Cancelled,
    /// The session's deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => f.write_str("context canceled"),
            StopReason::DeadlineExceeded => f.write_str("context deadline exceeded"),
        }
    }
}

/// Cancellation signal governing a browse session.
///
/// Clones share the same signal. The first reason passed to a stop wins;
/// later stops are no-ops.
#[derive(Debug, Clone, Default)]
pub struct BrowseContext {
    token: CancellationToken,
    reason: Arc<OnceLock<StopReason>>,
}

impl BrowseContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context that stops with [`StopReason::DeadlineExceeded`]
    /// after `timeout`. Must be called from within a tokio runtime.
    pub fn with_timeout(timeout: Duration) -> Self {
        let ctx = Self::new();
        let timer = ctx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => timer.stop(StopReason::DeadlineExceeded),
                _ = timer.token.cancelled() => {}
            }
        });
        ctx
    }

    pub fn cancel(&self) {
        self.stop(StopReason::Cancelled);
    }

    fn stop(&self, reason: StopReason) {
        // Reason is published before the token fires so observers always see it.
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Terminal reason, or `None` while the context is live.
    pub fn reason(&self) -> Option<StopReason> {
        if !self.token.is_cancelled() {
            return None;
        }
        Some(self.reason.get().copied().unwrap_or(StopReason::Cancelled))
    }

    /// Underlying token, for scoping child tasks.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_context_has_no_reason() {
        let ctx = BrowseContext::new();
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.reason(), None);
    }

    #[test]
    fn test_cancel_records_reason() {
        let ctx = BrowseContext::new();
        let clone = ctx.clone();
        clone.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.reason(), Some(StopReason::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded() {
        let ctx = BrowseContext::with_timeout(Duration::from_secs(5));
        let start = tokio::time::Instant::now();
        ctx.cancelled().await;
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(ctx.reason(), Some(StopReason::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_reason_wins() {
        let ctx = BrowseContext::with_timeout(Duration::from_secs(5));
        ctx.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ctx.reason(), Some(StopReason::Cancelled));
    }

    #[test]
    fn test_display_matches_reason() {
        assert_eq!(StopReason::Cancelled.to_string(), "context canceled");
        assert_eq!(StopReason::DeadlineExceeded.to_string(), "context deadline exceeded");
    }
}
