//! Cancellation composition
//!
//! Merges a caller-supplied cancellation handle with an optional timeout into
//! one effective signal that every long-running await in the core observes.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Why an effective signal was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's handle was cancelled.
    Aborted,
    /// The composed timeout elapsed.
    Timeout,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aborted => write!(f, "aborted"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Create a new cancel handle.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Request cancellation. Any in-flight step observing a signal composed
    /// from this handle will reject as soon as possible.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// The cancellation signal actually observed by an operation, merging the
/// caller handle and the timeout timer.
#[derive(Clone, Debug)]
pub struct EffectiveSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
}

impl EffectiveSignal {
    /// A perpetually-unsignaled placeholder, used when the caller supplies
    /// neither a handle nor a timeout.
    pub fn never() -> Self {
        Self {
            token: CancellationToken::new(),
            reason: Arc::new(OnceLock::new()),
        }
    }

    /// Check if the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Why the signal fired, if it has.
    pub fn reason(&self) -> Option<CancelReason> {
        self.reason.get().copied()
    }

    /// Resolves when the signal fires. Pending forever for `never()`.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// The error an operation should reject with once this signal fired.
    pub fn cancellation(&self) -> Error {
        Error::Cancelled {
            reason: self.reason().unwrap_or(CancelReason::Aborted),
        }
    }
}

/// Releases the timer/listener resources behind an effective signal.
///
/// Dropping the guard is equivalent to calling [`SignalGuard::dispose`], so
/// every exit path of the composing call (success, error, cancellation)
/// releases the pending timer. `dispose` is idempotent.
#[derive(Debug)]
pub struct SignalGuard {
    watcher: Option<tokio::task::JoinHandle<()>>,
}

impl SignalGuard {
    /// Clear any pending timer and detach the caller listener.
    pub fn dispose(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Compose a caller handle and an optional timeout into one effective signal.
///
/// Policy:
/// - `timeout` of `None` or exactly zero means "no timeout"; only the caller
///   handle can cancel.
/// - A caller handle that is already cancelled yields an immediately-cancelled
///   signal with reason `Aborted` and starts no timer.
/// - Otherwise a single watcher task waits on whichever of caller/timer fires
///   first and records the reason; the other source is detached with it.
pub fn compose(caller: Option<&CancelHandle>, timeout: Option<Duration>) -> (EffectiveSignal, SignalGuard) {
    let reason = Arc::new(OnceLock::new());
    let timeout = timeout.filter(|d| !d.is_zero());

    if let Some(handle) = caller
        && handle.is_cancelled()
    {
        let token = CancellationToken::new();
        let _ = reason.set(CancelReason::Aborted);
        token.cancel();
        return (
            EffectiveSignal { token, reason },
            SignalGuard { watcher: None },
        );
    }

    if caller.is_none() && timeout.is_none() {
        return (EffectiveSignal::never(), SignalGuard { watcher: None });
    }

    let token = CancellationToken::new();
    let signal = EffectiveSignal {
        token: token.clone(),
        reason: reason.clone(),
    };
    let caller_token = caller.map(|h| h.token.clone());

    let watcher = tokio::spawn(async move {
        let aborted = async {
            match caller_token {
                Some(t) => t.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let timed_out = async {
            match timeout {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            _ = aborted => {
                let _ = reason.set(CancelReason::Aborted);
            }
            _ = timed_out => {
                let _ = reason.set(CancelReason::Timeout);
            }
        }
        token.cancel();
    });

    (
        signal,
        SignalGuard {
            watcher: Some(watcher),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_timeout_means_no_timeout() {
        let (signal, _guard) = compose(None, Some(Duration::ZERO));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!signal.is_cancelled());
        assert_eq!(signal.reason(), None);
    }

    #[tokio::test]
    async fn absent_timeout_never_fires_from_timer() {
        let (signal, _guard) = compose(None, None);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!signal.is_cancelled());
    }

    #[tokio::test]
    async fn timeout_fires_with_timeout_reason() {
        let (signal, _guard) = compose(None, Some(Duration::from_millis(10)));
        tokio::time::timeout(Duration::from_millis(500), signal.cancelled())
            .await
            .expect("timer should fire");
        assert_eq!(signal.reason(), Some(CancelReason::Timeout));
    }

    #[tokio::test]
    async fn caller_abort_wins_over_pending_timer() {
        let handle = CancelHandle::new();
        let (signal, _guard) = compose(Some(&handle), Some(Duration::from_secs(60)));
        handle.cancel();
        tokio::time::timeout(Duration::from_millis(500), signal.cancelled())
            .await
            .expect("abort should fire");
        assert_eq!(signal.reason(), Some(CancelReason::Aborted));
    }

    #[tokio::test]
    async fn already_cancelled_caller_short_circuits() {
        let handle = CancelHandle::new();
        handle.cancel();
        let (signal, guard) = compose(Some(&handle), Some(Duration::from_secs(60)));
        assert!(signal.is_cancelled());
        assert_eq!(signal.reason(), Some(CancelReason::Aborted));
        // No watcher task was started, so there is no timer to leak.
        assert!(guard.watcher.is_none());
    }

    #[tokio::test]
    async fn dispose_clears_pending_timer() {
        let (signal, mut guard) = compose(None, Some(Duration::from_millis(10)));
        guard.dispose();
        guard.dispose(); // idempotent
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!signal.is_cancelled());
    }

    #[tokio::test]
    async fn drop_releases_timer() {
        let (signal, guard) = compose(None, Some(Duration::from_millis(10)));
        drop(guard);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!signal.is_cancelled());
    }
}
