//! Coarse interrupt handling: a flag checked at every suspension point.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{error, warn};

#[derive(Default)]
struct Inner {
    requested: AtomicBool,
    notify: Notify,
}

/// Cloneable shutdown handle shared between the signal handler and the run.
#[derive(Clone, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.inner.requested.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    #[inline]
    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    /// Sleep for `duration` unless shutdown is requested first.
    /// Returns `false` when the sleep was cut short.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_requested() {
            return false;
        }
        if duration.is_zero() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = &mut notified => false,
        }
    }

    /// Request shutdown on the first Ctrl+C; a second Ctrl+C exits immediately.
    pub fn install_ctrl_c_handler(&self) {
        let shutdown = self.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(?err, "failed to install Ctrl+C handler");
                return;
            }
            warn!("interrupt received, stopping after the current request");
            shutdown.request();

            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("second interrupt, exiting immediately");
                std::process::exit(130);
            }
        });
    }
}

impl std::fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shutdown")
            .field("requested", &self.is_requested())
            .finish()
    }
}
