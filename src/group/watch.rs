//! Background watch loop keeping a group's membership current.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch as watch_channel;

use crate::connect::Connector;
use crate::retry::RetryDecision;

use super::ServiceClientGroup;

impl<C: Connector> ServiceClientGroup<C> {
    /// Run until shutdown. Watch-stream failures restart the watch after
    /// `watch_retry_delay`; refresh failures retry per `update_retry`.
    /// Every absorbed error goes to the error handler; none are fatal.
    pub(super) async fn watch_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown_tx.subscribe();
        loop {
            if *shutdown.borrow_and_update() {
                return;
            }
            let mut watcher = match self.store.watch(&self.config.key).await {
                Ok(watcher) => watcher,
                Err(err) => {
                    let err = anyhow::Error::new(err)
                        .context(format!("watch {:?} fail", self.config.key));
                    self.report(&err);
                    if sleep_or_shutdown(&mut shutdown, self.config.watch_retry_delay).await {
                        return;
                    }
                    continue;
                }
            };
            loop {
                tokio::select! {
                    _ = shutdown.changed() => return,
                    changed = watcher.changed() => match changed {
                        Ok(()) => {
                            if self.update_with_retry(&mut shutdown).await {
                                return;
                            }
                        }
                        Err(err) => {
                            let err = anyhow::Error::new(err)
                                .context(format!("watch {:?} fail", self.config.key));
                            self.report(&err);
                            break;
                        }
                    },
                }
            }
            if sleep_or_shutdown(&mut shutdown, self.config.watch_retry_delay).await {
                return;
            }
        }
    }

    /// Refresh with bounded retries. Returns true if shutdown was
    /// requested mid-retry.
    async fn update_with_retry(&self, shutdown: &mut watch_channel::Receiver<bool>) -> bool {
        let mut attempt = 1u32;
        loop {
            let err = match self.refresh().await {
                Ok(()) => return false,
                Err(err) => err,
            };
            self.report(&err);
            match self.config.update_retry.decide(attempt) {
                RetryDecision::NoRetry => return false,
                RetryDecision::RetryAfter(delay) => {
                    if sleep_or_shutdown(shutdown, delay).await {
                        return true;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// Sleep for `delay`, returning early with true if shutdown fires first.
async fn sleep_or_shutdown(shutdown: &mut watch_channel::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = shutdown.changed() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
