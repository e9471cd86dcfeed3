//! Start/stop handle for the background loops.
//!
//! A loop is considered stopped only once its task has actually exited (or
//! been aborted), so a rapid stop/start never leaves two copies running.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub struct LoopHandle<T> {
    name: &'static str,
    cancel: CancellationToken,
    join: JoinHandle<T>,
}

impl<T: Send + 'static> LoopHandle<T> {
    /// Spawn `body` with a fresh cancellation token.
    pub fn spawn<F, Fut>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: std::future::Future<Output = T> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let join = tokio::spawn(body(cancel.clone()));
        Self { name, cancel, join }
    }

    /// Signal the loop and wait up to `timeout` for it to exit.  Returns the
    /// loop's output, or `None` if it had to be aborted or panicked.
    pub async fn stop(self, timeout: Duration) -> Option<T> {
        self.cancel.cancel();
        let abort = self.join.abort_handle();
        match tokio::time::timeout(timeout, self.join).await {
            Ok(Ok(out)) => Some(out),
            Ok(Err(e)) => {
                warn!("{} loop ended abnormally: {}", self.name, e);
                None
            }
            Err(_) => {
                warn!(
                    "{} loop did not stop within {:?}, aborting",
                    self.name, timeout
                );
                abort.abort();
                None
            }
        }
    }
}
