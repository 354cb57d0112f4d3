//! Cancellation token for the rebalance loop.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{error, info};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

/// Shared stop signal. Clones observe the same token.
///
/// The loop itself is synchronous; waits between cycles are driven on a
/// current-thread runtime so a cancel wakes them immediately.
#[derive(Clone)]
pub struct Shutdown {
    token: CancellationToken,
    runtime: Arc<Runtime>,
}

impl Shutdown {
    pub fn new() -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        Ok(Self {
            token: CancellationToken::new(),
            runtime: Arc::new(runtime),
        })
    }

    /// Request a stop and wake every waiter.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Sleep for `timeout` unless cancelled first. Returns `true` if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let token = &self.token;
        self.runtime.block_on(async {
            tokio::select! {
                biased;
                _ = token.cancelled() => true,
                _ = tokio::time::sleep(timeout) => false,
            }
        })
    }

    /// Cancel on Ctrl-C.
    ///
    /// The listener gets its own thread and runtime so the signal is caught
    /// while a cycle is running, not only during waits.
    pub fn cancel_on_ctrl_c(&self) -> io::Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let token = self.token.clone();

        thread::Builder::new()
            .name("ctrl-c".into())
            .spawn(move || {
                runtime.block_on(async {
                    match tokio::signal::ctrl_c().await {
                        Ok(()) => {
                            info!("Ctrl-C received, stopping after the current cycle");
                            token.cancel();
                        }
                        Err(e) => error!("cannot listen for Ctrl-C: {e}"),
                    }
                });
            })?;
        Ok(())
    }
}
