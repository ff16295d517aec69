use std::future::Future;

use lockstep_core::prelude::{ShutdownHandle, ShutdownSignalError};

/// Owns the async runtime the experiment runs on.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
    shutdown_handle: ShutdownHandle,
}

impl Executor {
    pub fn new(runtime: tokio::runtime::Runtime, shutdown_handle: ShutdownHandle) -> Self {
        Self {
            runtime,
            shutdown_handle,
        }
    }

    /// Run async code in place, blocking until it completes.
    ///
    /// The future is dropped at its current await point if a shutdown signal arrives first, in
    /// which case a [ShutdownSignalError] is returned. Dropping a wait or a dispatch half way is
    /// fine: markers already dispatched are in the audit file, nothing else needs undoing.
    pub fn execute_in_place<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        let mut shutdown_listener = self.shutdown_handle.new_listener();
        self.runtime.block_on(async move {
            tokio::select! {
                result = fut => result,
                _ = shutdown_listener.wait_for_shutdown() => {
                    Err(anyhow::anyhow!(ShutdownSignalError::default()))
                },
            }
        })
    }

    pub fn shutdown_handle(&self) -> &ShutdownHandle {
        &self.shutdown_handle
    }
}
