use lockstep_core::prelude::ShutdownHandle;
use tokio::signal;

/// Trigger the returned handle when the process receives Ctrl-C.
pub(crate) fn start_shutdown_listener(runtime: &tokio::runtime::Runtime) -> ShutdownHandle {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    runtime.spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                log::warn!("Received shutdown signal, stopping the experiment");
                listener_handle.shutdown();
            }
            Err(e) => {
                log::error!("Cannot listen for Ctrl-C, stop the experiment by killing it: {e}");
            }
        }
    });

    handle
}
