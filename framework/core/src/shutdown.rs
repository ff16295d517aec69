use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::{Receiver, Sender};

/// Broadcasts the end of an experiment to every background task watching it.
///
/// The handle is triggered either by an external signal (Ctrl-C) or by the runner itself once the
/// last marker has been dispatched, so that helper threads such as the progress bar stop as well.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(1).0,
        }
    }

    pub fn shutdown(&self) {
        if let Err(e) = self.sender.send(()) {
            // Nobody listening, nothing to stop.
            log::debug!("Shutdown signal had no listeners: {e:?}");
        }
    }

    pub fn new_listener(&self) -> ShutdownListener {
        ShutdownListener::new(self.sender.subscribe())
    }
}

#[derive(Debug)]
pub struct ShutdownListener {
    receiver: Receiver<()>,
    triggered: bool,
}

impl ShutdownListener {
    fn new(receiver: Receiver<()>) -> Self {
        Self {
            receiver,
            triggered: false,
        }
    }

    /// Point in time check whether shutdown has been requested.
    ///
    /// Once this has returned true it keeps returning true.
    pub fn should_shutdown(&mut self) -> bool {
        if !self.triggered {
            self.triggered = match self.receiver.try_recv() {
                Ok(()) | Err(TryRecvError::Closed) => true,
                // Lagged means at least one signal was sent.
                Err(TryRecvError::Lagged(_)) => true,
                Err(TryRecvError::Empty) => false,
            };
        }

        self.triggered
    }

    /// Wait until shutdown is requested. Safe to race against other futures with `select!`.
    pub async fn wait_for_shutdown(&mut self) {
        if self.triggered {
            return;
        }

        match self.receiver.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) | Err(RecvError::Closed) => {
                self.triggered = true;
            }
        }
    }
}

/// Returned in place of an experiment's result when it was interrupted by a shutdown signal.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct ShutdownSignalError {
    msg: String,
}

impl Default for ShutdownSignalError {
    fn default() -> Self {
        Self {
            msg: "Experiment interrupted by shutdown signal".to_string(),
        }
    }
}
