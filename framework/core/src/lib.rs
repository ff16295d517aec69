mod marker;
mod shutdown;
mod wait;

pub mod prelude {
    pub use crate::marker::{offset_secs, Marker};
    pub use crate::shutdown::{ShutdownHandle, ShutdownListener, ShutdownSignalError};
    pub use crate::wait::{WaitDiscipline, WaitOutcome, FINE_WAIT_WINDOW};
}
