mod audit;
mod config;
mod dispatcher;
mod error;
mod helper;
mod transport;

pub mod prelude {
    pub use crate::audit::{read_audit_records, AuditLog, AuditRecord, AUDIT_HEADER};
    pub use crate::config::{DispatchConfig, TransportKind, UnknownTransportError};
    pub use crate::dispatcher::{DispatchStats, Dispatcher};
    pub use crate::error::{DeliveryError, DeliveryResult};
    pub use crate::helper::resolve_helper;
    pub use crate::transport::{
        ExternalScriptTransport, FileAppendTransport, HttpJsonTransport, Transport,
    };
}
