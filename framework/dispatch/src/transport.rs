mod external_script;
mod file_append;
mod http_json;

use anyhow::Context;
use lockstep_core::prelude::Marker;

use crate::config::{DispatchConfig, TransportKind};
use crate::error::DeliveryResult;

pub use self::external_script::ExternalScriptTransport;
pub use self::file_append::FileAppendTransport;
pub use self::http_json::HttpJsonTransport;

/// A way of delivering a marker's tag to the remote data logger, chosen once per experiment.
#[derive(Debug, Clone)]
pub enum Transport {
    HttpJson(HttpJsonTransport),
    ExternalScript(ExternalScriptTransport),
    File(FileAppendTransport),
}

impl Transport {
    pub fn from_config(config: &DispatchConfig) -> anyhow::Result<Self> {
        let transport = match config.method {
            TransportKind::HttpJson => Transport::HttpJson(
                HttpJsonTransport::new(&config.remote_address, &config.channel, config.timeout)
                    .context("Failed to build HTTP client for the marker transport")?,
            ),
            TransportKind::ExternalScript => Transport::ExternalScript(
                ExternalScriptTransport::new(
                    &config.helper,
                    &config.remote_address,
                    &config.channel,
                    config.timeout,
                )
                .context("Failed to build HTTP fallback for the marker helper")?,
            ),
            TransportKind::File => {
                Transport::File(FileAppendTransport::new(&config.marker_log, &config.channel))
            }
        };

        Ok(transport)
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            Transport::HttpJson(_) => TransportKind::HttpJson,
            Transport::ExternalScript(_) => TransportKind::ExternalScript,
            Transport::File(_) => TransportKind::File,
        }
    }

    /// Attempt a single delivery. Never retried by the caller.
    pub async fn deliver(&self, marker: &Marker) -> DeliveryResult {
        match self {
            Transport::HttpJson(transport) => transport.deliver(marker.tag()).await,
            Transport::ExternalScript(transport) => transport.deliver(marker.tag()).await,
            Transport::File(transport) => transport.deliver(marker).await,
        }
    }
}
