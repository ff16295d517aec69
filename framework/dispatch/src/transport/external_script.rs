use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use crate::error::{DeliveryError, DeliveryResult};
use crate::helper::resolve_helper;
use crate::transport::HttpJsonTransport;

/// Runs `<helper> <host:port> <channel> <message>` for every marker.
///
/// If the helper cannot be found, cannot be started, exits non-zero or hangs past the timeout,
/// the same marker is sent with the [HttpJsonTransport] instead.
#[derive(Debug, Clone)]
pub struct ExternalScriptTransport {
    helper: PathBuf,
    address: String,
    channel: String,
    timeout: Duration,
    fallback: HttpJsonTransport,
}

impl ExternalScriptTransport {
    pub fn new(
        helper: &Path,
        address: &str,
        channel: &str,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            helper: helper.to_path_buf(),
            address: address.to_string(),
            channel: channel.to_string(),
            timeout,
            fallback: HttpJsonTransport::new(address, channel, timeout)?,
        })
    }

    pub fn helper(&self) -> &Path {
        &self.helper
    }

    pub async fn deliver(&self, tag: &str) -> DeliveryResult {
        let Err(helper_err) = self.run_helper(tag).await else {
            return Ok(());
        };

        log::warn!("Marker helper failed for [{tag}], falling back to HTTP: {helper_err}");
        self.fallback
            .deliver(tag)
            .await
            .map_err(|http_err| DeliveryError::Fallback {
                helper: Box::new(helper_err),
                http: Box::new(http_err),
            })
    }

    async fn run_helper(&self, tag: &str) -> DeliveryResult {
        let path = resolve_helper(&self.helper).ok_or_else(|| DeliveryError::HelperMissing {
            path: self.helper.clone(),
        })?;

        let mut command = tokio::process::Command::new(&path);
        command
            .arg(&self.address)
            .arg(&self.channel)
            .arg(tag)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            // A helper that outlives the timeout must not linger.
            .kill_on_drop(true);

        let status = match tokio::time::timeout(self.timeout, command.status()).await {
            Err(_) => {
                return Err(DeliveryError::HelperTimeout {
                    path,
                    timeout: self.timeout,
                })
            }
            Ok(Err(source)) => return Err(DeliveryError::HelperSpawn { path, source }),
            Ok(Ok(status)) => status,
        };

        if !status.success() {
            return Err(DeliveryError::HelperStatus { path, status });
        }

        Ok(())
    }
}
