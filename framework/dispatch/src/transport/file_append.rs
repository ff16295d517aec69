use std::path::{Path, PathBuf};

use lockstep_core::prelude::Marker;
use tokio::io::AsyncWriteExt;

use crate::error::{DeliveryError, DeliveryResult};

/// Appends one human readable line per marker to a local file: `<ts_iso> [<channel>] <tag>`.
#[derive(Debug, Clone)]
pub struct FileAppendTransport {
    path: PathBuf,
    channel: String,
}

impl FileAppendTransport {
    pub fn new(path: &Path, channel: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            channel: channel.to_string(),
        }
    }

    pub async fn deliver(&self, marker: &Marker) -> DeliveryResult {
        let line = format!("{} [{}] {}\n", marker.ts_iso(), self.channel, marker.tag());

        self.append(line.as_bytes())
            .await
            .map_err(|source| DeliveryError::File {
                path: self.path.clone(),
                source,
            })
    }

    async fn append(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await
    }
}
