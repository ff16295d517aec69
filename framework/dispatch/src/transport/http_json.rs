use std::time::Duration;

use serde::Serialize;

use crate::error::{DeliveryError, DeliveryResult};

/// Path of the logger's marker endpoint.
pub const LOG_API_PATH: &str = "/api/log";

#[derive(Serialize)]
struct LogMessage<'a> {
    message: &'a str,
    #[serde(rename = "channelId")]
    channel_id: &'a str,
}

/// POSTs `{"message": <tag>, "channelId": <channel>}` to the data logger.
///
/// The response body is ignored, only the status is checked.
#[derive(Debug, Clone)]
pub struct HttpJsonTransport {
    url: String,
    channel: String,
    client: reqwest::Client,
}

impl HttpJsonTransport {
    pub fn new(address: &str, channel: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            url: endpoint_url(address),
            channel: channel.to_string(),
            client,
        })
    }

    pub async fn deliver(&self, tag: &str) -> DeliveryResult {
        log::trace!("POST {} message={tag} channelId={}", self.url, self.channel);

        let response = self
            .client
            .post(&self.url)
            .json(&LogMessage {
                message: tag,
                channel_id: &self.channel,
            })
            .send()
            .await
            .map_err(|source| DeliveryError::Http {
                url: self.url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(DeliveryError::Status {
                url: self.url.clone(),
                status: response.status(),
            });
        }

        Ok(())
    }
}

fn endpoint_url(address: &str) -> String {
    let address = address.trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        format!("{address}{LOG_API_PATH}")
    } else {
        format!("http://{address}{LOG_API_PATH}")
    }
}
