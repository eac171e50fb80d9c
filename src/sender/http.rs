use super::{Sender, SenderError};
use crate::config::types::SenderConfig;
use crate::pipeline::entry::CanonicalEntry;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

/// POSTs each entry as JSON to the configured collector endpoint
#[derive(Debug)]
pub struct HttpSender {
    endpoint: String,
    api_key: String,
    api_secret: String,
    client: reqwest::Client,
}

impl HttpSender {
    pub fn new(config: &SenderConfig) -> Result<Self, SenderError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Sender for HttpSender {
    async fn send(&self, entry: &CanonicalEntry) -> Result<(), SenderError> {
        let body = serde_json::to_vec(entry)?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header("x-api-key", &self.api_key)
            .header("x-api-secret", &self.api_secret)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SenderError::Status {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}
