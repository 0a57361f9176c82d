//! HttpTransport - reqwest によるメディアダウンロード

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CapbotError;
use crate::ports::MediaTransport;

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, CapbotError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CapbotError::Config(format!("cannot build http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaTransport for HttpTransport {
    async fn download(&self, url: &str, dest: &Path) -> Result<(), CapbotError> {
        let failed = |reason: String| CapbotError::Download {
            url: url.to_string(),
            reason,
        };

        match dest.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => {
                return Err(failed(format!("{} is not a valid directory", dir.display())));
            }
            _ => {}
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("received status {status}")));
        }
        let body = response.bytes().await.map_err(|e| failed(e.to_string()))?;
        tokio::fs::write(dest, &body)
            .await
            .map_err(|e| failed(e.to_string()))?;

        tracing::debug!(url, dest = %dest.display(), bytes = body.len(), "media downloaded");
        Ok(())
    }
}
