use crate::utils::{ImportError, Result};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::info;

pub struct SourceDownloader {
    client: Client,
}

impl SourceDownloader {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Fetches `url` into `target`. The body goes to a sibling temp file that
    /// is renamed into place once complete. Returns the number of bytes.
    pub async fn download(&self, url: &str, target: &Path) -> Result<u64> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::DownloadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = target.with_extension("part");
        let mut file = tokio::fs::File::create(&tmp).await?;
        let mut written = 0u64;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, target).await?;

        info!(url = %url, target = %target.display(), bytes = written, "Register downloaded");

        Ok(written)
    }
}
