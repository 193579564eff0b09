use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Best-effort reachability check for resolved asset URLs.
#[async_trait]
pub trait AssetProbe: Send + Sync {
    async fn is_reachable(&self, url: &str) -> bool;
}

/// Sends a `HEAD` request and treats any 2xx/3xx answer as reachable.
pub struct HttpAssetProbe {
    client: reqwest::Client,
    base_url: Option<String>,
    timeout: Duration,
}

impl HttpAssetProbe {
    pub fn new(client: reqwest::Client, base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
            timeout,
        }
    }

    /// Absolute form of `url`, or `None` if it is relative and no base URL
    /// is configured.
    fn absolute_url(&self, url: &str) -> Option<String> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Some(url.to_string());
        }
        self.base_url
            .as_ref()
            .map(|base| format!("{}/{}", base, url.trim_start_matches('/')))
    }
}

#[async_trait]
impl AssetProbe for HttpAssetProbe {
    async fn is_reachable(&self, url: &str) -> bool {
        let Some(target) = self.absolute_url(url) else {
            debug!("Not probing relative asset URL {} (no ASSET_BASE_URL)", url);
            return true;
        };

        match self.client.head(&target).timeout(self.timeout).send().await {
            Ok(response) => {
                let status = response.status();
                debug!("HEAD {} -> {}", target, status);
                status.is_success() || status.is_redirection()
            }
            Err(e) => {
                debug!("HEAD {} failed: {}", target, e);
                false
            }
        }
    }
}

/// Skips the network entirely.
pub struct AssumeReachable;

#[async_trait]
impl AssetProbe for AssumeReachable {
    async fn is_reachable(&self, _url: &str) -> bool {
        true
    }
}
