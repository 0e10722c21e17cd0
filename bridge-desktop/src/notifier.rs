//! Library refresh notifier for Jellyfin/Emby servers using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    notify::LibraryNotifier,
};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Header carrying the server API key.
const TOKEN_HEADER: &str = "X-Emby-Token";

/// Posts to `{base_url}/Library/Refresh` to trigger a full library scan.
pub struct HttpLibraryNotifier {
    client: Client,
    refresh_url: String,
    api_key: String,
}

impl HttpLibraryNotifier {
    /// Create a notifier with a per-request timeout.
    pub fn new(
        base_url: impl AsRef<str>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("media-mirror/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::OperationFailed(format!("HTTP client: {e}")))?;

        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Create a notifier around an existing client.
    pub fn with_client(client: Client, base_url: impl AsRef<str>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            refresh_url: refresh_url(base_url.as_ref()),
            api_key: api_key.into(),
        }
    }

    pub fn refresh_url(&self) -> &str {
        &self.refresh_url
    }
}

fn refresh_url(base_url: &str) -> String {
    format!("{}/Library/Refresh", base_url.trim_end_matches('/'))
}

#[async_trait]
impl LibraryNotifier for HttpLibraryNotifier {
    async fn request_refresh(&self) -> Result<()> {
        debug!(url = %self.refresh_url, "Requesting library refresh");

        let response = self
            .client
            .post(&self.refresh_url)
            .header(TOKEN_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::OperationFailed(format!(
                "library refresh returned HTTP {}",
                status.as_u16()
            )));
        }

        info!(status = status.as_u16(), "Library refresh requested");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accepts one connection, captures the request head and answers with `status_line`.
    async fn one_shot_server(status_line: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!("{status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{addr}"), handle)
    }

    #[test]
    fn test_refresh_url_trims_trailing_slash() {
        assert_eq!(
            refresh_url("http://jellyfin:8096/"),
            "http://jellyfin:8096/Library/Refresh"
        );
        assert_eq!(
            refresh_url("http://jellyfin:8096"),
            "http://jellyfin:8096/Library/Refresh"
        );
    }

    #[tokio::test]
    async fn test_request_refresh_posts_with_token() {
        let (base, server) = one_shot_server("HTTP/1.1 204 No Content").await;
        let notifier = HttpLibraryNotifier::new(&base, "secret", Duration::from_secs(5)).unwrap();

        notifier.request_refresh().await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /Library/Refresh "));
        assert!(request.to_ascii_lowercase().contains("x-emby-token: secret"));
    }

    #[tokio::test]
    async fn test_request_refresh_rejects_error_status() {
        let (base, server) = one_shot_server("HTTP/1.1 401 Unauthorized").await;
        let notifier = HttpLibraryNotifier::new(&base, "wrong", Duration::from_secs(5)).unwrap();

        let err = notifier.request_refresh().await.unwrap_err();
        assert!(matches!(err, BridgeError::OperationFailed(_)));
        server.await.unwrap();
    }
}
