//! Remote asset fetching.

use async_trait::async_trait;
use reqwest::{Client, Url};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use super::error::IngestError;

/// Downloads a remote asset to a local path.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Name of this fetcher for logging.
    fn name(&self) -> &str;

    /// Streams `url` into `dest`, returning the number of bytes written.
    ///
    /// The whole operation (connect, headers, body) must finish within
    /// `timeout`. A partially written `dest` is left for the caller to clean
    /// up.
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        timeout: Duration,
        max_bytes: Option<u64>,
    ) -> Result<u64, IngestError>;
}

/// Fetcher over plain HTTP(S) using reqwest. No retries.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self, IngestError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| IngestError::fetch("", format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn download(
        &self,
        url: Url,
        dest: &Path,
        max_bytes: Option<u64>,
    ) -> Result<u64, IngestError> {
        let raw = url.to_string();
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| IngestError::fetch(&raw, e.to_string()))?;

        if let (Some(limit), Some(len)) = (max_bytes, response.content_length()) {
            if len > limit {
                return Err(IngestError::TooLarge { url: raw, limit });
            }
        }

        let file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| IngestError::io(dest, e))?;
        let mut writer = BufWriter::new(file);
        let mut written: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| IngestError::fetch(&raw, e.to_string()))?
        {
            written += chunk.len() as u64;
            if let Some(limit) = max_bytes {
                if written > limit {
                    return Err(IngestError::TooLarge { url: raw, limit });
                }
            }
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| IngestError::io(dest, e))?;
        }

        writer.flush().await.map_err(|e| IngestError::io(dest, e))?;
        debug!(url = %raw, bytes = written, "Fetched remote asset");
        Ok(written)
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        timeout: Duration,
        max_bytes: Option<u64>,
    ) -> Result<u64, IngestError> {
        let parsed = parse_fetch_url(url)?;

        match tokio::time::timeout(timeout, self.download(parsed, dest, max_bytes)).await {
            Ok(result) => result,
            Err(_) => Err(IngestError::FetchTimeout {
                url: url.to_string(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }
}

/// Parses a URL and checks that it uses a fetchable scheme.
pub fn parse_fetch_url(url: &str) -> Result<Url, IngestError> {
    let parsed = Url::parse(url).map_err(|e| IngestError::invalid_url(url, e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(IngestError::invalid_url(
            url,
            format!("unsupported scheme '{}'", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Serves a single canned HTTP response and returns the base URL.
    async fn serve_once(response: &'static [u8], hang: bool) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            if hang {
                tokio::time::sleep(Duration::from_secs(30)).await;
                return;
            }
            let _ = socket.write_all(response).await;
            let _ = socket.shutdown().await;
        });

        format!("http://{}", addr)
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new("autotrim-test").unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let base = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
            false,
        )
        .await;
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("in.mp4");

        let written = fetcher()
            .fetch(&format!("{}/clip.mp4", base), &dest, Duration::from_secs(5), None)
            .await
            .unwrap();

        assert_eq!(written, 5);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let base = serve_once(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            false,
        )
        .await;
        let temp = TempDir::new().unwrap();

        let err = fetcher()
            .fetch(
                &format!("{}/missing.mp4", base),
                &temp.path().join("in.mp4"),
                Duration::from_secs(5),
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let base = serve_once(b"", true).await;
        let temp = TempDir::new().unwrap();

        let err = fetcher()
            .fetch(
                &format!("{}/slow.mp4", base),
                &temp.path().join("in.mp4"),
                Duration::from_millis(200),
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::FetchTimeout { .. }));
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let base = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
            false,
        )
        .await;
        let temp = TempDir::new().unwrap();

        let err = fetcher()
            .fetch(
                &format!("{}/clip.mp4", base),
                &temp.path().join("in.mp4"),
                Duration::from_secs(5),
                Some(3),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::TooLarge { limit: 3, .. }));
    }

    #[test]
    fn test_parse_fetch_url() {
        assert!(parse_fetch_url("https://example.com/a.mp4").is_ok());
        assert!(matches!(
            parse_fetch_url("ftp://example.com/a.mp4"),
            Err(IngestError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_fetch_url("not a url"),
            Err(IngestError::InvalidUrl { .. })
        ));
    }
}
