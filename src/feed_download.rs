// src/feed_download.rs
use crate::errors::FeedError;
use crate::show::FeedSnapshot;
use crate::show_factory::ScheduleFactory;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// Largest body accepted from the feed endpoint.
pub const MAX_FEED_BYTES: usize = 1024 * 1024;

pub const DEFAULT_FEED_URL: &str = "https://www.giantbomb.com/upcoming_json";

// ===== fetcher
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, FeedError>;
}

// ===== Live http fetcher
pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FeedError> {
        const APP_USER_AGENT: &str =
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

        // gzip/deflate/brotli are negotiated and decoded by reqwest itself.
        let client: Client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self::from_client(client))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FeedError> {
        info!("HttpFeedFetcher: fetching {}", url);
        let mut response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::HttpStatus(response.status()));
        }
        if let Some(size) = response.content_length() {
            if size as usize > MAX_FEED_BYTES {
                return Err(FeedError::FeedTooLarge { size: size as usize });
            }
        }

        // Chunked responses carry no length, so cap while reading.
        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() > MAX_FEED_BYTES {
                return Err(FeedError::FeedTooLarge { size: body.len() });
            }
        }
        debug!("HttpFeedFetcher: received {} bytes", body.len());
        Ok(String::from_utf8(body)?)
    }
}

// ===== Fake http fetcher for testing
/// Serves queued responses in order, repeating the last one forever.
pub struct FakeFetcher {
    responses: Mutex<Vec<Result<String, String>>>,
}

impl FakeFetcher {
    pub fn new(response: &str) -> Self {
        Self::with_sequence(vec![Ok(response.to_string())])
    }

    pub fn with_sequence(responses: Vec<Result<String, String>>) -> Self {
        let mut responses = responses;
        responses.reverse();
        Self { responses: Mutex::new(responses) }
    }
}

#[async_trait]
impl FeedFetcher for FakeFetcher {
    async fn fetch(&self, _url: &Url) -> Result<String, FeedError> {
        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        let next = if responses.len() > 1 { responses.pop() } else { responses.last().cloned() };
        match next {
            Some(Ok(body)) => Ok(body),
            Some(Err(reason)) => {
                debug!("FakeFetcher: failing with '{}'", reason);
                Err(FeedError::HttpStatus(reqwest::StatusCode::SERVICE_UNAVAILABLE))
            }
            None => Ok(String::from("{}")),
        }
    }
}

pub async fn download_and_parse_feed(
    url: &Url,
    fetcher: &(dyn FeedFetcher + Send + Sync),
    factory: &ScheduleFactory,
) -> Result<FeedSnapshot, FeedError> {
    let content: String = fetcher.fetch(url).await?;
    debug!("download_and_parse_feed: content fetched, length: {}", content.len());
    let snapshot = factory.parse(&content)?;
    info!(
        "download_and_parse_feed: {} upcoming, {}",
        snapshot.upcoming().len(),
        snapshot.live()
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn feed_url() -> Url {
        Url::parse("http://example.com/upcoming_json").unwrap()
    }

    #[tokio::test]
    async fn test_download_and_parse_feed() {
        let fetcher = FakeFetcher::new(
            r#"{"liveNow": null, "upcoming": [
                {"type": "Podcast", "title": "Beastcast", "date": "Oct 21, 2026 09:00 AM", "premium": false}
            ]}"#,
        );

        let snapshot = download_and_parse_feed(&feed_url(), &fetcher, &ScheduleFactory::new())
            .await
            .unwrap();

        assert!(!snapshot.live().is_live());
        assert_eq!(snapshot.upcoming().len(), 1);
        assert_eq!(snapshot.upcoming()[0].title(), "Beastcast");
    }

    #[tokio::test]
    async fn fake_fetcher_serves_sequence_then_repeats_last() {
        let fetcher = FakeFetcher::with_sequence(vec![
            Ok("first".to_string()),
            Err("down".to_string()),
            Ok("last".to_string()),
        ]);
        assert_eq!(fetcher.fetch(&feed_url()).await.unwrap(), "first");
        assert!(fetcher.fetch(&feed_url()).await.is_err());
        assert_eq!(fetcher.fetch(&feed_url()).await.unwrap(), "last");
        assert_eq!(fetcher.fetch(&feed_url()).await.unwrap(), "last");
    }

    #[test]
    fn http_fetcher_builds() {
        assert!(HttpFeedFetcher::new(Duration::from_secs(10)).is_ok());
    }

    // ===== Local HTTP server

    /// Serves `response` verbatim to the first connection.
    async fn serve_once(response: Vec<u8>) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            // The client may hang up early on rejected bodies.
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
        });
        Url::parse(&format!("http://{}/upcoming_json", addr)).unwrap()
    }

    fn local_fetcher() -> HttpFeedFetcher {
        let client = Client::builder().no_proxy().timeout(Duration::from_secs(5)).build().unwrap();
        HttpFeedFetcher::from_client(client)
    }

    fn response(head: &str, body: &[u8]) -> Vec<u8> {
        let mut bytes = head.as_bytes().to_vec();
        bytes.extend_from_slice(body);
        bytes
    }

    #[tokio::test]
    async fn http_fetcher_returns_body() {
        let body = br#"{"liveNow": null, "upcoming": []}"#;
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let url = serve_once(response(&head, body)).await;

        let content = local_fetcher().fetch(&url).await.unwrap();
        assert_eq!(content.as_bytes(), body);
    }

    #[tokio::test]
    async fn http_fetcher_rejects_error_status() {
        let url = serve_once(response(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            b"",
        ))
        .await;

        let result = local_fetcher().fetch(&url).await;
        assert!(matches!(
            result,
            Err(FeedError::HttpStatus(status)) if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[tokio::test]
    async fn http_fetcher_rejects_large_content_length() {
        let declared = MAX_FEED_BYTES * 2;
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            declared
        );
        let url = serve_once(response(&head, b"{}")).await;

        let result = local_fetcher().fetch(&url).await;
        assert!(matches!(result, Err(FeedError::FeedTooLarge { size }) if size == declared));
    }

    #[tokio::test]
    async fn http_fetcher_rejects_large_chunked_body() {
        let chunk = vec![b'a'; 64 * 1024];
        let mut raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n".to_vec();
        for _ in 0..(MAX_FEED_BYTES / chunk.len() + 1) {
            raw.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
            raw.extend_from_slice(&chunk);
            raw.extend_from_slice(b"\r\n");
        }
        raw.extend_from_slice(b"0\r\n\r\n");
        let url = serve_once(raw).await;

        let result = local_fetcher().fetch(&url).await;
        assert!(matches!(result, Err(FeedError::FeedTooLarge { size }) if size > MAX_FEED_BYTES));
    }

    #[tokio::test]
    async fn http_fetcher_rejects_invalid_utf8() {
        let body = [b'{', 0xff, 0xfe, b'}'];
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let url = serve_once(response(&head, &body)).await;

        let result = local_fetcher().fetch(&url).await;
        assert!(matches!(result, Err(FeedError::InvalidEncoding(_))));
    }

    // SAD PATHS

    #[tokio::test]
    async fn test_malformed_feed() {
        let fetcher = FakeFetcher::new(r#"{"upcoming": "#);
        let result = download_and_parse_feed(&feed_url(), &fetcher, &ScheduleFactory::new()).await;
        assert!(matches!(result, Err(FeedError::ParseError(_))));
    }

    #[tokio::test]
    async fn fetch_errors_propagate() {
        let fetcher = FakeFetcher::with_sequence(vec![Err("offline".to_string())]);
        let result = download_and_parse_feed(&feed_url(), &fetcher, &ScheduleFactory::new()).await;
        assert!(matches!(result, Err(FeedError::HttpStatus(_))));
    }
}
