use crate::error::{FetchError, SetupError};
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// What happened to a single URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file was fetched and written to disk
    Downloaded,
    /// A local copy with the same size as the remote file already exists
    Skipped,
    /// A request or filesystem operation failed; the run carries on
    Failed,
}

/// Downloads a URL into a directory unless an identical-size copy is already there
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Create a fetcher with an optional per-request timeout
    pub fn new(timeout: Option<Duration>) -> Result<Self, SetupError> {
        // Compression stays off: the size check compares raw byte counts
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(SetupError::HttpClient)?;
        Ok(Fetcher { client })
    }

    /// Fetch `url` into `dir`, logging any failure
    pub async fn fetch(&self, url: &str, dir: &Path) -> DownloadOutcome {
        match self.try_fetch(url, dir).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(url, error = %e, source = ?std::error::Error::source(&e), "fetch failed");
                DownloadOutcome::Failed
            }
        }
    }

    async fn try_fetch(&self, url: &str, dir: &Path) -> Result<DownloadOutcome, FetchError> {
        let file_path = destination(url, dir)?;

        if let Ok(metadata) = fs::metadata(&file_path).await {
            let remote_size = self.remote_size(url).await?;
            debug!(url, local = metadata.len(), remote = ?remote_size, "comparing sizes");

            if remote_size == Some(metadata.len()) {
                info!(url, "file already exists and size matches, skipping download");
                return Ok(DownloadOutcome::Skipped);
            }
        }

        self.download(url, &file_path).await?;
        Ok(DownloadOutcome::Downloaded)
    }

    /// Remote size from a HEAD request. `None` when the server does not report one.
    async fn remote_size(&self, url: &str) -> Result<Option<u64>, FetchError> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(FetchError::Metadata)?;

        Ok(content_length(response.headers()))
    }

    async fn download(&self, url: &str, file_path: &Path) -> Result<(), FetchError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(FetchError::Download)?;

        let mut file = fs::File::create(file_path)
            .await
            .map_err(|source| FetchError::CreateFile {
                path: file_path.to_path_buf(),
                source,
            })?;

        let write_err = |source: std::io::Error| FetchError::Write {
            path: file_path.to_path_buf(),
            source,
        };

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(FetchError::Download)? {
            file.write_all(&chunk).await.map_err(write_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_err)?;

        debug!(url, bytes = written, path = %file_path.display(), "saved");
        Ok(())
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// File name for a URL: everything after its last `/`, taken verbatim
pub fn file_name_for(url: &str) -> Option<&str> {
    url.rsplit('/').next().filter(|name| !name.is_empty())
}

fn destination(url: &str, dir: &Path) -> Result<PathBuf, FetchError> {
    let name = file_name_for(url).ok_or_else(|| FetchError::NoFileName(url.to_string()))?;
    Ok(dir.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Fetcher {
        Fetcher::new(Some(Duration::from_secs(10))).unwrap()
    }

    #[test]
    fn test_file_name_for() {
        assert_eq!(file_name_for("https://x.test/a/b/c.jpg"), Some("c.jpg"));
        assert_eq!(file_name_for("https://x.test/%20odd%20.png"), Some("%20odd%20.png"));
        assert_eq!(file_name_for("https://x.test/dir/"), None);
    }

    #[test]
    fn test_content_length() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_length(&headers), None);

        headers.insert(CONTENT_LENGTH, "not-a-number".parse().unwrap());
        assert_eq!(content_length(&headers), None);

        headers.insert(CONTENT_LENGTH, "2048".parse().unwrap());
        assert_eq!(content_length(&headers), Some(2048));
    }

    #[tokio::test]
    async fn test_unknown_remote_size_downloads_again() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/a.jpg"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/a.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new-body".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"old").unwrap();
        let url = format!("{}/a.jpg", server.uri());

        let outcome = fetcher().fetch(&url, dir.path()).await;

        assert_eq!(outcome, DownloadOutcome::Downloaded);
        assert_eq!(std::fs::read(dir.path().join("a.jpg")).unwrap(), b"new-body");
    }

    #[tokio::test]
    async fn test_missing_file_downloads_without_metadata_request() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/a.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg-bytes".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let url = format!("{}/img/a.jpg", server.uri());

        let outcome = fetcher().fetch(&url, dir.path()).await;

        assert_eq!(outcome, DownloadOutcome::Downloaded);
        assert_eq!(std::fs::read(dir.path().join("a.jpg")).unwrap(), b"jpeg-bytes");
    }

    #[tokio::test]
    async fn test_same_size_is_skipped_without_data_transfer() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/a.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"12345".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"other".to_vec()))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.png"), b"local").unwrap();
        let url = format!("{}/a.png", server.uri());

        let outcome = fetcher().fetch(&url, dir.path()).await;

        assert_eq!(outcome, DownloadOutcome::Skipped);
        assert_eq!(std::fs::read(dir.path().join("a.png")).unwrap(), b"local");
    }

    #[tokio::test]
    async fn test_size_mismatch_overwrites() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/a.gif"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh-gif".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/a.gif"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh-gif".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.gif"), b"stale").unwrap();
        let url = format!("{}/a.gif", server.uri());

        let outcome = fetcher().fetch(&url, dir.path()).await;

        assert_eq!(outcome, DownloadOutcome::Downloaded);
        assert_eq!(std::fs::read(dir.path().join("a.gif")).unwrap(), b"fresh-gif");
    }

    #[tokio::test]
    async fn test_metadata_failure_keeps_existing_file() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"keep me").unwrap();
        let url = format!("{}/a.jpg", server.uri());

        let outcome = fetcher().fetch(&url, dir.path()).await;

        assert_eq!(outcome, DownloadOutcome::Failed);
        assert_eq!(std::fs::read(dir.path().join("a.jpg")).unwrap(), b"keep me");
    }

    #[tokio::test]
    async fn test_error_status_creates_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let url = format!("{}/missing.png", server.uri());

        let outcome = fetcher().fetch(&url, dir.path()).await;

        assert_eq!(outcome, DownloadOutcome::Failed);
        assert!(!dir.path().join("missing.png").exists());
    }

    #[tokio::test]
    async fn test_unreachable_host_fails() {
        let dir = TempDir::new().unwrap();

        let outcome = fetcher().fetch("http://127.0.0.1:1/a.jpg", dir.path()).await;

        assert_eq!(outcome, DownloadOutcome::Failed);
    }

    #[tokio::test]
    async fn test_missing_directory_fails_on_create() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        let url = format!("{}/a.jpg", server.uri());

        let outcome = fetcher().fetch(&url, &missing).await;

        assert_eq!(outcome, DownloadOutcome::Failed);
    }
}
