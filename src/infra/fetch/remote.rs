//! Remote workbook retrieval with a validated local copy.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{info, warn};

use crate::domain::error::DashboardError;

/// Leading bytes of every xlsx file (a ZIP archive).
pub const ZIP_SIGNATURE: [u8; 4] = *b"PK\x03\x04";

pub const CACHED_FILE_NAME: &str = "workbook.xlsx";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

pub trait Downloader {
    fn download(&self, url: &str) -> Result<Download, DashboardError>;
}

/// Blocking HTTP client with a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(timeout: Duration) -> Result<Self, DashboardError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DashboardError::source_unavailable("http client", err))?;
        Ok(Self { client })
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str) -> Result<Download, DashboardError> {
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|err| DashboardError::source_unavailable(url, err))?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .map_err(|err| DashboardError::source_unavailable(url, err))?
            .to_vec();
        Ok(Download { content_type, body })
    }
}

/// Checks size and ZIP signature of workbook bytes.
pub fn validate_workbook_bytes(bytes: &[u8], min_bytes: u64) -> Result<(), String> {
    if (bytes.len() as u64) < min_bytes {
        return Err(format!(
            "{} bytes is below the {min_bytes} byte minimum",
            bytes.len()
        ));
    }
    if !bytes.starts_with(&ZIP_SIGNATURE) {
        return Err("content is not a spreadsheet archive".to_string());
    }
    Ok(())
}

/// Keeps one local copy of a remote workbook fresh for `ttl`.
#[derive(Debug, Clone)]
pub struct WorkbookCache<D> {
    downloader: D,
    url: String,
    path: PathBuf,
    ttl: chrono::Duration,
    min_bytes: u64,
}

impl<D: Downloader> WorkbookCache<D> {
    pub fn new(
        downloader: D,
        url: impl Into<String>,
        cache_dir: &Path,
        ttl: chrono::Duration,
        min_bytes: u64,
    ) -> Self {
        Self {
            downloader,
            url: url.into(),
            path: cache_dir.join(CACHED_FILE_NAME),
            ttl,
            min_bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a usable local copy, downloading a new one when the cached copy
    /// is missing, stale, too small or not a spreadsheet.
    pub fn ensure_local(&self, now: DateTime<Utc>) -> Result<PathBuf, DashboardError> {
        match self.check_cached(now) {
            Ok(()) => {
                info!(path = %self.path.display(), "using cached workbook");
                return Ok(self.path.clone());
            }
            Err(reason) if self.path.exists() => {
                warn!(path = %self.path.display(), reason = %reason, "rejecting cached workbook");
            }
            Err(_) => {}
        }
        self.refresh()
    }

    fn check_cached(&self, now: DateTime<Utc>) -> Result<(), String> {
        let metadata = fs::metadata(&self.path).map_err(|err| err.to_string())?;
        let modified: DateTime<Utc> = metadata
            .modified()
            .map_err(|err| err.to_string())?
            .into();
        if now - modified >= self.ttl {
            return Err("cached copy is stale".to_string());
        }
        if metadata.len() < self.min_bytes {
            return Err(format!("{} bytes is below the minimum", metadata.len()));
        }

        let mut head = [0_u8; 4];
        fs::File::open(&self.path)
            .and_then(|mut file| file.read_exact(&mut head))
            .map_err(|err| err.to_string())?;
        if head != ZIP_SIGNATURE {
            return Err("content is not a spreadsheet archive".to_string());
        }
        Ok(())
    }

    fn refresh(&self) -> Result<PathBuf, DashboardError> {
        info!(url = %self.url, "downloading workbook");
        let download = self.downloader.download(&self.url)?;

        if download
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
        {
            return Err(DashboardError::source_unavailable(
                &self.url,
                "server returned an HTML page instead of a workbook",
            ));
        }
        validate_workbook_bytes(&download.body, self.min_bytes)
            .map_err(|reason| DashboardError::source_unavailable(&self.url, reason))?;

        let write = |path: &Path| -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let partial = path.with_extension("part");
            fs::write(&partial, &download.body)?;
            fs::rename(&partial, path)
        };
        write(&self.path).map_err(|err| {
            DashboardError::source_unavailable(self.path.display().to_string(), err)
        })?;

        info!(
            path = %self.path.display(),
            bytes = download.body.len(),
            "workbook downloaded"
        );
        Ok(self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::unique_test_dir;
    use std::cell::Cell;

    struct FakeDownloader {
        response: Download,
        calls: Cell<usize>,
    }

    impl FakeDownloader {
        fn serving(content_type: &str, body: Vec<u8>) -> Self {
            Self {
                response: Download {
                    content_type: Some(content_type.to_string()),
                    body,
                },
                calls: Cell::new(0),
            }
        }
    }

    impl Downloader for FakeDownloader {
        fn download(&self, _url: &str) -> Result<Download, DashboardError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.response.clone())
        }
    }

    const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

    fn workbook_bytes(len: usize) -> Vec<u8> {
        let mut body = ZIP_SIGNATURE.to_vec();
        body.resize(len, 0);
        body
    }

    #[test]
    fn validation_checks_size_and_signature() {
        assert!(validate_workbook_bytes(&workbook_bytes(64), 64).is_ok());
        assert!(validate_workbook_bytes(&workbook_bytes(63), 64).is_err());
        assert!(validate_workbook_bytes(&[b'<'; 128], 64).is_err());
    }

    #[test]
    fn fresh_copy_is_reused() {
        let dir = unique_test_dir("fetch-reuse");
        let cache = WorkbookCache::new(
            FakeDownloader::serving(XLSX, workbook_bytes(64)),
            "https://example.test/bip.xlsx",
            &dir,
            chrono::Duration::seconds(600),
            64,
        );

        let first = cache.ensure_local(Utc::now()).expect("should download");
        let second = cache.ensure_local(Utc::now()).expect("should reuse");

        assert_eq!(first, second);
        assert_eq!(cache.downloader.calls.get(), 1);
        fs::remove_dir_all(&dir).expect("should clean test dir");
    }

    #[test]
    fn corrupt_copy_is_fetched_again() {
        let dir = unique_test_dir("fetch-corrupt");
        fs::write(dir.join(CACHED_FILE_NAME), b"<html>login</html>").expect("should seed cache");
        let cache = WorkbookCache::new(
            FakeDownloader::serving(XLSX, workbook_bytes(64)),
            "https://example.test/bip.xlsx",
            &dir,
            chrono::Duration::seconds(600),
            16,
        );

        let path = cache.ensure_local(Utc::now()).expect("should replace corrupt copy");

        assert_eq!(cache.downloader.calls.get(), 1);
        assert!(fs::read(path).expect("should read copy").starts_with(&ZIP_SIGNATURE));
        fs::remove_dir_all(&dir).expect("should clean test dir");
    }

    #[test]
    fn stale_copy_is_fetched_again() {
        let dir = unique_test_dir("fetch-stale");
        let cache = WorkbookCache::new(
            FakeDownloader::serving(XLSX, workbook_bytes(64)),
            "https://example.test/bip.xlsx",
            &dir,
            chrono::Duration::seconds(600),
            64,
        );
        cache.ensure_local(Utc::now()).expect("should download");

        let later = Utc::now() + chrono::Duration::seconds(601);
        cache.ensure_local(later).expect("should download again");

        assert_eq!(cache.downloader.calls.get(), 2);
        fs::remove_dir_all(&dir).expect("should clean test dir");
    }

    #[test]
    fn html_response_is_source_unavailable() {
        let dir = unique_test_dir("fetch-html");
        let cache = WorkbookCache::new(
            FakeDownloader::serving("text/html; charset=utf-8", workbook_bytes(64)),
            "https://example.test/bip.xlsx",
            &dir,
            chrono::Duration::seconds(600),
            64,
        );

        let result = cache.ensure_local(Utc::now());

        assert!(matches!(result, Err(DashboardError::SourceUnavailable { .. })));
        assert!(!cache.path().exists(), "rejected download should not be cached");
        fs::remove_dir_all(&dir).expect("should clean test dir");
    }
}
