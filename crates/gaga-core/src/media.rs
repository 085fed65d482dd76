//! HTTP download of remote media for the `fetch` command.

use std::{sync::OnceLock, time::Duration};

use async_trait::async_trait;
use regex::Regex;
use reqwest::{header::CONTENT_TYPE, StatusCode, Url};
use tracing::debug;

use crate::{
    errors::Error,
    messaging::types::{MediaKind, MediaPayload},
    ports::{MediaFetchError, MediaSource},
    Result,
};

pub const DEFAULT_MAX_MEDIA_BYTES: u64 = 50 * 1024 * 1024;
const HEAD_TIMEOUT: Duration = Duration::from_secs(10);
const GET_TIMEOUT: Duration = Duration::from_secs(30);
const FALLBACK_FILE_NAME: &str = "downloaded_file";

#[derive(Clone, Debug)]
pub struct HttpMediaSource {
    http: reqwest::Client,
    max_bytes: u64,
}

impl HttpMediaSource {
    pub fn new(max_bytes: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gaga/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::External(format!("media client build error: {e}")))?;
        Ok(Self { http, max_bytes })
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }
}

#[async_trait]
impl MediaSource for HttpMediaSource {
    async fn fetch(&self, url: &str) -> std::result::Result<MediaPayload, MediaFetchError> {
        let parsed = validate_url(url)?;

        // Size probe. Servers that refuse HEAD are downloaded anyway and
        // checked after the fact.
        let head = self
            .http
            .head(parsed.clone())
            .timeout(HEAD_TIMEOUT)
            .send()
            .await
            .map_err(map_request_error)?;
        let head_status = head.status();
        if head_status.is_success() {
            if let Some(len) = head.content_length().filter(|&n| n > 0) {
                if len > self.max_bytes {
                    return Err(MediaFetchError::TooLarge {
                        size: len,
                        max: self.max_bytes,
                    });
                }
            }
        } else if !matches!(
            head_status,
            StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
        ) {
            return Err(MediaFetchError::Status(head_status.as_u16()));
        }
        let head_mime = content_type(head.headers());

        let resp = self
            .http
            .get(parsed.clone())
            .timeout(GET_TIMEOUT)
            .send()
            .await
            .map_err(map_request_error)?;
        if !resp.status().is_success() {
            return Err(MediaFetchError::Status(resp.status().as_u16()));
        }

        let mime_type = content_type(resp.headers())
            .or(head_mime)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let bytes = resp.bytes().await.map_err(map_request_error)?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(MediaFetchError::TooLarge {
                size: bytes.len() as u64,
                max: self.max_bytes,
            });
        }

        debug!(url = %parsed, size = bytes.len(), mime = %mime_type, "media downloaded");
        Ok(MediaPayload {
            kind: MediaKind::from_mime(&mime_type),
            bytes: bytes.to_vec(),
            file_name: file_name_from_url(&parsed),
            mime_type,
            caption: None,
        })
    }
}

/// Accepts absolute http(s) URLs only.
pub fn validate_url(url: &str) -> std::result::Result<Url, MediaFetchError> {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    let re = URL_RE.get_or_init(|| Regex::new(r"(?i)^https?://.+").expect("valid regex"));

    let url = url.trim();
    if !re.is_match(url) {
        return Err(MediaFetchError::InvalidUrl(url.to_string()));
    }
    Url::parse(url).map_err(|_| MediaFetchError::InvalidUrl(url.to_string()))
}

/// Last non-empty path segment, or a generic name.
pub fn file_name_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|segs| segs.filter(|s| !s.is_empty()).last())
        .map(|s| s.to_string())
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

fn content_type(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn map_request_error(e: reqwest::Error) -> MediaFetchError {
    if e.is_timeout() {
        MediaFetchError::Timeout
    } else if e.is_connect() {
        MediaFetchError::Unreachable(e.to_string())
    } else if let Some(status) = e.status() {
        MediaFetchError::Status(status.as_u16())
    } else {
        MediaFetchError::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn rejects_non_http_urls() {
        for bad in ["ftp://x.com/a", "example.com/a.png", "http://", ""] {
            assert!(
                matches!(validate_url(bad), Err(MediaFetchError::InvalidUrl(_))),
                "{bad:?}"
            );
        }
        assert!(validate_url("HTTPS://example.com/a.png").is_ok());
    }

    #[test]
    fn file_name_uses_last_segment_without_query() {
        let u = Url::parse("https://x.com/files/cat.png?size=large").unwrap();
        assert_eq!(file_name_from_url(&u), "cat.png");
        let u = Url::parse("https://x.com/").unwrap();
        assert_eq!(file_name_from_url(&u), "downloaded_file");
        let u = Url::parse("https://x.com/dir/").unwrap();
        assert_eq!(file_name_from_url(&u), "dir");
    }

    #[tokio::test]
    async fn downloads_and_classifies_media() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/files/cat.png"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/cat.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png; charset=binary")
                    .set_body_bytes(vec![0x89, b'P', b'N', b'G']),
            )
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpMediaSource::new(DEFAULT_MAX_MEDIA_BYTES).unwrap();
        let media = source
            .fetch(&format!("{}/files/cat.png?x=1", server.uri()))
            .await
            .unwrap();

        assert_eq!(media.kind, MediaKind::Image);
        assert_eq!(media.mime_type, "image/png");
        assert_eq!(media.file_name, "cat.png");
        assert_eq!(media.bytes.len(), 4);
        assert!(media.caption.is_none());
    }

    #[tokio::test]
    async fn not_found_maps_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = HttpMediaSource::new(DEFAULT_MAX_MEDIA_BYTES).unwrap();
        let err = source
            .fetch(&format!("{}/missing.mp4", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err, MediaFetchError::Status(404));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 10]))
            .mount(&server)
            .await;

        let source = HttpMediaSource::new(4).unwrap();
        let err = source
            .fetch(&format!("{}/big.bin", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err, MediaFetchError::TooLarge { size: 10, max: 4 });
    }
}
