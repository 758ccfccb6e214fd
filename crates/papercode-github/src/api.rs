//! GitHub contents API client

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use papercode_core::{Retryable, SHARED_RUNTIME, http_client, retry_with_backoff};
use serde::Deserialize;

/// Error fetching one repository file.
#[derive(Debug)]
pub enum FetchError {
    /// Repository or file does not exist
    NotFound,
    /// API quota exhausted (429)
    RateLimited,
    /// Other HTTP failure
    Http {
        status: Option<u16>,
        message: String,
    },
    /// Response was not the expected JSON envelope / base64 payload
    Decode(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::RateLimited => write!(f, "rate limited"),
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited => true,
            Self::Http { status, .. } => matches!(status, None | Some(500..=599)),
            Self::NotFound | Self::Decode(_) => false,
        }
    }
}

/// Fetches one file from a hosted repository. Seam for tests and for the
/// extractor's crawl loop.
pub trait RepoFetcher {
    /// Decoded file content, or `FetchError::NotFound` when the file (or the
    /// whole repository) does not exist.
    fn read_file(&self, owner: &str, repo: &str, path: &str) -> Result<String, FetchError>;
}

/// Contents-API response envelope: `content`, optionally base64-encoded.
#[derive(Deserialize)]
struct ContentsEnvelope {
    content: String,
    encoding: Option<String>,
}

pub struct GithubClient {
    api_url: String,
    token: Option<String>,
    max_retries: u32,
}

impl GithubClient {
    pub fn new(api_url: impl Into<String>, token: Option<String>, max_retries: u32) -> Self {
        Self {
            api_url: api_url.into(),
            token,
            max_retries,
        }
    }

    /// Single GET attempt, status mapped onto the fetch taxonomy.
    fn get(&self, url: &str) -> Result<String, FetchError> {
        SHARED_RUNTIME.handle().block_on(async {
            let mut req = http_client().get(url).header("User-Agent", "papercode");
            if let Some(token) = &self.token {
                req = req.header("Authorization", format!("Bearer {token}"));
            }
            let result = req.send().await.and_then(|r| r.error_for_status());
            match result {
                Ok(resp) => resp.text().await.map_err(|e| FetchError::Http {
                    status: None,
                    message: e.to_string(),
                }),
                Err(e) => Err(match e.status().map(|s| s.as_u16()) {
                    Some(404) => FetchError::NotFound,
                    Some(429) => FetchError::RateLimited,
                    status => FetchError::Http {
                        status,
                        message: e.to_string(),
                    },
                }),
            }
        })
    }
}

impl RepoFetcher for GithubClient {
    fn read_file(&self, owner: &str, repo: &str, path: &str) -> Result<String, FetchError> {
        let url = format!("{}/repos/{owner}/{repo}/contents/{path}", self.api_url);
        let label = format!("{owner}/{repo}/{path}");
        let body = retry_with_backoff(&label, self.max_retries, || self.get(&url))?;

        let envelope: ContentsEnvelope = serde_json::from_str(&body)
            .map_err(|e| FetchError::Decode(format!("{label}: {e}")))?;

        if envelope.encoding.as_deref() == Some("base64") {
            // The API wraps base64 payloads with newlines
            let compact: String = envelope
                .content
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            let bytes = BASE64
                .decode(compact)
                .map_err(|e| FetchError::Decode(format!("{label}: {e}")))?;
            String::from_utf8(bytes).map_err(|e| FetchError::Decode(format!("{label}: {e}")))
        } else {
            Ok(envelope.content)
        }
    }
}
