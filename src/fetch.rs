use crate::config::FetchConfig;
use crate::document::SlipDocument;
use crate::model::Platform;
use anyhow::Context;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Bookmaker wording for codes that resolve to an empty share page.
const NOT_FOUND_MARKERS: [&str; 4] = [
    "booking code not found",
    "code is invalid",
    "code has expired",
    "invalid booking code",
];

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("booking code {code} on {platform} is invalid or expired")]
    DocumentUnavailable { platform: Platform, code: String },
    #[error("access to the {platform} page was denied (status {status})")]
    AccessDenied { platform: Platform, status: u16 },
    #[error("fetching from {platform} timed out after {timeout_secs}s")]
    FetchTimeout { platform: Platform, timeout_secs: u64 },
    #[error("transport failure fetching from {platform}: {message}")]
    TransportFailure { platform: Platform, message: String },
    #[error("fetch from {platform} was cancelled")]
    Cancelled { platform: Platform },
    #[error("no page source configured for {platform}")]
    Unsupported { platform: Platform },
}

impl FetchError {
    /// Only transient failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::FetchTimeout { .. } | FetchError::TransportFailure { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::DocumentUnavailable { .. } => "document_unavailable",
            FetchError::AccessDenied { .. } => "access_denied",
            FetchError::FetchTimeout { .. } => "fetch_timeout",
            FetchError::TransportFailure { .. } => "transport_failure",
            FetchError::Cancelled { .. } => "cancelled",
            FetchError::Unsupported { .. } => "unsupported",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub platform: Platform,
    pub booking_code: String,
    pub source_url: String,
    pub body: String,
}

pub trait PageFetcher {
    fn fetch(&self, platform: Platform, code: &str) -> Result<FetchedDocument, FetchError>;
}

pub struct HttpPageFetcher {
    client: Client,
    config: FetchConfig,
    cancel: Arc<AtomicBool>,
}

impl HttpPageFetcher {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        for (k, v) in &config.headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .with_context(|| format!("invalid header name {k}"))?;
            let value =
                HeaderValue::from_str(v).with_context(|| format!("invalid header value for {k}"))?;
            headers.insert(name, value);
        }

        if let Some(user_agent) = &config.user_agent {
            headers.insert(USER_AGENT, HeaderValue::from_str(user_agent)?);
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            client,
            config: config.clone(),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Setting the flag aborts an in-progress fetch at its next poll.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch(&self, platform: Platform, code: &str) -> Result<FetchedDocument, FetchError> {
        let Some(platform_cfg) = self.config.platform(platform) else {
            return Err(FetchError::Unsupported { platform });
        };
        let url = platform_cfg.url_for(code);
        let timeout = Duration::from_secs(platform_cfg.timeout_secs);
        let deadline = Instant::now() + timeout;
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let timed_out = || FetchError::FetchTimeout {
            platform,
            timeout_secs: platform_cfg.timeout_secs,
        };

        let mut polls = 0usize;
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                return Err(FetchError::Cancelled { platform });
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(timed_out());
            }

            polls += 1;
            let response = self
                .client
                .get(&url)
                .timeout(remaining)
                .send()
                .map_err(|err| {
                    if err.is_timeout() {
                        timed_out()
                    } else {
                        FetchError::TransportFailure {
                            platform,
                            message: err.to_string(),
                        }
                    }
                })?;

            let status = response.status();
            check_status(platform, code, status, platform_cfg.timeout_secs)?;

            let body = response.text().map_err(|err| FetchError::TransportFailure {
                platform,
                message: err.to_string(),
            })?;
            if reports_missing_code(&body) {
                return Err(FetchError::DocumentUnavailable {
                    platform,
                    code: code.to_string(),
                });
            }

            let ready = match (&platform_cfg.content_indicator, platform_cfg.rendered) {
                (Some(indicator), true) => body.contains(indicator.as_str()),
                _ => true,
            };
            if ready {
                info!(%platform, %url, polls, bytes = body.len(), "fetched booking page");
                return Ok(FetchedDocument {
                    platform,
                    booking_code: code.to_string(),
                    source_url: url,
                    body,
                });
            }

            debug!(%platform, polls, "content indicator missing; polling again");
            let remaining = deadline.saturating_duration_since(Instant::now());
            std::thread::sleep(poll_interval.min(remaining));
        }
    }
}

/// Maps a non-success status to the fetch error callers act on.
pub fn check_status(
    platform: Platform,
    code: &str,
    status: StatusCode,
    timeout_secs: u64,
) -> Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => Err(FetchError::DocumentUnavailable {
            platform,
            code: code.to_string(),
        }),
        StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS => Err(FetchError::AccessDenied {
            platform,
            status: status.as_u16(),
        }),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            Err(FetchError::FetchTimeout {
                platform,
                timeout_secs,
            })
        }
        other => {
            warn!(%platform, status = %other, "unexpected status from booking page");
            Err(FetchError::TransportFailure {
                platform,
                message: format!("unexpected status {other}"),
            })
        }
    }
}

/// Whether the visible page text says the code does not exist. Script and
/// style contents are not read.
pub fn reports_missing_code(body: &str) -> bool {
    let lowered = SlipDocument::parse(body).text().to_lowercase();
    NOT_FOUND_MARKERS.iter().any(|m| lowered.contains(m))
}

/// Saved pages laid out as `<root>/<platform>/<code>.html` (or `.txt`).
pub struct FilePageFetcher {
    root: PathBuf,
}

impl FilePageFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PageFetcher for FilePageFetcher {
    fn fetch(&self, platform: Platform, code: &str) -> Result<FetchedDocument, FetchError> {
        let dir = self.root.join(platform.as_str());
        let Some(path) = ["html", "txt"]
            .iter()
            .map(|ext| dir.join(format!("{code}.{ext}")))
            .find(|p| p.exists())
        else {
            return Err(FetchError::DocumentUnavailable {
                platform,
                code: code.to_string(),
            });
        };

        let body =
            std::fs::read_to_string(&path).map_err(|err| FetchError::TransportFailure {
                platform,
                message: format!("failed to read {}: {err}", path.display()),
            })?;

        debug!(%platform, file = %path.display(), bytes = body.len(), "loaded saved booking page");

        Ok(FetchedDocument {
            platform,
            booking_code: code.to_string(),
            source_url: format!("file://{}", path.display()),
            body,
        })
    }
}
