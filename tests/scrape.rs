use anyhow::{Result, anyhow};
use chrono::{TimeZone, Utc};
use slipscan::config::{EngineConfig, FetchConfig};
use reqwest::StatusCode;
use slipscan::fetch::{
    FetchError, FetchedDocument, FilePageFetcher, HttpPageFetcher, PageFetcher, check_status,
    reports_missing_code,
};
use slipscan::model::{Platform, ScrapeInput};
use slipscan::pipeline::{extract_slip, scrape_slip};
use slipscan::store::{MemoryTeamLookup, NoopTeamLookup, TeamLookup, team_id};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::tempdir;

const SLIP: &str = r#"<html><body>
<p>Sharing code</p>
<p>Arsenal - Chelsea prematch Home</p>
<p>1.85</p>
</body></html>"#;

/// Fails with `error` for the first `failures` calls, then serves `SLIP`.
struct ScriptedFetcher {
    failures: usize,
    error: fn(Platform) -> FetchError,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    fn new(failures: usize, error: fn(Platform) -> FetchError) -> Self {
        Self {
            failures,
            error,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageFetcher for ScriptedFetcher {
    fn fetch(&self, platform: Platform, code: &str) -> Result<FetchedDocument, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err((self.error)(platform));
        }
        Ok(FetchedDocument {
            platform,
            booking_code: code.to_string(),
            source_url: format!("memory://{platform}/{code}"),
            body: SLIP.to_string(),
        })
    }
}

fn transport(platform: Platform) -> FetchError {
    FetchError::TransportFailure {
        platform,
        message: "connection reset".to_string(),
    }
}

fn unavailable(platform: Platform) -> FetchError {
    FetchError::DocumentUnavailable {
        platform,
        code: "ABC123".to_string(),
    }
}

fn fast_retry_config(attempts: u8) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.retry.attempts = attempts;
    config.retry.backoff_ms = 0;
    config
}

#[test]
fn transient_failures_are_retried() -> Result<()> {
    let fetcher = ScriptedFetcher::new(2, transport);

    let record = scrape_slip(
        &fetcher,
        Platform::Sportybet,
        "ABC123",
        &fast_retry_config(3),
        &NoopTeamLookup,
    )?;

    assert_eq!(fetcher.calls(), 3);
    assert_eq!(record.booking_code, "ABC123");
    assert_eq!(record.matches.len(), 1);
    assert_eq!(record.matches[0].odds, 1.85);

    Ok(())
}

#[test]
fn retries_stop_after_configured_attempts() -> Result<()> {
    let fetcher = ScriptedFetcher::new(5, transport);

    let err = scrape_slip(
        &fetcher,
        Platform::Betking,
        "ABC123",
        &fast_retry_config(3),
        &NoopTeamLookup,
    )
    .err()
    .ok_or_else(|| anyhow!("scrape should fail"))?;

    assert_eq!(fetcher.calls(), 3);
    assert_eq!(err.kind(), "transport_failure");

    Ok(())
}

#[test]
fn unavailable_codes_are_not_retried() -> Result<()> {
    let fetcher = ScriptedFetcher::new(1, unavailable);

    let err = scrape_slip(
        &fetcher,
        Platform::Bet9ja,
        "ABC123",
        &fast_retry_config(3),
        &NoopTeamLookup,
    )
    .err()
    .ok_or_else(|| anyhow!("scrape should fail"))?;

    assert_eq!(fetcher.calls(), 1);
    assert!(matches!(err, FetchError::DocumentUnavailable { .. }));
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("invalid or expired"));

    Ok(())
}

#[test]
fn saved_pages_are_served_by_platform_and_code() -> Result<()> {
    let temp = tempdir()?;
    fs::create_dir_all(temp.path().join("sportybet"))?;
    fs::write(temp.path().join("sportybet/ABC123.html"), SLIP)?;

    let fetcher = FilePageFetcher::new(temp.path());
    let record = scrape_slip(
        &fetcher,
        Platform::Sportybet,
        "ABC123",
        &EngineConfig::default(),
        &NoopTeamLookup,
    )?;
    assert_eq!(record.matches.len(), 1);

    let missing = fetcher
        .fetch(Platform::Sportybet, "NOPE")
        .err()
        .ok_or_else(|| anyhow!("missing page should fail"))?;
    assert_eq!(missing.kind(), "document_unavailable");

    Ok(())
}

struct BrokenLookup;

impl TeamLookup for BrokenLookup {
    fn lookup(&self, _name: &str) -> Result<Option<String>> {
        Err(anyhow!("store offline"))
    }

    fn record(&self, _name: &str, _id: &str) -> Result<()> {
        Err(anyhow!("store offline"))
    }
}

#[test]
fn lookup_failures_never_block_extraction() -> Result<()> {
    let input = ScrapeInput {
        platform: Platform::Sportybet,
        booking_code: "ABC123".to_string(),
        document: SLIP.to_string(),
    };
    let now = Utc.with_ymd_and_hms(2025, 12, 20, 9, 0, 0).unwrap();

    let record = extract_slip(&input, &EngineConfig::default(), &BrokenLookup, now);

    assert_eq!(record.matches.len(), 1);
    assert_eq!(
        record.matches[0].home_team_id.as_deref(),
        Some(team_id("Arsenal").as_str())
    );

    Ok(())
}

#[test]
fn lookup_cache_is_filled_during_extraction() -> Result<()> {
    let input = ScrapeInput {
        platform: Platform::Sportybet,
        booking_code: "ABC123".to_string(),
        document: SLIP.to_string(),
    };
    let now = Utc.with_ymd_and_hms(2025, 12, 20, 9, 0, 0).unwrap();
    let lookup = MemoryTeamLookup::default();
    lookup.record("chelsea", "chelsea-fc")?;

    let record = extract_slip(&input, &EngineConfig::default(), &lookup, now);

    assert_eq!(lookup.len(), 2);
    assert_eq!(record.matches[0].away_team_id.as_deref(), Some("chelsea-fc"));
    assert_eq!(lookup.lookup("ARSENAL")?, Some(team_id("arsenal")));

    Ok(())
}

#[test]
fn http_fetcher_honours_cancel_and_unconfigured_platforms() -> Result<()> {
    let fetcher = HttpPageFetcher::new(&FetchConfig::default())?;

    let unsupported = fetcher
        .fetch(Platform::Other, "ABC123")
        .err()
        .ok_or_else(|| anyhow!("other has no page source"))?;
    assert_eq!(unsupported.kind(), "unsupported");

    fetcher.cancel_handle().store(true, Ordering::SeqCst);
    let cancelled = fetcher
        .fetch(Platform::Sportybet, "ABC123")
        .err()
        .ok_or_else(|| anyhow!("cancelled fetch should fail"))?;
    assert!(matches!(cancelled, FetchError::Cancelled { .. }));
    assert!(!cancelled.is_retryable());

    Ok(())
}

#[test]
fn gateway_timeouts_report_the_platform_timeout() -> Result<()> {
    let timeout_secs = FetchConfig::default()
        .platform(Platform::Bet9ja)
        .map(|cfg| cfg.timeout_secs)
        .ok_or_else(|| anyhow!("bet9ja has a page source"))?;

    for status in [StatusCode::REQUEST_TIMEOUT, StatusCode::GATEWAY_TIMEOUT] {
        let err = check_status(Platform::Bet9ja, "ABC123", status, timeout_secs)
            .err()
            .ok_or_else(|| anyhow!("{status} should fail"))?;
        assert!(matches!(
            err,
            FetchError::FetchTimeout { timeout_secs: secs, .. } if secs == timeout_secs
        ));
        assert!(err.is_retryable());
    }

    assert!(check_status(Platform::Bet9ja, "ABC123", StatusCode::OK, timeout_secs).is_ok());

    Ok(())
}

#[test]
fn missing_code_wording_only_counts_when_visible() -> Result<()> {
    let scripted = r#"<html><head><script>
var messages = { missing: "Booking code not found" };
</script></head><body>
<p>Sharing code</p>
<p>Arsenal - Chelsea prematch Home</p>
</body></html>"#;
    assert!(!reports_missing_code(scripted));

    let visible = "<html><body><p>Sorry, this booking code not found.</p></body></html>";
    assert!(reports_missing_code(visible));

    Ok(())
}
