use crate::config::{EngineConfig, RetryConfig};
use crate::dates::extract_match_date;
use crate::dispatch::select_ruleset;
use crate::document::SlipDocument;
use crate::fetch::{FetchError, FetchedDocument, PageFetcher};
use crate::matches::extract_matches;
use crate::model::{
    CandidateMatch, Platform, Prediction, ResolvedMatch, ScrapeInput, SlipRecord,
};
use crate::odds::resolve_odds;
use crate::store::{TeamLookup, team_id};
use crate::totals::extract_totals;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

/// Turns one fetched booking page into a slip record.
///
/// Never fails: an empty match list or missing totals are valid outcomes
/// the caller decides how to handle.
pub fn extract_slip(
    input: &ScrapeInput,
    config: &EngineConfig,
    lookup: &dyn TeamLookup,
    now: DateTime<Utc>,
) -> SlipRecord {
    let doc = SlipDocument::parse(&input.document);
    let ruleset = select_ruleset(input.platform);
    let candidates = extract_matches(&doc, ruleset, &config.extract);

    let resolved = candidates
        .iter()
        .map(|candidate| resolve_candidate(&doc, candidate, config, lookup, now))
        .collect::<Vec<_>>();
    let matches = dedup_matches(resolved);

    let totals = extract_totals(&doc, &matches, &config.extract);
    let earliest_match_date = earliest_match_date(&matches);

    info!(
        platform = %input.platform,
        code = %input.booking_code,
        candidates = candidates.len(),
        matches = matches.len(),
        total_odds = ?totals.total_odds,
        stake = ?totals.stake,
        potential_win = ?totals.potential_win,
        "slip extracted"
    );

    SlipRecord {
        platform: input.platform,
        booking_code: input.booking_code.clone(),
        matches,
        total_odds: totals.total_odds,
        stake: totals.stake,
        potential_win: totals.potential_win,
        earliest_match_date,
    }
}

fn resolve_candidate(
    doc: &SlipDocument,
    candidate: &CandidateMatch,
    config: &EngineConfig,
    lookup: &dyn TeamLookup,
    now: DateTime<Utc>,
) -> ResolvedMatch {
    let odds = candidate
        .odds_hint
        .filter(|v| config.extract.odds_in_range(*v))
        .unwrap_or_else(|| resolve_odds(doc, candidate, &config.extract));
    let kickoff = extract_match_date(doc, candidate, &config.dates, now);

    ResolvedMatch {
        home_team: candidate.home_team_raw.clone(),
        away_team: candidate.away_team_raw.clone(),
        prediction: Prediction::normalize(&candidate.prediction_raw),
        market: candidate.market,
        odds,
        match_date: kickoff.map(|k| k.instant),
        date_warning: kickoff.and_then(|k| k.warning),
        home_team_id: resolve_team_id(lookup, &candidate.home_team_raw),
        away_team_id: resolve_team_id(lookup, &candidate.away_team_raw),
    }
}

/// Cache failures are logged and never reach the caller.
fn resolve_team_id(lookup: &dyn TeamLookup, name: &str) -> Option<String> {
    match lookup.lookup(name) {
        Ok(Some(id)) => return Some(id),
        Ok(None) => {}
        Err(err) => {
            warn!(team = %name, error = %err, "team lookup failed");
        }
    }

    let id = team_id(name);
    if let Err(err) = lookup.record(name, &id) {
        warn!(team = %name, error = %err, "team cache write failed; continuing");
    }
    Some(id)
}

/// Keeps the first occurrence of each `(home, away, date, odds)` tuple;
/// input order is bet-slip order.
pub fn dedup_matches(matches: Vec<ResolvedMatch>) -> Vec<ResolvedMatch> {
    let mut seen = HashSet::new();
    matches
        .into_iter()
        .filter(|m| seen.insert(m.dedup_key()))
        .collect()
}

pub fn earliest_match_date(matches: &[ResolvedMatch]) -> Option<DateTime<Utc>> {
    matches.iter().filter_map(|m| m.match_date).min()
}

/// Fetch then extract, retrying transient fetch failures with exponential
/// backoff. Non-retryable fetch errors surface immediately.
pub fn scrape_slip(
    fetcher: &dyn PageFetcher,
    platform: Platform,
    code: &str,
    config: &EngineConfig,
    lookup: &dyn TeamLookup,
) -> Result<SlipRecord, FetchError> {
    let document = fetch_with_retries(fetcher, platform, code, &config.retry)?;
    let input = ScrapeInput {
        platform,
        booking_code: code.to_string(),
        document: document.body,
    };
    Ok(extract_slip(&input, config, lookup, Utc::now()))
}

fn fetch_with_retries(
    fetcher: &dyn PageFetcher,
    platform: Platform,
    code: &str,
    retry: &RetryConfig,
) -> Result<FetchedDocument, FetchError> {
    let attempts = retry.attempts.max(1);
    let mut backoff = Duration::from_millis(retry.backoff_ms);

    for attempt in 1..=attempts {
        match fetcher.fetch(platform, code) {
            Ok(doc) => return Ok(doc),
            Err(err) if err.is_retryable() && attempt < attempts => {
                warn!(
                    %platform,
                    code,
                    attempt,
                    kind = err.kind(),
                    error = %err,
                    "fetch failed; retrying"
                );
                std::thread::sleep(backoff);
                backoff = backoff.saturating_mul(2);
            }
            Err(err) => return Err(err),
        }
    }

    Err(FetchError::TransportFailure {
        platform,
        message: format!("fetch failed after {attempts} attempts"),
    })
}
