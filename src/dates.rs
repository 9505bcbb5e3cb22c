use crate::config::DateConfig;
use crate::document::{SlipDocument, window};
use crate::model::{CandidateMatch, DateWarning};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Day/month/year + hour:minute layouts, tried in order.
static DATE_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("slash_full_year", r"\b(\d{1,2})/(\d{1,2})/(\d{4}),?\s+(\d{1,2}):(\d{2})\b"),
        ("dot_full_year", r"\b(\d{1,2})\.(\d{1,2})\.(\d{4}),?\s+(\d{1,2}):(\d{2})\b"),
        ("dash_full_year", r"\b(\d{1,2})-(\d{1,2})-(\d{4}),?\s+(\d{1,2}):(\d{2})\b"),
        ("slash_short_year", r"\b(\d{1,2})/(\d{1,2})/(\d{2}),?\s+(\d{1,2}):(\d{2})\b"),
    ]
    .into_iter()
    .map(|(name, pattern)| {
        (
            name,
            Regex::new(pattern).expect("kickoff date regex must compile"),
        )
    })
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kickoff {
    pub instant: DateTime<Utc>,
    pub warning: Option<DateWarning>,
}

/// Kickoff time printed near the match, if one survives validation.
pub fn extract_match_date(
    doc: &SlipDocument,
    candidate: &CandidateMatch,
    config: &DateConfig,
    now: DateTime<Utc>,
) -> Option<Kickoff> {
    let center = candidate.source_offset;
    let (start, slice) = window(doc.text(), center, config.window, config.window);

    for (name, pattern) in DATE_PATTERNS.iter() {
        let nearest = pattern
            .captures_iter(slice)
            .filter_map(|caps| {
                let offset = start + caps.get(0)?.start();
                Some((offset.abs_diff(center), caps))
            })
            .min_by_key(|(distance, _)| *distance);
        let Some((_, caps)) = nearest else {
            continue;
        };

        let Some(instant) = instant_from_fields(&caps) else {
            debug!(
                pattern = name,
                raw = %&caps[0],
                "kickoff fields out of range; discarded"
            );
            return None;
        };
        return gate_plausibility(instant, now, config, candidate);
    }

    None
}

/// Wall-clock fields taken verbatim as UTC; the bookmaker's displayed time is
/// canonical.
fn instant_from_fields(caps: &Captures<'_>) -> Option<DateTime<Utc>> {
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    let year_raw = caps.get(3)?.as_str();
    let mut year: i32 = year_raw.parse().ok()?;
    if year_raw.len() == 2 {
        year += 2000;
    }
    let hour: u32 = caps.get(4)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(5)?.as_str().parse().ok()?;

    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return None;
    }
    if hour > 23 || minute > 59 {
        return None;
    }

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}

fn gate_plausibility(
    instant: DateTime<Utc>,
    now: DateTime<Utc>,
    config: &DateConfig,
    candidate: &CandidateMatch,
) -> Option<Kickoff> {
    let hours_from_now = (instant - now).num_milliseconds() as f64 / 3_600_000.0;

    if hours_from_now < config.stale_hours {
        debug!(
            home = %candidate.home_team_raw,
            away = %candidate.away_team_raw,
            kickoff = %instant,
            hours_from_now,
            "kickoff too far in the past; discarded"
        );
        return None;
    }

    // TODO: calibrate the stale/recent-past boundary against scraped history.
    let warning = if hours_from_now < config.recent_past_hours {
        Some(DateWarning::RecentPast)
    } else if hours_from_now > config.far_future_hours {
        Some(DateWarning::FarFuture)
    } else {
        None
    };

    if let Some(flag) = warning {
        warn!(
            home = %candidate.home_team_raw,
            away = %candidate.away_team_raw,
            kickoff = %instant,
            hours_from_now,
            flag = ?flag,
            "suspicious kickoff time kept"
        );
    }

    Some(Kickoff { instant, warning })
}
