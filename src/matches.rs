use crate::config::ExtractConfig;
use crate::dispatch::{MatchPattern, ParserRuleset, TEAM};
use crate::document::{
    SlipDocument, collapse_whitespace, decimals_in_range, floor_boundary, render_text,
};
use crate::model::{CandidateMatch, Market};
use regex::Regex;
use scraper::Selector;
use std::ops::Range;
use std::sync::LazyLock;
use tracing::debug;

static SHARING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)sharing\s*code").expect("sharing marker regex must compile"));

static CALENDAR_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4}").expect("calendar date regex must compile")
});

static LEADING_ORDINAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+\s*(?:\.|\)|st|nd|rd|th)?\s+").expect("ordinal regex must compile")
});

static ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]").expect("annotation regex must compile"));

static BETSLIP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?P<home>{TEAM})\s+(?:v|vs\.?)\s+(?P<away>{TEAM})"))
        .expect("betslip line regex must compile")
});

static MARKET_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(double\s+chance|both\s+teams\s+to\s+score|btts|gg/ng|asian\s+handicap|handicap|spread|over/under|total\s+goals|1X2|match\s+result|over|under)\b",
    )
    .expect("market keyword regex must compile")
});

static PICK_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[\s:])(home|away|draw|over|under|yes|no|gg|ng|1x|x2|12|1|x|2)(?:$|[\s,;)])")
        .expect("pick token regex must compile")
});

const BETSLIP_PATTERN_ID: &str = "betslip_display";

struct RawHit {
    span: Range<usize>,
    pattern_index: usize,
    pattern_id: &'static str,
    home: String,
    away: String,
    pick: String,
}

/// Candidate matches in bet-slip order.
///
/// The primary pass runs every ruleset pattern over the window that follows
/// the sharing-code marker, then the ruleset's fallback patterns if the
/// platform patterns kept nothing. When both find nothing the betslip
/// display region is scanned instead.
pub fn extract_matches(
    doc: &SlipDocument,
    ruleset: &ParserRuleset,
    config: &ExtractConfig,
) -> Vec<CandidateMatch> {
    let primary = extract_primary(doc, ruleset, config);
    if !primary.is_empty() {
        debug!(
            platform = %ruleset.platform,
            matches = primary.len(),
            "primary pass produced candidates"
        );
        return primary;
    }

    let secondary = extract_from_betslip_region(doc, ruleset, config);
    debug!(
        platform = %ruleset.platform,
        matches = secondary.len(),
        "primary pass empty; betslip display fallback ran"
    );
    secondary
}

fn extract_primary(
    doc: &SlipDocument,
    ruleset: &ParserRuleset,
    config: &ExtractConfig,
) -> Vec<CandidateMatch> {
    let kept = scan_window(doc, ruleset, &ruleset.patterns, config);
    if !kept.is_empty() || ruleset.fallback_patterns.is_empty() {
        return kept;
    }

    debug!(platform = %ruleset.platform, "platform patterns empty; trying fallback patterns");
    scan_window(doc, ruleset, &ruleset.fallback_patterns, config)
}

fn scan_window(
    doc: &SlipDocument,
    ruleset: &ParserRuleset,
    patterns: &[MatchPattern],
    config: &ExtractConfig,
) -> Vec<CandidateMatch> {
    let text = doc.text();
    let marker = SHARING_MARKER.find(text).map(|m| m.range());
    let window_start = marker.as_ref().map(|m| m.start).unwrap_or(0);
    let window_end = floor_boundary(text, window_start.saturating_add(config.window_cap));
    let window = &text[window_start..window_end];

    let mut pool = Vec::new();
    for (pattern_index, pattern) in patterns.iter().enumerate() {
        for caps in pattern.regex.captures_iter(window) {
            let (Some(whole), Some(home), Some(away)) =
                (caps.get(0), caps.name("home"), caps.name("away"))
            else {
                continue;
            };
            pool.push(RawHit {
                span: (window_start + whole.start())..(window_start + whole.end()),
                pattern_index,
                pattern_id: pattern.id,
                home: home.as_str().to_string(),
                away: away.as_str().to_string(),
                pick: caps
                    .name("pick")
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
            });
        }
    }
    pool.sort_by_key(|hit| (hit.span.start, hit.pattern_index));

    let mut kept: Vec<CandidateMatch> = Vec::new();
    for hit in pool {
        if marker
            .as_ref()
            .is_some_and(|m| hit.span.start < m.end && m.start < hit.span.end)
        {
            continue;
        }
        if CALENDAR_DATE.is_match(&text[hit.span.clone()]) {
            debug!(span = %&text[hit.span.clone()], "hit span contains a date; rejected");
            continue;
        }

        let home = clean_team_name(&hit.home);
        let away = clean_team_name(&hit.away);
        if !team_name_ok(&home, config) || !team_name_ok(&away, config) {
            continue;
        }

        // One fixture per stretch of text: the earliest, highest-ranked hit owns it.
        let overlaps = kept
            .iter()
            .any(|c| hit.span.start < c.source_end && c.source_offset < hit.span.end);
        if overlaps {
            continue;
        }

        kept.push(CandidateMatch {
            home_team_raw: home,
            away_team_raw: away,
            prediction_raw: hit.pick,
            source_offset: hit.span.start,
            source_end: hit.span.end,
            pattern_id: hit.pattern_id.to_string(),
            market: ruleset.market,
            odds_hint: None,
        });
    }

    kept
}

fn extract_from_betslip_region(
    doc: &SlipDocument,
    ruleset: &ParserRuleset,
    config: &ExtractConfig,
) -> Vec<CandidateMatch> {
    let Some((base, region)) = locate_betslip_region(doc, ruleset, config) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for caps in BETSLIP_LINE.captures_iter(&region) {
        let (Some(whole), Some(home), Some(away)) =
            (caps.get(0), caps.name("home"), caps.name("away"))
        else {
            continue;
        };

        let home = clean_team_name(home.as_str());
        let away = clean_team_name(away.as_str());
        if !team_name_ok(&home, config) || !team_name_ok(&away, config) {
            continue;
        }

        let tail_end = floor_boundary(&region, whole.end() + config.keyword_span);
        let tail = &region[whole.end()..tail_end];
        let Some(keyword) = MARKET_KEYWORD.find(tail) else {
            continue;
        };

        let after_keyword = &tail[keyword.end()..];
        let odds_hint = pick_hint_decimal(after_keyword, config);
        let Some(odds_hint) = odds_hint else {
            continue;
        };

        let prediction_raw = PICK_TOKEN
            .captures(after_keyword)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| keyword.as_str().to_string());

        out.push(CandidateMatch {
            home_team_raw: home,
            away_team_raw: away,
            prediction_raw,
            source_offset: base + whole.start(),
            source_end: base + whole.end(),
            pattern_id: BETSLIP_PATTERN_ID.to_string(),
            market: Market::from_keyword(keyword.as_str()),
            odds_hint: Some(odds_hint),
        });
    }

    out
}

/// First locator whose rendered text is long enough, with its offset in the
/// document text.
fn locate_betslip_region(
    doc: &SlipDocument,
    ruleset: &ParserRuleset,
    config: &ExtractConfig,
) -> Option<(usize, String)> {
    for locator in &ruleset.region_locators {
        let Ok(selector) = Selector::parse(locator) else {
            continue;
        };
        for element in doc.html().select(&selector) {
            let region = render_text(element);
            if region.len() <= config.region_min_len {
                continue;
            }
            let base = doc.text().find(&region).unwrap_or(0);
            debug!(locator, bytes = region.len(), "betslip region selected");
            return Some((base, region));
        }
    }
    None
}

/// Odds printed with two decimals beat lines such as `2.5`.
fn pick_hint_decimal(text: &str, config: &ExtractConfig) -> Option<f64> {
    let found = decimals_in_range(text, config.odds_min, config.odds_max);
    let two_places = found.iter().find(|(offset, _)| {
        text[*offset..]
            .split_once('.')
            .is_some_and(|(_, frac)| frac.chars().take_while(char::is_ascii_digit).count() >= 2)
    });
    two_places.or(found.first()).map(|(_, value)| *value)
}

/// Strips ordinals and annotations, collapses whitespace.
pub fn clean_team_name(raw: &str) -> String {
    let without_ordinal = LEADING_ORDINAL.replace(raw, "");
    let without_notes = ANNOTATION.replace_all(&without_ordinal, " ");
    collapse_whitespace(&without_notes)
        .trim_matches(|c: char| c == '.' || c == '-' || c == ':' || c.is_whitespace())
        .to_string()
}

fn team_name_ok(name: &str, config: &ExtractConfig) -> bool {
    name.chars().count() >= config.min_team_len
}
