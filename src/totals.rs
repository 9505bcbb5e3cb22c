use crate::config::ExtractConfig;
use crate::document::{
    SlipDocument, decimals_in_range, element_text, floor_boundary, has_team_separator,
    near_team_separator, parse_amount, window,
};
use crate::model::{ResolvedMatch, SlipTotals, round_odds};
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use tracing::debug;

static ODDS_ELEMENTS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[class*='odd'], [id*='odd'], [data-total-odds], [data-odds]")
        .expect("odds element selector must parse")
});

static LONE_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+$").expect("lone decimal regex must compile"));

static BOOKING_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)booking\s*code").expect("booking code regex must compile"));

static ODDS_DIRECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bodds\s+(\d+\.\d+)").expect("odds direct regex must compile")
});

static ODDS_COLON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bodds\s*:\s*(\d+\.\d+)").expect("odds colon regex must compile")
});

static ODDS_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bodds\b").expect("odds token regex must compile"));

static MAX_BONUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)max\.?\s*bonus").expect("max bonus regex must compile"));

static LABELLED_TOTAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:total|combined|accumulator|acca)\s+odds\s*:?\s*(\d+\.\d+)")
        .expect("labelled total regex must compile")
});

static ODDS_BEFORE_BONUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bodds\s*:?\s*(\d+\.\d+)\s*max\.?\s*bonus")
        .expect("odds before bonus regex must compile")
});

static SUMMARY_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:stake|potential\s+win|possible\s+win|to\s+win)\b")
        .expect("summary anchor regex must compile")
});

static SUMMARY_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:odds|summary|total)\b").expect("summary keyword regex must compile")
});

static STAKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bstake\b[:\s]\s*(?:[a-z]{3}\s*|[₦$€£]\s*)?(\d[\d,]*(?:\.\d+)?)")
        .expect("stake regex must compile")
});

static POTENTIAL_WIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:potential|possible)\s+win(?:nings?)?\b\s*:?\s*(?:[a-z]{3}\s*|[₦$€£]\s*)?(\d[\d,]*(?:\.\d+)?)",
    )
    .expect("potential win regex must compile")
});

static TO_WIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bto\s+win\b\s*:?\s*(?:[a-z]{3}\s*|[₦$€£]\s*)?(\d[\d,]*(?:\.\d+)?)")
        .expect("to win regex must compile")
});

static WIN_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d[\d,]*(?:\.\d+)?)\s*~\s*(\d[\d,]*(?:\.\d+)?)")
        .expect("win range regex must compile")
});

/// Keyword must sit this close to a summary-zone decimal.
const SUMMARY_KEYWORD_REACH: usize = 30;

/// Bytes after an `Odds` token searched for a `Max Bonus` label.
const BONUS_REACH: usize = 80;

/// Everything one total-odds strategy may look at.
pub struct TotalsContext<'a> {
    pub doc: &'a SlipDocument,
    pub config: &'a ExtractConfig,
}

type TotalOddsStrategy = fn(&TotalsContext<'_>) -> Option<f64>;

const TOTAL_ODDS_STRATEGIES: [(&str, TotalOddsStrategy); 6] = [
    ("odds_element", odds_element),
    ("header_zone_keyword", header_zone_keyword),
    ("labelled_total", labelled_total),
    ("odds_before_bonus", odds_before_bonus),
    ("summary_zone", summary_zone),
    ("header_zone_first", header_zone_first),
];

/// Slip-level combined odds, stake and payout.
pub fn extract_totals(
    doc: &SlipDocument,
    matches: &[ResolvedMatch],
    config: &ExtractConfig,
) -> SlipTotals {
    let ctx = TotalsContext { doc, config };

    let explicit = TOTAL_ODDS_STRATEGIES.iter().find_map(|(name, strategy)| {
        let value = strategy(&ctx).filter(|v| config.odds_in_range(*v))?;
        debug!(strategy = name, total_odds = value, "explicit total odds found");
        Some(value)
    });

    let total_odds = explicit.or_else(|| computed_total_odds(matches));
    let stake = extract_stake(doc.text());
    let potential_win = extract_potential_win(doc.text());

    SlipTotals {
        total_odds,
        stake,
        potential_win,
    }
}

/// Product of per-match odds; `None` for an empty slip.
pub fn computed_total_odds(matches: &[ResolvedMatch]) -> Option<f64> {
    if matches.is_empty() {
        return None;
    }
    Some(round_odds(matches.iter().map(|m| m.odds).product()))
}

pub fn extract_stake(text: &str) -> Option<f64> {
    STAKE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_amount(m.as_str()))
}

pub fn extract_potential_win(text: &str) -> Option<f64> {
    [&*POTENTIAL_WIN, &*TO_WIN]
        .into_iter()
        .find_map(|re| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .and_then(|m| parse_amount(m.as_str()))
        })
        .or_else(|| {
            WIN_RANGE
                .captures(text)
                .and_then(|c| c.get(2))
                .and_then(|m| parse_amount(m.as_str()))
        })
}

/// In range and clear of any team pairing within `radius`.
fn qualifies(ctx: &TotalsContext<'_>, offset: usize, value: f64, radius: usize) -> bool {
    if !ctx.config.odds_in_range(value) {
        return false;
    }
    let end = offset + value_width(ctx.doc.text(), offset);
    !near_team_separator(ctx.doc.text(), offset, end, radius)
}

fn value_width(text: &str, offset: usize) -> usize {
    text[offset..]
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len() - offset)
}

fn header_zone<'a>(ctx: &TotalsContext<'a>) -> Option<(usize, &'a str)> {
    let anchor = BOOKING_CODE.find(ctx.doc.text())?;
    let size = ctx.config.header_zone;
    Some(window(ctx.doc.text(), anchor.start(), size, size))
}

/// An odds-styled element holding nothing but a decimal, outside any match row.
pub fn odds_element(ctx: &TotalsContext<'_>) -> Option<f64> {
    for element in ctx.doc.html().select(&ODDS_ELEMENTS) {
        let text = element_text(element);
        if !LONE_DECIMAL.is_match(&text) {
            continue;
        }
        let Ok(value) = text.parse::<f64>() else {
            continue;
        };
        if !ctx.config.odds_in_range(value) {
            continue;
        }
        let parent_text = element
            .parent()
            .and_then(ElementRef::wrap)
            .map(element_text)
            .unwrap_or_default();
        if has_team_separator(&parent_text) {
            continue;
        }
        return Some(value);
    }
    None
}

/// `Odds <decimal>`, `Odds: <decimal>`, `Odds ... Max Bonus`, then any
/// decimal after an `Odds` token, all within the booking-code header.
pub fn header_zone_keyword(ctx: &TotalsContext<'_>) -> Option<f64> {
    let (zone_start, zone) = header_zone(ctx)?;
    let radius = ctx.config.header_guard;
    let accept = |offset: usize, raw: &str| -> Option<f64> {
        let value = raw.parse::<f64>().ok()?;
        qualifies(ctx, zone_start + offset, value, radius).then_some(value)
    };

    for re in [&*ODDS_DIRECT, &*ODDS_COLON] {
        for caps in re.captures_iter(zone) {
            let Some(m) = caps.get(1) else {
                continue;
            };
            if let Some(value) = accept(m.start(), m.as_str()) {
                return Some(value);
            }
        }
    }

    for token in ODDS_TOKEN.find_iter(zone) {
        let reach = floor_boundary(zone, token.end() + BONUS_REACH);
        let Some(bonus) = MAX_BONUS.find(&zone[token.end()..reach]) else {
            continue;
        };
        let span = &zone[token.end()..token.end() + bonus.start()];
        for (offset, value) in decimals_in_range(span, ctx.config.odds_min, ctx.config.odds_max) {
            if qualifies(ctx, zone_start + token.end() + offset, value, radius) {
                return Some(value);
            }
        }
    }

    for token in ODDS_TOKEN.find_iter(zone) {
        let reach = floor_boundary(zone, token.end() + ctx.config.keyword_span);
        let after = &zone[token.end()..reach];
        for (offset, value) in decimals_in_range(after, ctx.config.odds_min, ctx.config.odds_max) {
            if qualifies(ctx, zone_start + token.end() + offset, value, radius) {
                return Some(value);
            }
        }
    }

    None
}

pub fn labelled_total(ctx: &TotalsContext<'_>) -> Option<f64> {
    LABELLED_TOTAL
        .captures_iter(ctx.doc.text())
        .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
        .find(|v| ctx.config.odds_in_range(*v))
}

pub fn odds_before_bonus(ctx: &TotalsContext<'_>) -> Option<f64> {
    ODDS_BEFORE_BONUS
        .captures_iter(ctx.doc.text())
        .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
        .find(|v| ctx.config.odds_in_range(*v))
}

/// Decimal in the stake/payout summary labelled as odds or total.
pub fn summary_zone(ctx: &TotalsContext<'_>) -> Option<f64> {
    let text = ctx.doc.text();
    let anchor = SUMMARY_ANCHOR.find(text)?;
    let size = ctx.config.summary_zone;
    let (zone_start, zone) = window(text, anchor.start(), size, size);

    let keywords = SUMMARY_KEYWORD
        .find_iter(zone)
        .map(|m| m.range())
        .collect::<Vec<_>>();
    if keywords.is_empty() {
        return None;
    }

    decimals_in_range(zone, ctx.config.odds_min, ctx.config.odds_max)
        .into_iter()
        .find(|(offset, value)| {
            let labelled = keywords.iter().any(|k| {
                offset.abs_diff(k.end) <= SUMMARY_KEYWORD_REACH
                    || offset.abs_diff(k.start) <= SUMMARY_KEYWORD_REACH
            });
            labelled && qualifies(ctx, zone_start + offset, *value, ctx.config.summary_guard)
        })
        .map(|(_, v)| v)
}

/// First decimal in the booking-code header clear of match rows.
pub fn header_zone_first(ctx: &TotalsContext<'_>) -> Option<f64> {
    let (zone_start, zone) = header_zone(ctx)?;
    decimals_in_range(zone, ctx.config.odds_min, ctx.config.odds_max)
        .into_iter()
        .find(|(offset, value)| {
            qualifies(ctx, zone_start + offset, *value, ctx.config.header_guard)
        })
        .map(|(_, v)| v)
}
