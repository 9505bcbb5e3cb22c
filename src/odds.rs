use crate::config::ExtractConfig;
use crate::document::{
    SlipDocument, contains_ignore_case, decimals_in_range, element_text, floor_boundary,
    team_pattern, window,
};
use crate::model::{CandidateMatch, SENTINEL_ODDS};
use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;
use tracing::debug;

static ALL_ELEMENTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("*").expect("universal selector must parse"));

static ODDS_ATTRIBUTE_ELEMENTS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[data-odds], [data-odd], [data-price], [data-odd-value], [data-coef]")
        .expect("odds attribute selector must parse")
});

static MARKET_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:1X2|Over|Under|BTTS)\b").expect("market keyword regex must compile")
});

const ODDS_ATTRIBUTES: [&str; 5] = [
    "data-odds",
    "data-odd",
    "data-price",
    "data-odd-value",
    "data-coef",
];

/// Everything one strategy may look at.
pub struct OddsContext<'a> {
    pub doc: &'a SlipDocument,
    pub candidate: &'a CandidateMatch,
    pub config: &'a ExtractConfig,
}

type OddsStrategy = fn(&OddsContext<'_>) -> Option<f64>;

/// Least ambiguous first.
const STRATEGIES: [(&str, OddsStrategy); 6] = [
    ("single_team_element", single_team_element),
    ("betslip_text", betslip_text),
    ("dual_team_proximity", dual_team_proximity),
    ("windowed_nearest", windowed_nearest),
    ("market_qualified", market_qualified),
    ("odds_attribute", odds_attribute),
];

/// Decimal odds for one match, or [`SENTINEL_ODDS`] when every strategy fails.
pub fn resolve_odds(
    doc: &SlipDocument,
    candidate: &CandidateMatch,
    config: &ExtractConfig,
) -> f64 {
    let ctx = OddsContext {
        doc,
        candidate,
        config,
    };

    for (name, strategy) in STRATEGIES {
        if let Some(value) = strategy(&ctx).filter(|v| config.odds_in_range(*v)) {
            debug!(
                home = %candidate.home_team_raw,
                away = %candidate.away_team_raw,
                strategy = name,
                odds = value,
                "odds resolved"
            );
            return value;
        }
    }

    debug!(
        home = %candidate.home_team_raw,
        away = %candidate.away_team_raw,
        "no odds strategy succeeded"
    );
    SENTINEL_ODDS
}

fn first_in_range(text: &str, config: &ExtractConfig) -> Option<f64> {
    decimals_in_range(text, config.odds_min, config.odds_max)
        .first()
        .map(|(_, v)| *v)
}

/// In-range decimals of `slice` (which starts at `base` in the document
/// text), leaving out lines printed inside the matched row such as the `2.5`
/// of `Over 2.5`.
fn odds_outside_pick(ctx: &OddsContext<'_>, base: usize, slice: &str) -> Vec<(usize, f64)> {
    let pick = ctx.candidate.source_offset..ctx.candidate.source_end;
    decimals_in_range(slice, ctx.config.odds_min, ctx.config.odds_max)
        .into_iter()
        .map(|(offset, value)| (base + offset, value))
        .filter(|(offset, _)| !pick.contains(offset))
        .collect()
}

/// Every `home v away` pairing in the text, nearest the match offset first.
fn pairings_nearest_first<'t>(ctx: &OddsContext<'_>, text: &'t str) -> Vec<regex::Match<'t>> {
    let Ok(pair) = Regex::new(&format!(
        r"(?i){}\s+vs?\.?\s+{}",
        team_pattern(&ctx.candidate.home_team_raw),
        team_pattern(&ctx.candidate.away_team_raw)
    )) else {
        return Vec::new();
    };
    let center = ctx.candidate.source_offset;
    let mut found = pair.find_iter(text).collect::<Vec<_>>();
    found.sort_by_key(|m| m.start().abs_diff(center));
    found
}

/// Smallest element naming exactly one of the two teams next to a decimal.
/// Text naming both teams is a combined row and is skipped.
pub fn single_team_element(ctx: &OddsContext<'_>) -> Option<f64> {
    let home = &ctx.candidate.home_team_raw;
    let away = &ctx.candidate.away_team_raw;

    let mut best: Option<(usize, f64)> = None;
    for element in ctx.doc.html().select(&ALL_ELEMENTS) {
        let text = element_text(element);
        if text.is_empty() || text.len() > ctx.config.element_text_max {
            continue;
        }
        let has_home = contains_ignore_case(&text, home);
        let has_away = contains_ignore_case(&text, away);
        if has_home == has_away {
            continue;
        }
        let Some(value) = first_in_range(&text, ctx.config) else {
            continue;
        };
        if best.is_none_or(|(len, _)| text.len() < len) {
            best = Some((text.len(), value));
        }
    }
    best.map(|(_, v)| v)
}

/// `home v away ... <decimal>` as printed in betslip displays. The pairing
/// nearest the match offset is read first.
pub fn betslip_text(ctx: &OddsContext<'_>) -> Option<f64> {
    let text = ctx.doc.text();
    pairings_nearest_first(ctx, text).into_iter().find_map(|m| {
        let end = floor_boundary(text, m.end() + ctx.config.betslip_span);
        odds_outside_pick(ctx, m.end(), &text[m.end()..end])
            .first()
            .map(|(_, v)| *v)
    })
}

/// Both names close together, then the nearest decimal after the away team,
/// or failing that before the home team. Pairings nearest the match offset
/// are tried first so repeated fixtures keep their own odds.
pub fn dual_team_proximity(ctx: &OddsContext<'_>) -> Option<f64> {
    let span = ctx.config.dual_team_span;
    let home = Regex::new(&format!(
        "(?i){}",
        team_pattern(&ctx.candidate.home_team_raw)
    ))
    .ok()?;
    let away = Regex::new(&format!(
        "(?i){}",
        team_pattern(&ctx.candidate.away_team_raw)
    ))
    .ok()?;
    let text = ctx.doc.text();
    let center = ctx.candidate.source_offset;

    let mut occurrences = home.find_iter(text).collect::<Vec<_>>();
    occurrences.sort_by_key(|h| h.start().abs_diff(center));

    for h in occurrences {
        let reach = floor_boundary(text, h.end() + span);
        let Some(a) = away.find(&text[h.end()..reach]) else {
            continue;
        };
        let away_end = h.end() + a.end();

        let after_end = floor_boundary(text, away_end + span);
        let after = odds_outside_pick(ctx, away_end, &text[away_end..after_end]);
        if let Some((_, value)) = after.first() {
            return Some(*value);
        }
        let (before_start, before) = window(text, h.start(), span, 0);
        if let Some((_, value)) = odds_outside_pick(ctx, before_start, before).last() {
            return Some(*value);
        }
    }
    None
}

/// In-range decimal closest to the match offset.
pub fn windowed_nearest(ctx: &OddsContext<'_>) -> Option<f64> {
    let center = ctx.candidate.source_offset;
    let radius = ctx.config.proximity_window;
    let (start, slice) = window(ctx.doc.text(), center, radius, radius);

    odds_outside_pick(ctx, start, slice)
        .into_iter()
        .min_by_key(|(offset, _)| offset.abs_diff(center))
        .map(|(_, v)| v)
}

/// `home v away ... (1X2|Over|Under|BTTS) ... <decimal>`, nearest pairing
/// first.
pub fn market_qualified(ctx: &OddsContext<'_>) -> Option<f64> {
    let text = ctx.doc.text();

    for m in pairings_nearest_first(ctx, text) {
        let reach = floor_boundary(text, m.end() + ctx.config.betslip_span);
        let Some(keyword) = MARKET_KEYWORD.find(&text[m.end()..reach]) else {
            continue;
        };
        let keyword_end = m.end() + keyword.end();
        let end = floor_boundary(text, keyword_end + ctx.config.keyword_span);
        let found = odds_outside_pick(ctx, keyword_end, &text[keyword_end..end]);
        if let Some((_, value)) = found.first() {
            return Some(*value);
        }
    }
    None
}

/// Elements carrying an odds data attribute and naming one of the teams.
pub fn odds_attribute(ctx: &OddsContext<'_>) -> Option<f64> {
    for element in ctx.doc.html().select(&ODDS_ATTRIBUTE_ELEMENTS) {
        let text = element_text(element);
        let named = contains_ignore_case(&text, &ctx.candidate.home_team_raw)
            || contains_ignore_case(&text, &ctx.candidate.away_team_raw);
        if !named {
            continue;
        }

        let from_attr = ODDS_ATTRIBUTES
            .iter()
            .filter_map(|attr| element.value().attr(attr))
            .find_map(|raw| raw.trim().parse::<f64>().ok())
            .filter(|v| ctx.config.odds_in_range(*v));
        if let Some(value) = from_attr.or_else(|| first_in_range(&text, ctx.config)) {
            return Some(value);
        }
    }
    None
}
