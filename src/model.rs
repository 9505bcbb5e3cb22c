use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Odds value meaning "no resolution strategy succeeded".
pub const SENTINEL_ODDS: f64 = 1.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Sportybet,
    Bet9ja,
    Betking,
    #[serde(rename = "1xbet")]
    OneXBet,
    Betway,
    Other,
}

impl Platform {
    pub const KNOWN: [Platform; 5] = [
        Platform::Sportybet,
        Platform::Bet9ja,
        Platform::Betking,
        Platform::OneXBet,
        Platform::Betway,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Sportybet => "sportybet",
            Platform::Bet9ja => "bet9ja",
            Platform::Betking => "betking",
            Platform::OneXBet => "1xbet",
            Platform::Betway => "betway",
            Platform::Other => "other",
        }
    }

    /// Unknown names map to `Other`; the dispatcher always has a ruleset for it.
    pub fn from_name(value: &str) -> Platform {
        let normalized = value
            .trim()
            .to_ascii_lowercase()
            .replace([' ', '-', '_'], "");
        match normalized.as_str() {
            "sportybet" | "sporty" => Platform::Sportybet,
            "bet9ja" => Platform::Bet9ja,
            "betking" => Platform::Betking,
            "1xbet" | "onexbet" => Platform::OneXBet,
            "betway" => Platform::Betway,
            _ => Platform::Other,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Platform::from_name(s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Prediction {
    Home,
    Away,
    Draw,
    Over,
    Under,
    Yes,
    No,
}

impl Prediction {
    /// Bookmaker pick labels. Anything unrecognized is a home pick.
    pub fn normalize(raw: &str) -> Prediction {
        let token = raw.trim().to_ascii_lowercase();
        let token = token.trim_start_matches('w');
        match token {
            "home" | "1" | "1x" | "12" => Prediction::Home,
            "away" | "2" | "x2" => Prediction::Away,
            "draw" | "x" => Prediction::Draw,
            "yes" | "gg" => Prediction::Yes,
            "no" | "ng" => Prediction::No,
            t if t.starts_with("over") => Prediction::Over,
            t if t.starts_with("under") => Prediction::Under,
            _ => Prediction::Home,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    H2h,
    Totals,
    Btts,
    Spreads,
    DoubleChance,
}

impl Market {
    pub fn from_keyword(keyword: &str) -> Market {
        let k = keyword.to_ascii_lowercase();
        if k.contains("double") {
            Market::DoubleChance
        } else if k.contains("btts") || k.contains("both teams") || k.contains("gg/ng") {
            Market::Btts
        } else if k.contains("handicap") || k.contains("spread") {
            Market::Spreads
        } else if k.contains("over") || k.contains("under") || k.contains("total") {
            Market::Totals
        } else {
            Market::H2h
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DateWarning {
    RecentPast,
    FarFuture,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateMatch {
    pub home_team_raw: String,
    pub away_team_raw: String,
    pub prediction_raw: String,
    pub source_offset: usize,
    pub source_end: usize,
    pub pattern_id: String,
    pub market: Market,
    pub odds_hint: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedMatch {
    pub home_team: String,
    pub away_team: String,
    pub prediction: Prediction,
    pub market: Market,
    pub odds: f64,
    pub match_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_warning: Option<DateWarning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_team_id: Option<String>,
}

impl ResolvedMatch {
    pub fn has_odds(&self) -> bool {
        self.odds != SENTINEL_ODDS
    }

    pub fn dedup_key(&self) -> String {
        let date = self
            .match_date
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "nodate".to_string());
        format!(
            "{}|{}|{}|{:.2}",
            self.home_team, self.away_team, date, self.odds
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SlipTotals {
    pub total_odds: Option<f64>,
    pub stake: Option<f64>,
    pub potential_win: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlipRecord {
    pub platform: Platform,
    pub booking_code: String,
    pub matches: Vec<ResolvedMatch>,
    pub total_odds: Option<f64>,
    pub stake: Option<f64>,
    pub potential_win: Option<f64>,
    pub earliest_match_date: Option<DateTime<Utc>>,
}

impl SlipRecord {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Matches present but slip-level totals missing.
    pub fn is_partial(&self) -> bool {
        !self.matches.is_empty() && (self.stake.is_none() || self.potential_win.is_none())
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeInput {
    pub platform: Platform,
    pub booking_code: String,
    pub document: String,
}

pub fn round_odds(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
