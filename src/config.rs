use crate::model::Platform;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub dates: DateConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        let extract = &self.extract;
        if extract.odds_min <= 1.0 {
            bail!("extract.odds_min must be above the 1.0 sentinel");
        }
        if extract.odds_max <= extract.odds_min {
            bail!("extract.odds_max must be greater than extract.odds_min");
        }
        if extract.min_team_len == 0 {
            bail!("extract.min_team_len must be at least 1");
        }
        if extract.window_cap == 0 {
            bail!("extract.window_cap must not be zero");
        }

        if self.dates.recent_past_hours <= self.dates.stale_hours {
            bail!("dates.recent_past_hours must be greater than dates.stale_hours");
        }

        for (name, platform) in &self.fetch.platforms {
            if Platform::from_name(name) == Platform::Other && name != "other" {
                bail!("fetch.platforms.{name} is not a known platform");
            }
            if !platform.url_template.contains("{code}") {
                bail!("fetch.platforms.{name}.url_template must contain {{code}}");
            }
            let probe = platform.url_template.replace("{code}", "CODE");
            Url::parse(&probe)
                .with_context(|| format!("fetch.platforms.{name}.url_template is not a url"))?;
            if platform.timeout_secs == 0 {
                bail!("fetch.platforms.{name}.timeout_secs must not be zero");
            }
        }

        if self.retry.attempts == 0 {
            bail!("retry.attempts must be at least 1");
        }

        Ok(())
    }
}

/// Heuristic thresholds for the extraction cascades.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    #[serde(default = "default_min_team_len")]
    pub min_team_len: usize,
    #[serde(default = "default_odds_min")]
    pub odds_min: f64,
    #[serde(default = "default_odds_max")]
    pub odds_max: f64,
    #[serde(default = "default_window_cap")]
    pub window_cap: usize,
    #[serde(default = "default_proximity_window")]
    pub proximity_window: usize,
    #[serde(default = "default_betslip_span")]
    pub betslip_span: usize,
    #[serde(default = "default_dual_team_span")]
    pub dual_team_span: usize,
    #[serde(default = "default_keyword_span")]
    pub keyword_span: usize,
    #[serde(default = "default_element_text_max")]
    pub element_text_max: usize,
    #[serde(default = "default_region_min_len")]
    pub region_min_len: usize,
    #[serde(default = "default_header_zone")]
    pub header_zone: usize,
    #[serde(default = "default_summary_zone")]
    pub summary_zone: usize,
    #[serde(default = "default_header_guard")]
    pub header_guard: usize,
    #[serde(default = "default_summary_guard")]
    pub summary_guard: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_team_len: default_min_team_len(),
            odds_min: default_odds_min(),
            odds_max: default_odds_max(),
            window_cap: default_window_cap(),
            proximity_window: default_proximity_window(),
            betslip_span: default_betslip_span(),
            dual_team_span: default_dual_team_span(),
            keyword_span: default_keyword_span(),
            element_text_max: default_element_text_max(),
            region_min_len: default_region_min_len(),
            header_zone: default_header_zone(),
            summary_zone: default_summary_zone(),
            header_guard: default_header_guard(),
            summary_guard: default_summary_guard(),
        }
    }
}

impl ExtractConfig {
    pub fn odds_in_range(&self, value: f64) -> bool {
        value >= self.odds_min && value <= self.odds_max
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateConfig {
    #[serde(default = "default_date_window")]
    pub window: usize,
    #[serde(default = "default_stale_hours")]
    pub stale_hours: f64,
    #[serde(default = "default_recent_past_hours")]
    pub recent_past_hours: f64,
    #[serde(default = "default_far_future_hours")]
    pub far_future_hours: f64,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            window: default_date_window(),
            stale_hours: default_stale_hours(),
            recent_past_hours: default_recent_past_hours(),
            far_future_hours: default_far_future_hours(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_platforms")]
    pub platforms: BTreeMap<String, PlatformFetchConfig>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            headers: BTreeMap::new(),
            poll_interval_ms: default_poll_interval_ms(),
            platforms: default_platforms(),
        }
    }
}

impl FetchConfig {
    pub fn platform(&self, platform: Platform) -> Option<&PlatformFetchConfig> {
        self.platforms.get(platform.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformFetchConfig {
    pub url_template: String,
    #[serde(default = "default_static_timeout_secs")]
    pub timeout_secs: u64,
    /// Page needs script execution before selections appear.
    #[serde(default)]
    pub rendered: bool,
    #[serde(default)]
    pub content_indicator: Option<String>,
}

impl PlatformFetchConfig {
    pub fn url_for(&self, code: &str) -> String {
        self.url_template.replace("{code}", code)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_attempts")]
    pub attempts: u8,
    #[serde(default = "default_retry_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_retry_attempts(),
            backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Missing file means built-in defaults.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    if !path.exists() {
        return Ok(EngineConfig::default());
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read engine config: {}", path.display()))?;
    let config: EngineConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse toml in {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid engine config {}", path.display()))?;
    Ok(config)
}

fn default_min_team_len() -> usize {
    3
}

fn default_odds_min() -> f64 {
    1.01
}

fn default_odds_max() -> f64 {
    1000.0
}

fn default_window_cap() -> usize {
    100_000
}

fn default_proximity_window() -> usize {
    400
}

fn default_betslip_span() -> usize {
    300
}

fn default_dual_team_span() -> usize {
    200
}

fn default_keyword_span() -> usize {
    100
}

fn default_element_text_max() -> usize {
    300
}

fn default_region_min_len() -> usize {
    40
}

fn default_header_zone() -> usize {
    400
}

fn default_summary_zone() -> usize {
    300
}

fn default_header_guard() -> usize {
    50
}

fn default_summary_guard() -> usize {
    120
}

fn default_date_window() -> usize {
    400
}

fn default_stale_hours() -> f64 {
    -24.0
}

fn default_recent_past_hours() -> f64 {
    -2.0
}

fn default_far_future_hours() -> f64 {
    8760.0
}

fn default_poll_interval_ms() -> u64 {
    1500
}

fn default_static_timeout_secs() -> u64 {
    8
}

fn default_retry_attempts() -> u8 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_platforms() -> BTreeMap<String, PlatformFetchConfig> {
    let rendered = |url: &str, indicator: &str| PlatformFetchConfig {
        url_template: url.to_string(),
        timeout_secs: 45,
        rendered: true,
        content_indicator: Some(indicator.to_string()),
    };
    let plain = |url: &str| PlatformFetchConfig {
        url_template: url.to_string(),
        timeout_secs: default_static_timeout_secs(),
        rendered: false,
        content_indicator: None,
    };

    BTreeMap::from([
        (
            "sportybet".to_string(),
            rendered(
                "https://www.sportybet.com/ng/?shareCode={code}",
                "m-list",
            ),
        ),
        (
            "bet9ja".to_string(),
            plain("https://sports.bet9ja.com/?bookABet={code}"),
        ),
        (
            "betking".to_string(),
            plain("https://www.betking.com/sports/s/betslip/{code}"),
        ),
        (
            "1xbet".to_string(),
            rendered("https://1xbet.ng/en?coupon={code}", "coupon"),
        ),
        (
            "betway".to_string(),
            plain("https://www.betway.com.ng/betslip/share/{code}"),
        ),
    ])
}
