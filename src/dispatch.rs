use crate::model::{Market, Platform};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Capitalised words (or bare numbers such as `04`), up to four per name.
/// Continuation words stay on the same line.
pub const TEAM: &str = r"\p{Lu}[\w'&.-]*(?:[ \t]+(?:\p{Lu}[\w'&.-]*|\d+\b)){0,3}";

const PICK: &str = r"(?i:home|away|draw|over\s*\d+(?:\.\d+)?|under\s*\d+(?:\.\d+)?|over|under|yes|no|gg|ng|w1|w2|1x|x2|12|1|x|2)";

#[derive(Debug)]
pub struct MatchPattern {
    pub id: &'static str,
    pub regex: Regex,
}

/// Ordered patterns and betslip locators for one bookmaker.
///
/// `fallback_patterns` only run when `patterns` keep nothing.
#[derive(Debug)]
pub struct ParserRuleset {
    pub platform: Platform,
    pub patterns: Vec<MatchPattern>,
    pub fallback_patterns: Vec<MatchPattern>,
    pub region_locators: Vec<&'static str>,
    pub market: Market,
}

static RULESETS: LazyLock<BTreeMap<Platform, ParserRuleset>> = LazyLock::new(|| {
    Platform::KNOWN
        .into_iter()
        .map(|platform| (platform, build_known(platform)))
        .collect()
});

static GENERIC: LazyLock<ParserRuleset> = LazyLock::new(build_generic);

/// Always succeeds; unknown platforms get the generic team-vs-team ruleset.
pub fn select_ruleset(platform: Platform) -> &'static ParserRuleset {
    RULESETS.get(&platform).unwrap_or(&*GENERIC)
}

fn build_known(platform: Platform) -> ParserRuleset {
    let specific: Vec<(&'static str, String)> = match platform {
        Platform::Sportybet => vec![(
            "sportybet_prematch",
            format!(
                r"(?P<home>{TEAM})\s+(?:-|vs\.?|v)\s+(?P<away>{TEAM})\s+(?i:pre-?match|live)\s*(?i:1X2\s*)?(?P<pick>{PICK})"
            ),
        )],
        Platform::Bet9ja => vec![(
            "bet9ja_1x2",
            format!(
                r"(?P<home>{TEAM})\s+(?:-|vs\.?|v)\s+(?P<away>{TEAM})\s+(?i:1X2|match\s+result)\s*[:\-]?\s*(?P<pick>{PICK})"
            ),
        )],
        Platform::Betking => vec![(
            "betking_pick",
            format!(
                r"(?P<home>{TEAM})\s+(?:vs\.?|v|-)\s+(?P<away>{TEAM})\s+(?i:your\s+pick|pick|selection)\s*:?\s*(?P<pick>{PICK})"
            ),
        )],
        Platform::OneXBet => vec![(
            "onexbet_result",
            format!(
                r"(?P<home>{TEAM})\s+-\s+(?P<away>{TEAM})\s+(?i:1x2|result)\.?\s*(?P<pick>{PICK})"
            ),
        )],
        Platform::Betway => vec![(
            "betway_result",
            format!(
                r"(?P<home>{TEAM})\s+(?:v|vs\.?)\s+(?P<away>{TEAM})\s+(?i:match\s+result|full\s+time\s+result|1X2)\s*[:\-]?\s*(?P<pick>{PICK})"
            ),
        )],
        Platform::Other => Vec::new(),
    };

    let patterns = specific
        .into_iter()
        .map(|(id, pattern)| MatchPattern {
            id,
            regex: Regex::new(&pattern).expect("platform match regex must compile"),
        })
        .collect::<Vec<_>>();

    ParserRuleset {
        platform,
        patterns,
        fallback_patterns: vec![team_vs_team()],
        region_locators: region_locators(platform),
        market: Market::H2h,
    }
}

fn build_generic() -> ParserRuleset {
    ParserRuleset {
        platform: Platform::Other,
        patterns: vec![team_vs_team()],
        fallback_patterns: Vec::new(),
        region_locators: region_locators(Platform::Other),
        market: Market::H2h,
    }
}

fn team_vs_team() -> MatchPattern {
    MatchPattern {
        id: "team_vs_team",
        regex: Regex::new(&format!(
            r"(?P<home>{TEAM})\s+(?:vs\.?|v|-)\s+(?P<away>{TEAM})"
        ))
        .expect("team-vs-team regex must compile"),
    }
}

fn region_locators(platform: Platform) -> Vec<&'static str> {
    let mut locators = match platform {
        Platform::Sportybet => vec![".m-betslips", ".m-list"],
        Platform::Bet9ja => vec![".betslip__content", "#betslip"],
        Platform::Betking => vec![".betslip-container", "[class*='ticket']"],
        Platform::OneXBet => vec![".coupon", "[class*='coupon']"],
        Platform::Betway => vec!["#betslip-container", "[data-testid*='betslip']"],
        Platform::Other => Vec::new(),
    };
    locators.extend([
        "[class*='betslip']",
        "[class*='bet-slip']",
        "[id*='betslip']",
        "[class*='slip']",
        "main",
        "body",
    ]);
    locators
}
