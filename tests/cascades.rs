use anyhow::Result;
use slipscan::config::ExtractConfig;
use slipscan::dispatch::select_ruleset;
use slipscan::document::SlipDocument;
use slipscan::matches::extract_matches;
use slipscan::model::{CandidateMatch, Market, Platform};
use slipscan::odds::{
    OddsContext, dual_team_proximity, market_qualified, odds_attribute, windowed_nearest,
};
use slipscan::totals::{
    TotalsContext, header_zone_first, header_zone_keyword, labelled_total, odds_before_bonus,
    odds_element, summary_zone,
};

fn page(body: &str) -> SlipDocument {
    SlipDocument::parse(&format!(
        "<!doctype html><html><body>{body}</body></html>"
    ))
}

fn candidate(home: &str, away: &str, offset: usize, end: usize) -> CandidateMatch {
    CandidateMatch {
        home_team_raw: home.to_string(),
        away_team_raw: away.to_string(),
        prediction_raw: String::new(),
        source_offset: offset,
        source_end: end,
        pattern_id: "team_vs_team".to_string(),
        market: Market::H2h,
        odds_hint: None,
    }
}

fn total(
    strategy: fn(&TotalsContext<'_>) -> Option<f64>,
    body: &str,
    config: &ExtractConfig,
) -> Option<f64> {
    let doc = page(body);
    strategy(&TotalsContext {
        doc: &doc,
        config,
    })
}

#[test]
fn market_qualified_reads_the_decimal_after_the_market() -> Result<()> {
    let config = ExtractConfig::default();
    let row = candidate("Arsenal", "Chelsea", 0, "Arsenal v Chelsea".len());

    let doc = page("<p>Arsenal v Chelsea</p><p>Over</p><p>1.75</p>");
    let ctx = OddsContext {
        doc: &doc,
        candidate: &row,
        config: &config,
    };
    assert_eq!(market_qualified(&ctx), Some(1.75));

    let doc = page("<p>Arsenal v Chelsea</p><p>Correct Score</p><p>1.75</p>");
    let ctx = OddsContext {
        doc: &doc,
        candidate: &row,
        config: &config,
    };
    assert_eq!(market_qualified(&ctx), None);

    Ok(())
}

#[test]
fn odds_attribute_needs_a_named_team_and_an_in_range_value() -> Result<()> {
    let config = ExtractConfig::default();
    let row = candidate("Arsenal", "Chelsea", 0, 0);
    let resolve = |body: &str| {
        let doc = page(body);
        odds_attribute(&OddsContext {
            doc: &doc,
            candidate: &row,
            config: &config,
        })
    };

    assert_eq!(resolve(r#"<div data-odds="2.35">Arsenal</div>"#), Some(2.35));
    assert_eq!(resolve(r#"<div data-price="3.10">Chelsea to win</div>"#), Some(3.10));
    assert_eq!(resolve(r#"<div data-odds="2.35">Draw no bet</div>"#), None);
    assert_eq!(resolve(r#"<div data-odds="0.50">Arsenal</div>"#), None);

    Ok(())
}

#[test]
fn proximity_strategies_skip_the_goal_line_inside_the_row() -> Result<()> {
    let config = ExtractConfig::default();
    let doc = page("<p>Arsenal - Chelsea prematch Over 2.5</p><p>1.90</p>");
    let candidates = extract_matches(&doc, select_ruleset(Platform::Sportybet), &config);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].prediction_raw, "Over 2.5");

    let ctx = OddsContext {
        doc: &doc,
        candidate: &candidates[0],
        config: &config,
    };
    assert_eq!(dual_team_proximity(&ctx), Some(1.90));
    assert_eq!(windowed_nearest(&ctx), Some(1.90));

    Ok(())
}

#[test]
fn odds_element_ignores_match_rows() -> Result<()> {
    let config = ExtractConfig::default();

    assert_eq!(
        total(
            odds_element,
            r#"<div class="slip-summary"><span class="total-odds">4.20</span></div>"#,
            &config
        ),
        Some(4.20)
    );
    assert_eq!(
        total(
            odds_element,
            r#"<div class="event"><p>Arsenal - Chelsea</p><span class="odds">1.85</span></div>"#,
            &config
        ),
        None
    );

    Ok(())
}

#[test]
fn header_keyword_reads_odds_before_max_bonus() -> Result<()> {
    let mut config = ExtractConfig::default();
    config.keyword_span = 0;

    assert_eq!(
        total(
            header_zone_keyword,
            "<h2>Booking Code: ABC123</h2><p>Odds</p><p>x 5.75</p><p>Max Bonus</p>",
            &config
        ),
        Some(5.75)
    );
    assert_eq!(
        total(
            header_zone_keyword,
            "<h2>Booking Code: ABC123</h2><p>Odds</p><p>x 5.75</p>",
            &config
        ),
        None
    );

    Ok(())
}

#[test]
fn header_keyword_rejects_odds_beside_a_pairing() -> Result<()> {
    let config = ExtractConfig::default();

    assert_eq!(
        total(
            header_zone_keyword,
            "<h2>Booking Code: ABC123</h2><p>Odds 3.40</p>",
            &config
        ),
        Some(3.40)
    );
    assert_eq!(
        total(
            header_zone_keyword,
            "<h2>Booking Code: ABC123</h2><p>Odds 1.85</p><p>Arsenal - Chelsea</p>",
            &config
        ),
        None
    );

    Ok(())
}

#[test]
fn labelled_total_stays_in_range() -> Result<()> {
    let config = ExtractConfig::default();

    assert_eq!(
        total(labelled_total, "<p>Accumulator odds: 12.50</p>", &config),
        Some(12.50)
    );
    assert_eq!(
        total(labelled_total, "<p>Total Odds: 2500.00</p>", &config),
        None
    );

    Ok(())
}

#[test]
fn odds_before_bonus_needs_the_bonus_label() -> Result<()> {
    let config = ExtractConfig::default();

    assert_eq!(
        total(odds_before_bonus, "<p>Odds 6.30</p><p>Max Bonus</p>", &config),
        Some(6.30)
    );
    assert_eq!(total(odds_before_bonus, "<p>Odds 6.30</p>", &config), None);
    assert_eq!(
        total(odds_before_bonus, "<p>Odds 1500.00</p><p>Max Bonus</p>", &config),
        None
    );

    Ok(())
}

#[test]
fn summary_zone_needs_a_label_and_no_nearby_pairing() -> Result<()> {
    let config = ExtractConfig::default();

    assert_eq!(
        total(
            summary_zone,
            "<p>Stake: 100</p><p>Total 3.75</p><p>Potential Win: 375</p>",
            &config
        ),
        Some(3.75)
    );
    assert_eq!(
        total(
            summary_zone,
            "<p>Arsenal - Chelsea</p><p>Odds 1.85</p><p>Stake: 100</p>",
            &config
        ),
        None
    );

    Ok(())
}

#[test]
fn header_first_decimal_must_clear_the_separator_guard() -> Result<()> {
    let config = ExtractConfig::default();

    assert_eq!(
        total(
            header_zone_first,
            "<h2>Booking Code: ABC123</h2><p>Slip value 7.10</p>",
            &config
        ),
        Some(7.10)
    );
    assert_eq!(
        total(
            header_zone_first,
            "<h2>Booking Code: ABC123</h2><p>Arsenal - Chelsea 1.85</p>",
            &config
        ),
        None
    );

    Ok(())
}
