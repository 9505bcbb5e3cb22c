use anyhow::Result;
use slipscan::config::load_engine_config;
use slipscan::model::Platform;
use std::fs;
use tempfile::tempdir;

#[test]
fn missing_config_uses_defaults() -> Result<()> {
    let temp = tempdir()?;

    let config = load_engine_config(Some(&temp.path().join("engine.toml")))?;

    assert_eq!(config.extract.min_team_len, 3);
    assert_eq!(config.extract.odds_min, 1.01);
    assert_eq!(config.extract.odds_max, 1000.0);
    assert_eq!(config.extract.window_cap, 100_000);
    assert_eq!(config.dates.stale_hours, -24.0);
    assert_eq!(config.retry.attempts, 3);

    let sporty = config
        .fetch
        .platform(Platform::Sportybet)
        .ok_or_else(|| anyhow::anyhow!("sportybet must have a default page source"))?;
    assert!(sporty.rendered);
    assert!(sporty.url_for("ABC123").contains("ABC123"));
    assert!(config.fetch.platform(Platform::Other).is_none());

    Ok(())
}

#[test]
fn toml_overrides_selected_thresholds() -> Result<()> {
    let temp = tempdir()?;
    let path = temp.path().join("engine.toml");
    fs::write(
        &path,
        r#"
[extract]
odds_max = 500.0
proximity_window = 250

[dates]
far_future_hours = 720.0

[retry]
attempts = 5
backoff_ms = 10

[fetch.platforms.betway]
url_template = "https://example.test/betway/{code}"
timeout_secs = 4
"#,
    )?;

    let config = load_engine_config(Some(&path))?;

    assert_eq!(config.extract.odds_max, 500.0);
    assert_eq!(config.extract.proximity_window, 250);
    assert_eq!(config.extract.odds_min, 1.01);
    assert_eq!(config.dates.far_future_hours, 720.0);
    assert_eq!(config.retry.attempts, 5);
    assert_eq!(config.fetch.platforms.len(), 1);
    assert_eq!(
        config
            .fetch
            .platform(Platform::Betway)
            .map(|p| p.url_for("BW1")),
        Some("https://example.test/betway/BW1".to_string())
    );

    Ok(())
}

#[test]
fn invalid_configs_are_rejected() -> Result<()> {
    let temp = tempdir()?;
    let cases = [
        "[extract]\nodds_min = 1.0\n",
        "[extract]\nodds_min = 2.0\nodds_max = 1.5\n",
        "[dates]\nstale_hours = -2.0\nrecent_past_hours = -24.0\n",
        "[retry]\nattempts = 0\n",
        "[fetch.platforms.betway]\nurl_template = \"https://example.test/betway\"\n",
        "[fetch.platforms.unknownbook]\nurl_template = \"https://example.test/{code}\"\n",
        "[extract]\nodds_min = \"high\"\n",
    ];

    for (idx, body) in cases.iter().enumerate() {
        let path = temp.path().join(format!("engine-{idx}.toml"));
        fs::write(&path, body)?;
        assert!(load_engine_config(Some(&path)).is_err(), "case {idx}: {body}");
    }

    Ok(())
}

#[test]
fn shipped_config_is_valid() -> Result<()> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/engine.toml");

    let config = load_engine_config(Some(&path))?;

    assert_eq!(config.fetch.platforms.len(), 5);

    Ok(())
}
