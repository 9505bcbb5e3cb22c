use anyhow::Result;
use chrono::{TimeZone, Utc};
use slipscan::config::EngineConfig;
use slipscan::harness::{HarnessOptions, run_harness};
use slipscan::model::Platform;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

#[test]
fn harness_reports_stability_metrics() -> Result<()> {
    let env = setup_fixture_env()?;

    let report = run_harness(
        &HarnessOptions {
            fixtures_dir: env.pages_dir.clone(),
            now: Utc.with_ymd_and_hms(2026, 12, 1, 12, 0, 0).unwrap(),
        },
        &EngineConfig::default(),
    )?;

    assert_eq!(report.fixtures, 3);
    assert_eq!(report.empty_slips, 0);
    assert_eq!(report.total_matches, 6);
    assert_eq!(report.unresolved_odds, 0);
    assert_eq!(report.non_idempotent, 0);

    let platforms = report
        .reports
        .iter()
        .map(|r| (r.platform, r.booking_code.as_str(), r.matches))
        .collect::<Vec<_>>();
    assert_eq!(
        platforms,
        vec![
            (Platform::Betway, "BW5501", 1),
            (Platform::Other, "XYZ789", 3),
            (Platform::Sportybet, "ABC123", 2),
        ]
    );

    let sporty = &report.reports[2];
    assert_eq!(sporty.dated_matches, 2);
    assert_eq!(sporty.total_odds, Some(3.89));

    Ok(())
}

#[test]
fn harness_skips_unrecognised_files() -> Result<()> {
    let env = setup_fixture_env()?;
    fs::write(env.pages_dir.join("notes.md"), "# not a fixture")?;
    fs::write(env.pages_dir.join("sportybet.html"), "<p>no code</p>")?;
    fs::write(
        env.pages_dir.join("bet9ja__EMPTY1.html"),
        "<html><body><p>Booking code not found</p></body></html>",
    )?;

    let report = run_harness(
        &HarnessOptions {
            fixtures_dir: env.pages_dir.clone(),
            now: Utc.with_ymd_and_hms(2026, 12, 1, 12, 0, 0).unwrap(),
        },
        &EngineConfig::default(),
    )?;

    assert_eq!(report.fixtures, 4);
    assert_eq!(report.empty_slips, 1);

    Ok(())
}

#[test]
fn harness_requires_fixture_dir() -> Result<()> {
    let temp = tempdir()?;

    let result = run_harness(
        &HarnessOptions {
            fixtures_dir: temp.path().join("missing"),
            now: Utc::now(),
        },
        &EngineConfig::default(),
    );

    assert!(result.is_err());

    Ok(())
}

struct FixtureEnv {
    pages_dir: PathBuf,
}

fn setup_fixture_env() -> Result<FixtureEnv> {
    let temp = tempdir()?;
    let root = temp.keep();

    let fixture_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let pages_dir = root.join("pages");
    copy_dir(&fixture_root.join("pages"), &pages_dir)?;

    Ok(FixtureEnv { pages_dir })
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&src_path, &dst_path)?;
        } else {
            fs::copy(src_path, dst_path)?;
        }
    }

    Ok(())
}
