use crate::config::EngineConfig;
use crate::model::{Platform, ScrapeInput};
use crate::pipeline::extract_slip;
use crate::store::MemoryTeamLookup;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub fixtures_dir: PathBuf,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixtureReport {
    pub file: String,
    pub platform: Platform,
    pub booking_code: String,
    pub matches: usize,
    pub unresolved_odds: usize,
    pub dated_matches: usize,
    pub total_odds: Option<f64>,
    pub idempotent: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub fixtures: usize,
    pub empty_slips: usize,
    pub total_matches: usize,
    pub unresolved_odds: usize,
    pub non_idempotent: usize,
    pub reports: Vec<FixtureReport>,
}

/// Extracts every fixture twice and compares the records.
///
/// Fixture files are named `<platform>__<code>.html` (or `.txt`).
pub fn run_harness(options: &HarnessOptions, config: &EngineConfig) -> Result<HarnessReport> {
    if !options.fixtures_dir.exists() {
        bail!(
            "fixtures dir does not exist: {}",
            options.fixtures_dir.display()
        );
    }

    let lookup = MemoryTeamLookup::default();
    let mut reports = Vec::new();

    for entry in WalkDir::new(&options.fixtures_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some((platform, code)) = fixture_identity(path) else {
            continue;
        };

        let document = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        let input = ScrapeInput {
            platform,
            booking_code: code.clone(),
            document,
        };

        let first = extract_slip(&input, config, &lookup, options.now);
        let second = extract_slip(&input, config, &lookup, options.now);

        reports.push(FixtureReport {
            file: path.display().to_string(),
            platform,
            booking_code: code,
            matches: first.matches.len(),
            unresolved_odds: first.matches.iter().filter(|m| !m.has_odds()).count(),
            dated_matches: first
                .matches
                .iter()
                .filter(|m| m.match_date.is_some())
                .count(),
            total_odds: first.total_odds,
            idempotent: first == second,
        });
    }

    Ok(HarnessReport {
        fixtures: reports.len(),
        empty_slips: reports.iter().filter(|r| r.matches == 0).count(),
        total_matches: reports.iter().map(|r| r.matches).sum(),
        unresolved_odds: reports.iter().map(|r| r.unresolved_odds).sum(),
        non_idempotent: reports.iter().filter(|r| !r.idempotent).count(),
        reports,
    })
}

fn fixture_identity(path: &Path) -> Option<(Platform, String)> {
    let ext = path.extension().and_then(|s| s.to_str())?;
    if ext != "html" && ext != "txt" {
        return None;
    }
    let stem = path.file_stem().and_then(|s| s.to_str())?;
    let (platform, code) = stem.split_once("__")?;
    if code.is_empty() {
        return None;
    }
    Some((Platform::from_name(platform), code.to_string()))
}
