use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};

use fpl_predict::config::Settings;
use fpl_predict::export::CsvExporter;
use fpl_predict::http_client::http_client;
use fpl_predict::logging;
use fpl_predict::lookup::Lookup;
use fpl_predict::pipeline::{HttpSummarySource, run_from_roster};
use fpl_predict::roster::{Roster, fetch_bootstrap};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init();

    let start = Instant::now();
    let mut settings = Settings::from_env();
    if let Some(out_dir) = parse_out_dir_arg() {
        settings.out_dir = out_dir;
    }
    let client = http_client(&settings)?;
    let exporter = CsvExporter::new(&settings.out_dir);

    let bootstrap_url = settings.bootstrap_url();
    let bootstrap = fetch_bootstrap(client, &bootstrap_url)
        .with_context(|| format!("roster fetch from {bootstrap_url}"))?;
    let lookup = Lookup::from_bootstrap(&bootstrap);
    let roster = Roster::from_bootstrap(bootstrap, &lookup);
    info!(
        players = roster.players.len(),
        elapsed = ?start.elapsed(),
        "roster loaded"
    );

    let source = HttpSummarySource::new(client, settings.element_summary_template());
    let report = run_from_roster(
        &source,
        &roster,
        &lookup,
        settings.fetch_parallelism,
        Some(&exporter),
    )?;

    if report.transport_failures + report.decode_failures > 0 || !report.skipped.is_empty() {
        warn!(
            transport_failures = report.transport_failures,
            decode_failures = report.decode_failures,
            skipped_fixtures = report.skipped.len(),
            "run finished with partial results"
        );
    }
    info!(
        players = report.players_fetched,
        requested = report.players_requested,
        fixtures = report.fixtures_predicted,
        out_dir = %settings.out_dir.display(),
        elapsed = ?start.elapsed(),
        "run complete"
    );
    Ok(())
}

fn parse_out_dir_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--out=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--out" {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
