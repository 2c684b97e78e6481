use anyhow::{Result, anyhow};
use tracing::info;

use fpl_predict::config::Settings;
use fpl_predict::export::CsvExporter;
use fpl_predict::http_client::http_client;
use fpl_predict::logging;
use fpl_predict::lookup::Lookup;
use fpl_predict::roster::{Roster, fetch_bootstrap};

/// Bootstrap stage only: writes team, role and per-team player tables
/// without fetching any element summaries.
fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init();

    let settings = Settings::from_env();
    let client = http_client(&settings)?;
    let bootstrap = fetch_bootstrap(client, &settings.bootstrap_url())?;
    let lookup = Lookup::from_bootstrap(&bootstrap);
    let roster = Roster::from_bootstrap(bootstrap, &lookup);
    if roster.is_empty() {
        return Err(anyhow!("roster contains no players"));
    }

    let exporter = CsvExporter::new(&settings.out_dir);
    roster.export(&exporter, None);
    info!(
        players = roster.players.len(),
        teams = roster.team_names().count(),
        out_dir = %settings.out_dir.display(),
        "roster export complete"
    );
    Ok(())
}
