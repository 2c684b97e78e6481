//! Per-player fetch -> decode -> enrich -> aggregate fan-out, then the
//! predict pass once every worker has reported back.

use std::time::Instant;

use anyhow::Result;
use rayon::prelude::*;
use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use crate::aggregate::{AggregateTable, OpponentPointsBuilder};
use crate::config::endpoint_for;
use crate::enrich::enrich_summary;
use crate::error::WorkerError;
use crate::export::{CsvExporter, sanitize_segment};
use crate::http_client::fetch_body;
use crate::lookup::Lookup;
use crate::predict::{
    PredictionInputs, PredictionReport, SkippedFixture, predict_all, predicted_fixtures,
};
use crate::roster::{PlayerShareTable, Roster, TeamFormTable};
use crate::summary::{PlayerSummary, parse_element_summary_json};

/// Where raw element-summary bodies come from.
pub trait SummarySource: Sync {
    fn fetch_summary(&self, player_id: u32) -> Result<String>;
}

/// Live API source: one GET per player against the endpoint template.
pub struct HttpSummarySource<'a> {
    client: &'a Client,
    template: String,
}

impl<'a> HttpSummarySource<'a> {
    pub fn new(client: &'a Client, template: impl Into<String>) -> Self {
        Self {
            client,
            template: template.into(),
        }
    }
}

impl SummarySource for HttpSummarySource<'_> {
    fn fetch_summary(&self, player_id: u32) -> Result<String> {
        fetch_body(self.client, &endpoint_for(&self.template, player_id))
    }
}

pub enum WorkerOutcome {
    Done(PlayerSummary),
    Failed(WorkerError),
}

#[derive(Debug, Default)]
pub struct FetchReport {
    /// Successfully decoded players, ascending by id.
    pub summaries: Vec<PlayerSummary>,
    pub table: AggregateTable,
    pub failures: Vec<WorkerError>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub players_requested: usize,
    pub players_fetched: usize,
    pub transport_failures: usize,
    pub decode_failures: usize,
    pub fixtures_predicted: usize,
    pub skipped: Vec<SkippedFixture>,
    pub table: AggregateTable,
}

/// Work done for one player. Only `merge` touches shared state.
pub fn run_worker(
    source: &dyn SummarySource,
    player_id: u32,
    lookup: &Lookup,
    builder: &OpponentPointsBuilder,
    exporter: Option<&CsvExporter>,
) -> WorkerOutcome {
    let body = match source.fetch_summary(player_id) {
        Ok(body) => body,
        Err(err) => {
            let err = WorkerError::Transport {
                player_id,
                message: format!("{err:#}"),
            };
            warn!("{err}");
            return WorkerOutcome::Failed(err);
        }
    };

    let mut summary = match parse_element_summary_json(&body, player_id) {
        Ok(summary) => summary,
        Err(err) => {
            let err = WorkerError::Decode {
                player_id,
                message: format!("{err:#}"),
            };
            warn!("{err}");
            return WorkerOutcome::Failed(err);
        }
    };

    enrich_summary(&mut summary, lookup);
    if summary.fixtures.is_empty() {
        debug!(player_id, player = %summary.player_name, "no fixtures found");
    }
    builder.merge(&summary.past_matches, lookup);

    if let Some(exporter) = exporter {
        let stem = sanitize_segment(&summary.export_stem());
        exporter.write_logged(
            &summary.past_matches,
            &format!("fpl-players/individual/pastmatches/{stem}"),
        );
        exporter.write_logged(
            &summary.past_years,
            &format!("fpl-players/individual/pastyears/{stem}"),
        );
    }

    WorkerOutcome::Done(summary)
}

/// Fan out one worker per id on a pool of `parallelism` threads and wait
/// for all of them. The returned table is complete and read-only.
pub fn fetch_and_aggregate(
    source: &dyn SummarySource,
    player_ids: &[u32],
    lookup: &Lookup,
    parallelism: usize,
    exporter: Option<&CsvExporter>,
) -> FetchReport {
    let start = Instant::now();
    let builder = OpponentPointsBuilder::new();

    let outcomes: Vec<WorkerOutcome> = with_fetch_pool(parallelism, || {
        player_ids
            .par_iter()
            .map(|&player_id| run_worker(source, player_id, lookup, &builder, exporter))
            .collect()
    });

    let table = builder.freeze();
    let mut summaries = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            WorkerOutcome::Done(summary) => summaries.push(summary),
            WorkerOutcome::Failed(err) => failures.push(err),
        }
    }
    summaries.sort_by_key(|s| s.player_id);

    info!(
        requested = player_ids.len(),
        fetched = summaries.len(),
        failed = failures.len(),
        elapsed = ?start.elapsed(),
        "element summaries aggregated"
    );

    FetchReport {
        summaries,
        table,
        failures,
    }
}

/// Per-player fixture files plus the combined list.
pub fn export_predictions(report: &PredictionReport, exporter: &CsvExporter) {
    for summary in &report.players {
        let fixtures = predicted_fixtures(summary);
        let stem = sanitize_segment(&summary.export_stem());
        exporter.write_logged(&fixtures, &format!("fpl-players/individual/fixtures/{stem}"));
    }
    exporter.write_logged(&report.combined, "fpl-players/allfixtures");
}

/// Inputs handed over by the roster stage.
pub struct CoreInputs<'a> {
    pub player_ids: &'a [u32],
    pub lookup: &'a Lookup,
    pub team_form: &'a TeamFormTable,
    pub shares: &'a PlayerShareTable,
}

/// Fetch + aggregate, then predict, then export everything.
pub fn run_core(
    source: &dyn SummarySource,
    inputs: CoreInputs<'_>,
    parallelism: usize,
    exporter: Option<&CsvExporter>,
) -> RunReport {
    let fetched = fetch_and_aggregate(
        source,
        inputs.player_ids,
        inputs.lookup,
        parallelism,
        exporter,
    );

    let start = Instant::now();
    let players_fetched = fetched.summaries.len();
    let transport_failures = fetched.failures.iter().filter(|e| e.is_transport()).count();
    let decode_failures = fetched.failures.len() - transport_failures;

    let prediction = predict_all(
        fetched.summaries,
        inputs.lookup,
        PredictionInputs {
            table: &fetched.table,
            team_form: inputs.team_form,
            shares: inputs.shares,
        },
    );
    info!(
        predicted = prediction.combined.len(),
        skipped = prediction.skipped.len(),
        elapsed = ?start.elapsed(),
        "fixtures predicted"
    );

    if let Some(exporter) = exporter {
        export_predictions(&prediction, exporter);
        exporter.write_logged(&fetched.table.rows(), "fpl-opponent-points");
    }

    RunReport {
        players_requested: inputs.player_ids.len(),
        players_fetched,
        transport_failures,
        decode_failures,
        fixtures_predicted: prediction.combined.len(),
        skipped: prediction.skipped,
        table: fetched.table,
    }
}

/// Full run from an already-fetched roster. Fails only when the roster is empty.
pub fn run_from_roster(
    source: &dyn SummarySource,
    roster: &Roster,
    lookup: &Lookup,
    parallelism: usize,
    exporter: Option<&CsvExporter>,
) -> Result<RunReport> {
    if roster.is_empty() {
        anyhow::bail!("roster contains no players");
    }
    let player_ids = roster.player_ids();
    let team_form = roster.team_form();
    let shares = roster.player_shares();

    let report = run_core(
        source,
        CoreInputs {
            player_ids: &player_ids,
            lookup,
            team_form: &team_form,
            shares: &shares,
        },
        parallelism,
        exporter,
    );

    if let Some(exporter) = exporter {
        roster.export(exporter, Some(&report.table));
    }
    Ok(report)
}

fn with_fetch_pool<T>(threads: usize, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|idx| format!("fetch-{idx}"))
        .build()
    {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::http_client::build_client;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    const USER_AGENT: &str = "fpl-predict-test/1.0";

    fn test_client(timeout: Duration) -> Client {
        let settings = Settings {
            user_agent: USER_AGENT.to_string(),
            http_timeout: timeout,
            ..Settings::default()
        };
        build_client(&settings).expect("client")
    }

    /// Answer one request with `response` and hand back the raw request head.
    fn serve_once(response: String) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).expect("read request");
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).expect("write response");
            String::from_utf8_lossy(&raw).to_string()
        });
        (format!("http://{addr}/element-summary/{{id}}/"), handle)
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn run_against(template: String, client: &Client) -> WorkerOutcome {
        let source = HttpSummarySource::new(client, template);
        let builder = OpponentPointsBuilder::new();
        run_worker(&source, 7, &Lookup::new(), &builder, None)
    }

    fn assert_transport(outcome: WorkerOutcome) {
        match outcome {
            WorkerOutcome::Failed(WorkerError::Transport { player_id, .. }) => {
                assert_eq!(player_id, 7)
            }
            WorkerOutcome::Failed(err) => panic!("expected transport failure, got {err}"),
            WorkerOutcome::Done(_) => panic!("expected transport failure, got a summary"),
        }
    }

    #[test]
    fn request_carries_configured_user_agent() {
        let body = r#"{"fixtures": [], "history": []}"#;
        let (template, server) = serve_once(http_response("200 OK", body));
        let client = test_client(Duration::from_secs(5));

        let outcome = run_against(template, &client);
        let request = server.join().expect("server thread").to_ascii_lowercase();

        assert!(matches!(outcome, WorkerOutcome::Done(ref s) if s.player_id == 7));
        assert!(request.starts_with("get /element-summary/7/ "));
        assert!(request.contains(&format!("user-agent: {USER_AGENT}")));
    }

    #[test]
    fn not_found_is_a_transport_failure() {
        let body = r#"{"detail": "Not found."}"#;
        let (template, server) = serve_once(http_response("404 Not Found", body));
        let client = test_client(Duration::from_secs(5));

        let outcome = run_against(template, &client);
        server.join().expect("server thread");

        assert_transport(outcome);
    }

    #[test]
    fn silent_server_times_out_as_transport_failure() {
        // accepted by the backlog but never answered
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let client = test_client(Duration::from_secs(1));

        let outcome = run_against(format!("http://{addr}/element-summary/{{id}}/"), &client);
        drop(listener);

        assert_transport(outcome);
    }
}
