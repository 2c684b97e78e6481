//! Second pass over every player's fixtures, run against the frozen aggregate.
//!
//! For a fixture of `team` against `opponent`:
//!
//! ```text
//! opp_ppg   = sum(table[opponent]) / count(table[opponent])
//! team_ppg  = team_form[team].total_form / team_form[team].matches_played
//! predicted = share[player] / 100 * 0.5 * (team_ppg + opp_ppg)
//! ```
//!
//! Any missing or zero denominator skips that one fixture with a
//! [`PredictError`]; nothing non-finite is ever stored.

use rayon::prelude::*;
use tracing::warn;

use crate::aggregate::AggregateTable;
use crate::error::PredictError;
use crate::lookup::Lookup;
use crate::roster::{PlayerShareTable, TeamFormTable};
use crate::summary::{Fixture, PlayerSummary};

/// Everything the predictor reads. All of it is immutable during the pass.
#[derive(Debug, Clone, Copy)]
pub struct PredictionInputs<'a> {
    pub table: &'a AggregateTable,
    pub team_form: &'a TeamFormTable,
    pub shares: &'a PlayerShareTable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFixture {
    pub player_id: u32,
    pub fixture_id: u32,
    pub reason: PredictError,
}

#[derive(Debug, Clone, Default)]
pub struct PredictionReport {
    /// Every player, in input order, with `predicted_points` filled where possible.
    pub players: Vec<PlayerSummary>,
    /// Every predicted fixture across all players, in player then fixture order.
    pub combined: Vec<Fixture>,
    pub skipped: Vec<SkippedFixture>,
}

pub fn team_points_per_game(team: &str, team_form: &TeamFormTable) -> Result<f64, PredictError> {
    let form = team_form
        .get(team)
        .ok_or_else(|| PredictError::MissingTeamForm(team.to_string()))?;
    if form.matches_played == 0 {
        return Err(PredictError::NoMatchesPlayed(team.to_string()));
    }
    Ok(form.total_form / f64::from(form.matches_played))
}

pub fn predict_points(
    player_id: u32,
    team: &str,
    opponent: &str,
    inputs: PredictionInputs<'_>,
) -> Result<f64, PredictError> {
    let opp_ppg = inputs
        .table
        .points_per_game(opponent)
        .ok_or_else(|| PredictError::MissingOpponentHistory(opponent.to_string()))?;
    let team_ppg = team_points_per_game(team, inputs.team_form)?;
    let share = inputs
        .shares
        .get(&player_id)
        .copied()
        .ok_or(PredictError::MissingPlayerShare(player_id))?;
    Ok(share / 100.0 * 0.5 * (team_ppg + opp_ppg))
}

/// Resolve names and fill `predicted_points` on each of the player's fixtures.
pub fn predict_fixtures(
    summary: &mut PlayerSummary,
    lookup: &Lookup,
    inputs: PredictionInputs<'_>,
) -> Vec<SkippedFixture> {
    let mut skipped = Vec::new();
    for fixture in &mut summary.fixtures {
        let (own, opp) = fixture.sides();
        fixture.team = lookup.team(own).to_string();
        fixture.opponent = lookup.team(opp).to_string();

        match predict_points(summary.player_id, &fixture.team, &fixture.opponent, inputs) {
            Ok(points) => fixture.predicted_points = Some(points),
            Err(reason) => {
                warn!(
                    player_id = summary.player_id,
                    fixture_id = fixture.fixture_id,
                    "fixture skipped: {reason}"
                );
                fixture.predicted_points = None;
                skipped.push(SkippedFixture {
                    player_id: summary.player_id,
                    fixture_id: fixture.fixture_id,
                    reason,
                });
            }
        }
    }
    skipped
}

/// Fixtures of `summary` that received a prediction.
pub fn predicted_fixtures(summary: &PlayerSummary) -> Vec<Fixture> {
    summary
        .fixtures
        .iter()
        .filter(|f| f.predicted_points.is_some())
        .cloned()
        .collect()
}

pub fn predict_all(
    mut players: Vec<PlayerSummary>,
    lookup: &Lookup,
    inputs: PredictionInputs<'_>,
) -> PredictionReport {
    let skipped: Vec<SkippedFixture> = players
        .par_iter_mut()
        .flat_map_iter(|summary| predict_fixtures(summary, lookup, inputs))
        .collect();

    let combined = players.iter().flat_map(predicted_fixtures).collect();

    PredictionReport {
        players,
        combined,
        skipped,
    }
}
