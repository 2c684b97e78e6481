//! Opponent -> gameweek -> cumulative points, built concurrently then frozen.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::lookup::Lookup;
use crate::summary::MatchRecord;

type RoundPoints = BTreeMap<u32, i64>;

/// Shared accumulator written by the fetch workers.
///
/// Only `merge` touches the map while workers run. Reading requires
/// `freeze`, which consumes the builder and therefore cannot happen while
/// any worker still borrows it.
#[derive(Debug, Default)]
pub struct OpponentPointsBuilder {
    inner: Mutex<BTreeMap<String, RoundPoints>>,
}

impl OpponentPointsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one player's history. Returns the number of records folded in.
    pub fn merge(&self, records: &[MatchRecord], lookup: &Lookup) -> usize {
        if records.is_empty() {
            return 0;
        }
        let mut local: BTreeMap<String, RoundPoints> = BTreeMap::new();
        for record in records {
            let opponent = lookup.team(record.opponent_id);
            *local
                .entry(opponent.to_string())
                .or_default()
                .entry(record.round)
                .or_insert(0) += record.total_points;
        }

        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for (opponent, rounds) in local {
            let table = guard.entry(opponent).or_default();
            for (round, points) in rounds {
                *table.entry(round).or_insert(0) += points;
            }
        }
        records.len()
    }

    pub fn freeze(self) -> AggregateTable {
        let teams = self
            .inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        AggregateTable { teams }
    }
}

/// Read-only result of the aggregation phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateTable {
    teams: BTreeMap<String, RoundPoints>,
}

/// Flat export row for one (opponent, round) entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpponentRoundPoints {
    pub opponent: String,
    pub round: u32,
    pub points: i64,
}

impl AggregateTable {
    pub fn entries(&self, team: &str) -> Option<&BTreeMap<u32, i64>> {
        self.teams.get(team)
    }

    pub fn entry_count(&self, team: &str) -> usize {
        self.teams.get(team).map(BTreeMap::len).unwrap_or(0)
    }

    pub fn total_points(&self, team: &str) -> i64 {
        self.teams
            .get(team)
            .map(|rounds| rounds.values().sum())
            .unwrap_or(0)
    }

    /// Average cumulative points per recorded gameweek entry against `team`.
    /// `None` when nothing has been recorded against it.
    pub fn points_per_game(&self, team: &str) -> Option<f64> {
        let count = self.entry_count(team);
        if count == 0 {
            return None;
        }
        Some(self.total_points(team) as f64 / count as f64)
    }

    pub fn teams(&self) -> impl Iterator<Item = &str> {
        self.teams.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn rows(&self) -> Vec<OpponentRoundPoints> {
        self.teams
            .iter()
            .flat_map(|(opponent, rounds)| {
                rounds.iter().map(move |(round, points)| OpponentRoundPoints {
                    opponent: opponent.clone(),
                    round: *round,
                    points: *points,
                })
            })
            .collect()
    }

    /// Ordered JSON rendering; identical tables give identical bytes.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.teams).context("serialize aggregate table")
    }
}
