//! Bootstrap roster: every player, team and role, plus the per-team figures
//! the predictor reads (team form, matches played, player share).

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::AggregateTable;
use crate::export::{CsvExporter, sanitize_segment};
use crate::http_client::fetch_body;
use crate::lookup::Lookup;

/// Minutes in one full match for a whole XI.
const TEAM_MATCH_MINUTES: f64 = 990.0;
/// Summary rows get ids above every real player id.
pub const SUMMARY_ID_OFFSET: u32 = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapResponse {
    #[serde(rename = "elements")]
    pub players: Vec<RosterPlayer>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(rename = "element_types", default)]
    pub roles: Vec<PlayerRole>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Team {
    pub id: u32,
    pub short_name: String,
    #[serde(rename(deserialize = "name"))]
    pub long_name: String,
    pub strength_attack_home: i32,
    pub strength_attack_away: i32,
    pub strength_defence_home: i32,
    pub strength_defence_away: i32,
    pub win: i32,
    pub draw: i32,
    pub loss: i32,
    #[serde(rename(deserialize = "points"))]
    pub team_points: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerRole {
    pub id: u32,
    #[serde(rename(deserialize = "singular_name"))]
    pub long_name: String,
    #[serde(rename(deserialize = "singular_name_short"))]
    pub short_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterPlayer {
    pub id: u32,
    pub web_name: String,
    #[serde(skip_deserializing)]
    pub team_name: String,
    #[serde(skip_deserializing)]
    pub role_name: String,
    #[serde(rename(deserialize = "team"))]
    pub team_id: u32,
    #[serde(rename(deserialize = "element_type"))]
    pub role_id: u32,
    #[serde(skip_deserializing)]
    pub player_count: u32,
    #[serde(skip_deserializing)]
    pub regular_player_count: u32,
    pub points_per_game: String,
    #[serde(skip_deserializing)]
    pub opp_points_per_game: String,
    pub form: String,
    pub total_points: i64,
    pub value_form: String,
    pub value_season: String,
    pub ict_index: String,
    pub now_cost: i64,
    pub minutes: u32,
}

/// Recent output of a team, as the predictor consumes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamForm {
    /// Sum of `form` over every player who has minutes this season.
    pub total_form: f64,
    /// `round(team minutes / 990)`.
    pub matches_played: u32,
}

pub type TeamFormTable = BTreeMap<String, TeamForm>;

/// Player id -> percentage of the team's total points.
pub type PlayerShareTable = HashMap<u32, f64>;

pub fn parse_bootstrap_json(raw: &str) -> Result<BootstrapResponse> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(anyhow!("empty bootstrap response"));
    }
    serde_json::from_str(trimmed).context("invalid bootstrap json")
}

pub fn fetch_bootstrap(client: &Client, url: &str) -> Result<BootstrapResponse> {
    let body = fetch_body(client, url).context("bootstrap request failed")?;
    parse_bootstrap_json(&body)
}

#[derive(Debug, Clone)]
pub struct Roster {
    pub players: Vec<RosterPlayer>,
    pub teams: Vec<Team>,
    pub roles: Vec<PlayerRole>,
    by_team: BTreeMap<String, Vec<RosterPlayer>>,
}

#[derive(Debug, Clone, Default)]
struct TeamTotals {
    team_id: u32,
    total_points: i64,
    now_cost: i64,
    minutes: u64,
    matches_played: f64,
    player_count: u32,
    regular_player_count: u32,
    ict_sum: f64,
    form_sum: f64,
}

impl Roster {
    pub fn from_bootstrap(resp: BootstrapResponse, lookup: &Lookup) -> Self {
        let mut players = resp.players;
        let mut by_team: BTreeMap<String, Vec<RosterPlayer>> = BTreeMap::new();
        for player in &mut players {
            player.web_name = lookup.player(player.id).to_string();
            player.team_name = lookup.team(player.team_id).to_string();
            player.role_name = lookup.role(player.role_id).to_string();
            by_team
                .entry(player.team_name.clone())
                .or_default()
                .push(player.clone());
        }
        Self {
            players,
            teams: resp.teams,
            roles: resp.roles,
            by_team,
        }
    }

    pub fn player_ids(&self) -> Vec<u32> {
        self.players.iter().map(|p| p.id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn team_names(&self) -> impl Iterator<Item = &str> {
        self.by_team.keys().map(String::as_str)
    }

    pub fn team_players(&self, team: &str) -> &[RosterPlayer] {
        self.by_team.get(team).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn team_form(&self) -> TeamFormTable {
        self.by_team
            .iter()
            .map(|(team, players)| {
                let totals = team_totals(players);
                (
                    team.clone(),
                    TeamForm {
                        total_form: totals.form_sum,
                        matches_played: totals.matches_played as u32,
                    },
                )
            })
            .collect()
    }

    pub fn player_shares(&self) -> PlayerShareTable {
        let mut shares = HashMap::with_capacity(self.players.len());
        for players in self.by_team.values() {
            let team_points: i64 = players.iter().map(|p| p.total_points).sum();
            for player in players {
                let share = if team_points == 0 {
                    0.0
                } else {
                    100.0 * player.total_points as f64 / team_points as f64
                };
                shares.insert(player.id, share);
            }
        }
        shares
    }

    /// Cumulative row for one team. `opp_points_per_game` needs the
    /// aggregate and reads `n/a` without it.
    pub fn team_summary(&self, team: &str, table: Option<&AggregateTable>) -> Option<RosterPlayer> {
        let players = self.by_team.get(team)?;
        let totals = team_totals(players);
        let price = totals.now_cost as f64 / 10.0;
        let opp_points_per_game = match table {
            Some(table) => ratio(table.total_points(team) as f64, totals.matches_played),
            None => crate::lookup::UNKNOWN.to_string(),
        };

        Some(RosterPlayer {
            id: totals.team_id + SUMMARY_ID_OFFSET,
            web_name: format!("AllPlayed_{team}_Players"),
            team_name: team.to_string(),
            role_name: "all".to_string(),
            team_id: totals.team_id,
            role_id: 0,
            player_count: totals.player_count,
            regular_player_count: totals.regular_player_count,
            points_per_game: ratio(totals.total_points as f64, totals.matches_played),
            opp_points_per_game,
            form: format!("{:.2}", totals.form_sum),
            total_points: totals.total_points,
            value_form: ratio(totals.form_sum, price),
            value_season: ratio(totals.total_points as f64, price),
            ict_index: ratio(totals.ict_sum, totals.regular_player_count as f64),
            now_cost: totals.now_cost,
            minutes: u32::try_from(totals.minutes).unwrap_or(u32::MAX),
        })
    }

    /// Write the per-team, all-team, role and team tables.
    pub fn export(&self, exporter: &CsvExporter, table: Option<&AggregateTable>) {
        let mut summaries = Vec::with_capacity(self.by_team.len());
        for (team, players) in &self.by_team {
            let Some(summary) = self.team_summary(team, table) else {
                continue;
            };
            let mut rows = Vec::with_capacity(players.len() + 1);
            rows.push(summary.clone());
            rows.extend(players.iter().cloned());
            exporter.write_logged(&rows, &format!("fpl-players/{}", sanitize_segment(team)));
            summaries.push(summary);
        }

        let mut all = summaries;
        all.extend(self.players.iter().cloned());
        exporter.write_logged(&all, "fpl-players/allteam");
        exporter.write_logged(&self.roles, "fpl-roles");
        exporter.write_logged(&self.teams, "fpl-teams");
        info!(
            teams = self.by_team.len(),
            players = self.players.len(),
            "roster exported"
        );
    }
}

fn team_totals(players: &[RosterPlayer]) -> TeamTotals {
    let mut totals = TeamTotals {
        team_id: players.first().map(|p| p.team_id).unwrap_or(0),
        ..TeamTotals::default()
    };
    for player in players {
        totals.total_points += player.total_points;
        totals.now_cost += player.now_cost;
        totals.minutes += u64::from(player.minutes);
    }
    totals.matches_played = (totals.minutes as f64 / TEAM_MATCH_MINUTES).round();

    let regular_minutes = totals.matches_played * 90.0;
    for player in players {
        if player.minutes == 0 {
            continue;
        }
        if f64::from(player.minutes) >= regular_minutes {
            totals.regular_player_count += 1;
        }
        totals.player_count += 1;
        totals.ict_sum += parse_stat(&player.ict_index, player.id);
        totals.form_sum += parse_stat(&player.form, player.id);
    }
    totals
}

fn parse_stat(raw: &str, player_id: u32) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            warn!(player_id, value = trimmed, "unparseable roster stat, counted as 0");
            0.0
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> String {
    if denominator == 0.0 {
        return crate::lookup::UNKNOWN.to_string();
    }
    let value = numerator / denominator;
    if !value.is_finite() {
        return crate::lookup::UNKNOWN.to_string();
    }
    format!("{value:.2}")
}
