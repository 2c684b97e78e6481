//! Per-player element-summary records and the decoder that produces them.
//!
//! Field names double as CSV headers on export; the JSON names used by the
//! API are only applied on the deserialize side.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize, Serializer};

/// One player's upcoming fixtures, match history and prior seasons.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerSummary {
    #[serde(skip)]
    pub player_id: u32,
    #[serde(skip)]
    pub player_name: String,
    #[serde(skip)]
    pub team: String,
    pub fixtures: Vec<Fixture>,
    #[serde(rename = "history")]
    pub past_matches: Vec<MatchRecord>,
    #[serde(rename = "history_past", default)]
    pub past_years: Vec<SeasonRecord>,
}

impl PlayerSummary {
    /// `{team}-{name}-{id}`, the per-player part of every export name.
    pub fn export_stem(&self) -> String {
        format!("{}-{}-{}", self.team, self.player_name, self.player_id)
    }
}

/// An upcoming fixture, seen from the player's team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(rename(deserialize = "id"))]
    pub fixture_id: u32,
    #[serde(skip_deserializing)]
    pub player_name: String,
    #[serde(skip_deserializing)]
    pub team: String,
    #[serde(skip_deserializing)]
    pub opponent: String,
    #[serde(default)]
    pub difficulty: u8,
    pub team_h: u32,
    pub team_a: u32,
    pub is_home: bool,
    #[serde(default)]
    pub event: Option<u32>,
    #[serde(default, rename(deserialize = "event_name"))]
    pub gameweek: Option<String>,
    #[serde(skip_deserializing, serialize_with = "two_decimals")]
    pub predicted_points: Option<f64>,
}

impl Fixture {
    /// (own team id, opponent id) according to the home flag.
    pub fn sides(&self) -> (u32, u32) {
        if self.is_home {
            (self.team_h, self.team_a)
        } else {
            (self.team_a, self.team_h)
        }
    }
}

/// One played round. Rounds may repeat (double gameweeks) or skip (blanks).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRecord {
    #[serde(rename(deserialize = "element"))]
    pub player_id: u32,
    #[serde(skip_deserializing)]
    pub player_name: String,
    pub value: i64,
    pub total_points: i64,
    pub minutes: u32,
    #[serde(skip_deserializing)]
    pub team: String,
    #[serde(skip_deserializing)]
    pub opponent: String,
    #[serde(rename(deserialize = "opponent_team"))]
    pub opponent_id: u32,
    pub round: u32,
    pub was_home: bool,
    pub team_h_score: Option<i32>,
    pub team_a_score: Option<i32>,
    pub assists: i32,
    pub bonus: i32,
    pub clean_sheets: i32,
    pub goals_scored: i32,
    pub penalties_saved: i32,
    pub saves: i32,
    pub goals_conceded: i32,
    pub own_goals: i32,
    pub penalties_missed: i32,
    pub red_cards: i32,
    pub yellow_cards: i32,
}

/// Aggregate figures for a season before the current one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonRecord {
    pub season_name: String,
    pub element_code: u32,
    #[serde(skip_deserializing)]
    pub player_name: String,
    #[serde(skip_deserializing)]
    pub team_name_now: String,
    #[serde(skip_deserializing)]
    pub team_name_then: String,
    pub start_cost: i64,
    pub end_cost: i64,
    pub minutes: u32,
    pub total_points: i64,
}

/// Decode an element-summary body for `player_id`.
pub fn parse_element_summary_json(raw: &str, player_id: u32) -> Result<PlayerSummary> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(anyhow!("empty element summary response"));
    }
    let mut summary: PlayerSummary =
        serde_json::from_str(trimmed).context("invalid element summary json")?;
    summary.player_id = player_id;
    Ok(summary)
}

fn two_decimals<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(points) => serializer.serialize_str(&format!("{points:.2}")),
        None => serializer.serialize_none(),
    }
}
