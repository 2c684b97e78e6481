use crate::lookup::{Lookup, UNKNOWN};
use crate::summary::PlayerSummary;

/// Fill display names on a freshly decoded summary.
///
/// The player's own team is inferred from the first fixture; without any
/// fixture it stays `n/a`.
pub fn enrich_summary(summary: &mut PlayerSummary, lookup: &Lookup) {
    let player_name = lookup.player(summary.player_id).to_string();
    let team = summary
        .fixtures
        .first()
        .map(|f| lookup.team(f.sides().0).to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());

    for fixture in &mut summary.fixtures {
        let (own, opp) = fixture.sides();
        fixture.player_name = player_name.clone();
        fixture.team = lookup.team(own).to_string();
        fixture.opponent = lookup.team(opp).to_string();
    }

    for record in &mut summary.past_matches {
        record.player_name = player_name.clone();
        record.team = team.clone();
        record.opponent = lookup.team(record.opponent_id).to_string();
    }

    for season in &mut summary.past_years {
        season.player_name = player_name.clone();
        season.team_name_now = team.clone();
        season.team_name_then = UNKNOWN.to_string();
    }

    summary.player_name = player_name;
    summary.team = team;
}
