//! Failure taxonomy for the per-player pipeline.

use thiserror::Error;

/// Why a player's worker contributed nothing to the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// Network, timeout or non-success HTTP status.
    #[error("transport failure for player {player_id}: {message}")]
    Transport { player_id: u32, message: String },

    /// Body was fetched but is not a valid element summary.
    #[error("decode failure for player {player_id}: {message}")]
    Decode { player_id: u32, message: String },
}

impl WorkerError {
    pub fn player_id(&self) -> u32 {
        match self {
            WorkerError::Transport { player_id, .. } | WorkerError::Decode { player_id, .. } => {
                *player_id
            }
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, WorkerError::Transport { .. })
    }
}

/// A fixture whose predicted points cannot be derived from the available data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PredictError {
    #[error("no aggregate history recorded against opponent {0}")]
    MissingOpponentHistory(String),

    #[error("no form figure for team {0}")]
    MissingTeamForm(String),

    #[error("team {0} has no matches played")]
    NoMatchesPlayed(String),

    #[error("no output share for player {0}")]
    MissingPlayerShare(u32),
}
