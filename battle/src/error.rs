use tactician_protocol::{ParseError, Player};
use thiserror::Error;

/// Errors surfaced by battle tracking and decision making
#[derive(Error, Debug)]
pub enum BattleError {
    #[error("Fragment rejected: {0}")]
    Parse(#[from] ParseError),

    #[error("Unknown entity '{name}' on side {side}")]
    UnknownEntity { side: Player, name: String },

    #[error("Reference data for '{name}' has not been resolved")]
    UnresolvedReference { name: String },

    #[error("No castable move and no eligible switch")]
    NoLegalAction,

    #[error("Reference data did not converge in time, still missing: {}", pending.join(", "))]
    SyncTimeout { pending: Vec<String> },

    #[error("Failed to send command: {0}")]
    Send(#[source] anyhow::Error),
}
