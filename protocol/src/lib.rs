use std::fmt;

use thiserror::Error;

pub mod client;
pub mod server;

pub use client::{ClientCommand, ClientMessage};
pub use server::{
    BattleEvent, Fragment, FragmentKind, HpStatus, MoveCategory, MoveRecord, MoveSlotInfo,
    Player, PokemonDetails, PokemonRef, PokemonStats, ReferenceRecord, RevealedPokemon,
    RoomFragment, ServerFrame, SpeciesRecord, Stat, StatLine, TeamRequest, classify_frame,
    normalize_move_id, parse_event_line, parse_fragment, parse_reference_data,
    parse_server_frame, parse_team_request, parse_turn_update,
};

/// A fragment of the battle feed that did not match its grammar.
///
/// Every variant produced for a non-empty fragment keeps the raw input so the
/// caller can log exactly what was dropped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Empty {0} fragment")]
    EmptyFragment(FragmentKind),

    #[error("Malformed {kind} fragment: {reason}")]
    Malformed {
        kind: FragmentKind,
        reason: String,
        raw: String,
    },

    #[error("Unrecognised fragment")]
    Unparsed { raw: String },
}

impl ParseError {
    pub(crate) fn malformed(kind: FragmentKind, reason: impl fmt::Display, raw: &str) -> Self {
        ParseError::Malformed {
            kind,
            reason: reason.to_string(),
            raw: raw.to_string(),
        }
    }

    /// The raw fragment text, if any
    pub fn raw(&self) -> Option<&str> {
        match self {
            ParseError::EmptyFragment(_) => None,
            ParseError::Malformed { raw, .. } | ParseError::Unparsed { raw } => Some(raw),
        }
    }
}

/// Convert a display name to a Showdown ID ("Mr. Mime" -> "mrmime")
pub fn to_id(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_id() {
        assert_eq!(to_id("Mr. Mime"), "mrmime");
        assert_eq!(to_id("Flamethrower"), "flamethrower");
        assert_eq!(to_id("King's Shield"), "kingsshield");
        assert_eq!(to_id("Porygon-Z"), "porygonz");
    }

    #[test]
    fn test_parse_error_keeps_raw() {
        let err = ParseError::malformed(FragmentKind::TurnUpdate, "bad boost", "|-boost|x");
        assert_eq!(err.raw(), Some("|-boost|x"));
        assert!(ParseError::EmptyFragment(FragmentKind::TeamRequest).raw().is_none());
    }
}
