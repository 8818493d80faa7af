mod battle;
mod events;
mod reference;
mod request;

use std::fmt;

use crate::ParseError;

pub use battle::{HpStatus, Player, PokemonDetails, PokemonRef, Stat};
pub use events::{BattleEvent, parse_event_line, parse_turn_update};
pub use reference::{
    MoveCategory, MoveRecord, ReferenceRecord, SpeciesRecord, StatLine, parse_reference_data,
};
pub use request::{
    MoveSlotInfo, PokemonStats, RevealedPokemon, TeamRequest, normalize_move_id,
    parse_team_request,
};

/// The three fragment kinds a battle room delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    TeamRequest,
    TurnUpdate,
    ReferenceData,
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FragmentKind::TeamRequest => "team-request",
            FragmentKind::TurnUpdate => "turn-update",
            FragmentKind::ReferenceData => "reference-data",
        })
    }
}

/// One WebSocket frame: an optional `>ROOMID` header and its lines
#[derive(Debug, Clone, PartialEq)]
pub struct ServerFrame {
    pub room_id: Option<String>,
    pub lines: Vec<String>,
}

/// Raw text of one fragment, tagged with the grammar it should be decoded by
#[derive(Debug, Clone, PartialEq)]
pub struct RoomFragment {
    pub kind: FragmentKind,
    pub text: String,
}

impl RoomFragment {
    pub fn new(kind: FragmentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// A decoded fragment
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    TeamRequest(TeamRequest),
    TurnUpdate(Vec<BattleEvent>),
    ReferenceData(ReferenceRecord),
}

/// Split a complete WebSocket frame into its room header and lines
pub fn parse_server_frame(frame: &str) -> Result<ServerFrame, ParseError> {
    if frame.trim().is_empty() {
        return Err(ParseError::Unparsed {
            raw: frame.to_string(),
        });
    }

    let mut lines = frame.lines().peekable();
    let mut room_id = None;

    // Check if first line is >ROOMID
    if let Some(room) = lines.peek().and_then(|l| l.strip_prefix('>')) {
        room_id = Some(room.trim().to_string());
        lines.next();
    }

    let lines = lines
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect();

    Ok(ServerFrame { room_id, lines })
}

/// Split a frame's lines into tagged fragments, preserving textual order.
///
/// Consecutive battle lines are gathered into a single turn-update block; a
/// request or lookup response in between closes the current block.
pub fn classify_frame(frame: &ServerFrame) -> Vec<RoomFragment> {
    let mut fragments = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in &frame.lines {
        if let Some(payload) = line.strip_prefix("|request|") {
            flush_block(&mut block, &mut fragments);
            // An empty request only clears the previous one
            if !payload.trim().is_empty() {
                fragments.push(RoomFragment::new(FragmentKind::TeamRequest, payload));
            }
        } else if is_reference_line(line) {
            flush_block(&mut block, &mut fragments);
            fragments.push(RoomFragment::new(FragmentKind::ReferenceData, line.as_str()));
        } else if line.starts_with('|') {
            block.push(line);
        }
    }
    flush_block(&mut block, &mut fragments);

    fragments
}

fn is_reference_line(line: &str) -> bool {
    let carrier = line.starts_with("|raw|")
        || line.starts_with("|html|")
        || line.starts_with("|c|~|/raw ");
    carrier && line.contains("utilichart")
}

fn flush_block(block: &mut Vec<&str>, fragments: &mut Vec<RoomFragment>) {
    if block.is_empty() {
        return;
    }
    fragments.push(RoomFragment::new(FragmentKind::TurnUpdate, block.join("\n")));
    block.clear();
}

/// Decode a fragment with the grammar its tag names
pub fn parse_fragment(fragment: &RoomFragment) -> Result<Fragment, ParseError> {
    match fragment.kind {
        FragmentKind::TeamRequest => parse_team_request(&fragment.text).map(Fragment::TeamRequest),
        FragmentKind::TurnUpdate => parse_turn_update(&fragment.text).map(Fragment::TurnUpdate),
        FragmentKind::ReferenceData => {
            parse_reference_data(&fragment.text).map(Fragment::ReferenceData)
        }
    }
}
