//! Team-request grammar
//!
//! A `|request|` payload is JSON. The wire types below mirror it loosely;
//! [`parse_team_request`] validates them into a [`TeamRequest`] with one
//! [`RevealedPokemon`] per roster entry.

use serde::Deserialize;

use super::battle::{HpStatus, Player, PokemonDetails};
use super::FragmentKind;
use crate::{to_id, ParseError};

/// A validated team request: our full roster plus the active move slots
#[derive(Debug, Clone, PartialEq)]
pub struct TeamRequest {
    /// Request ID for synchronization
    pub rqid: Option<u64>,
    /// Our side
    pub player: Player,
    /// Our display name
    pub username: String,
    /// Roster in request order (switch slots are 1-based indices into this)
    pub pokemon: Vec<RevealedPokemon>,
    /// Whether we must switch this turn
    pub force_switch: bool,
    /// Whether this is team preview
    pub team_preview: bool,
    /// Whether we're waiting for the opponent
    pub wait: bool,
    /// Whether the active pokemon cannot switch out
    pub trapped: bool,
}

impl TeamRequest {
    /// Whether this request asks for a move or switch
    pub fn needs_decision(&self) -> bool {
        !self.wait && !self.team_preview
    }

    /// The active roster entry, if any
    pub fn active(&self) -> Option<&RevealedPokemon> {
        self.pokemon.iter().find(|p| p.active)
    }
}

/// One roster entry of a team request
#[derive(Debug, Clone, PartialEq)]
pub struct RevealedPokemon {
    /// Name used in battle events (nickname or species)
    pub name: String,
    pub details: PokemonDetails,
    pub condition: HpStatus,
    pub active: bool,
    pub stats: PokemonStats,
    /// Move slots; for the active pokemon these come from the detailed
    /// active-move list so slot order matches `/choose move N`
    pub moves: Vec<MoveSlotInfo>,
    pub ability: String,
    pub base_ability: String,
    pub item: String,
}

/// A move slot as the request describes it
#[derive(Debug, Clone, PartialEq)]
pub struct MoveSlotInfo {
    /// Display name, or the ID when only the ID was sent
    pub name: String,
    /// Normalized move ID
    pub id: String,
    pub pp: Option<u32>,
    pub max_pp: Option<u32>,
    pub target: Option<String>,
    pub disabled: bool,
}

impl MoveSlotInfo {
    fn from_entry(entry: &MoveEntry) -> Self {
        match entry {
            MoveEntry::Name(name) => Self {
                name: name.clone(),
                id: normalize_move_id(name),
                pp: None,
                max_pp: None,
                target: None,
                disabled: false,
            },
            MoveEntry::Detailed(slot) => Self::from_detailed(slot),
        }
    }

    fn from_detailed(slot: &DetailedMove) -> Self {
        let id = slot.id.as_deref().unwrap_or(&slot.name);
        Self {
            name: slot.name.clone(),
            id: normalize_move_id(id),
            pp: slot.pp,
            max_pp: slot.max_pp,
            target: slot.target.clone(),
            disabled: slot.disabled.is_disabled(),
        }
    }
}

/// Normalize a move ID, dropping the power suffix Showdown appends to some
/// IDs ("hiddenpowerfire60" -> "hiddenpowerfire", "return102" -> "return")
pub fn normalize_move_id(name: &str) -> String {
    let id = to_id(name);
    let trimmed = id.trim_end_matches(|c: char| c.is_ascii_digit());
    if trimmed.is_empty() {
        id
    } else {
        trimmed.to_string()
    }
}

/// Pokemon stats (atk, def, spa, spd, spe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct PokemonStats {
    pub atk: u32,
    pub def: u32,
    pub spa: u32,
    pub spd: u32,
    pub spe: u32,
}

/// Parse and validate a `|request|` JSON payload
pub fn parse_team_request(raw: &str) -> Result<TeamRequest, ParseError> {
    let kind = FragmentKind::TeamRequest;
    if raw.trim().is_empty() {
        return Err(ParseError::EmptyFragment(kind));
    }

    let wire: WireRequest =
        serde_json::from_str(raw).map_err(|e| ParseError::malformed(kind, e, raw))?;

    let side = wire
        .side
        .as_ref()
        .ok_or_else(|| ParseError::malformed(kind, "missing side", raw))?;
    let player = Player::parse(&side.id)
        .ok_or_else(|| ParseError::malformed(kind, format!("unknown side id '{}'", side.id), raw))?;

    if side.pokemon.is_empty() || side.pokemon.len() > 6 {
        return Err(ParseError::malformed(
            kind,
            format!("roster size {} out of range", side.pokemon.len()),
            raw,
        ));
    }

    let active = wire.active.as_ref().and_then(|a| a.first());

    let pokemon = side
        .pokemon
        .iter()
        .map(|p| reveal(p, active).map_err(|reason| ParseError::malformed(kind, reason, raw)))
        .collect::<Result<Vec<_>, _>>()?;

    if pokemon.iter().filter(|p| p.active).count() > 1 {
        return Err(ParseError::malformed(kind, "more than one active pokemon", raw));
    }

    Ok(TeamRequest {
        rqid: wire.rqid,
        player,
        username: side.name.clone(),
        pokemon,
        force_switch: wire
            .force_switch
            .as_ref()
            .is_some_and(|fs| fs.iter().any(|&b| b)),
        team_preview: wire.team_preview,
        wait: wire.wait,
        trapped: active.is_some_and(|a| a.trapped || a.maybe_trapped),
    })
}

fn reveal(p: &SidePokemon, active: Option<&ActivePokemon>) -> Result<RevealedPokemon, String> {
    let details = PokemonDetails::parse(&p.details)
        .ok_or_else(|| format!("invalid details '{}'", p.details))?;
    let condition = HpStatus::parse(&p.condition)
        .ok_or_else(|| format!("invalid condition '{}'", p.condition))?;
    let name = p
        .ident
        .split_once(": ")
        .map(|(_, name)| name.to_string())
        .ok_or_else(|| format!("invalid ident '{}'", p.ident))?;

    if p.moves.len() > 4 {
        return Err(format!("{} has {} moves", name, p.moves.len()));
    }

    let moves = match active {
        Some(active) if p.active && !active.moves.is_empty() => active
            .moves
            .iter()
            .map(MoveSlotInfo::from_detailed)
            .collect(),
        _ => p.moves.iter().map(MoveSlotInfo::from_entry).collect(),
    };

    Ok(RevealedPokemon {
        name,
        details,
        condition,
        active: p.active,
        stats: p.stats,
        moves,
        ability: p.ability.clone().unwrap_or_else(|| p.base_ability.clone()),
        base_ability: p.base_ability.clone(),
        item: p.item.clone(),
    })
}

/// Raw request JSON
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    rqid: Option<u64>,

    #[serde(default)]
    active: Option<Vec<ActivePokemon>>,

    side: Option<SideInfo>,

    #[serde(default)]
    force_switch: Option<Vec<bool>>,

    #[serde(default)]
    team_preview: bool,

    #[serde(default)]
    wait: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivePokemon {
    #[serde(default)]
    moves: Vec<DetailedMove>,

    #[serde(default)]
    trapped: bool,

    #[serde(default)]
    maybe_trapped: bool,
}

/// Side move lists come either as plain names/IDs or as full move objects
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum MoveEntry {
    Name(String),
    Detailed(DetailedMove),
}

#[derive(Debug, Clone, Deserialize)]
struct DetailedMove {
    #[serde(rename = "move")]
    name: String,

    #[serde(default)]
    id: Option<String>,

    #[serde(default)]
    pp: Option<u32>,

    #[serde(default, rename = "maxpp")]
    max_pp: Option<u32>,

    #[serde(default)]
    target: Option<String>,

    #[serde(default)]
    disabled: Disabled,
}

/// `disabled` is a bool, or the name of the disabling effect
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Disabled {
    Flag(bool),
    Source(String),
}

impl Default for Disabled {
    fn default() -> Self {
        Disabled::Flag(false)
    }
}

impl Disabled {
    fn is_disabled(&self) -> bool {
        match self {
            Disabled::Flag(flag) => *flag,
            Disabled::Source(source) => !source.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SideInfo {
    name: String,
    id: String,
    #[serde(default)]
    pokemon: Vec<SidePokemon>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SidePokemon {
    ident: String,
    details: String,
    condition: String,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    stats: PokemonStats,
    #[serde(default)]
    moves: Vec<MoveEntry>,
    #[serde(default)]
    base_ability: String,
    #[serde(default)]
    ability: Option<String>,
    #[serde(default)]
    item: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &str = r#"{"active":[{"moves":[{"move":"Flamethrower","id":"flamethrower","pp":24,"maxpp":24,"target":"normal","disabled":false},{"move":"Earthquake","id":"earthquake","pp":0,"maxpp":16,"target":"allAdjacent","disabled":false},{"move":"Roost","id":"roost","pp":16,"maxpp":16,"target":"self","disabled":true},{"move":"Hidden Power Ice","id":"hiddenpowerice","pp":24,"maxpp":24,"target":"normal","disabled":false}]}],"side":{"name":"Tactician","id":"p2","pokemon":[{"ident":"p2: Charizard","details":"Charizard, L82, M","condition":"250/271","active":true,"stats":{"atk":185,"def":175,"spa":223,"spd":187,"spe":221},"moves":["flamethrower","earthquake","roost","hiddenpowerice60"],"baseAbility":"solarpower","item":"heavydutyboots","pokeball":"pokeball","ability":"solarpower"},{"ident":"p2: Mr. Mime","details":"Mr. Mime, L88, F","condition":"0 fnt","active":false,"stats":{"atk":100,"def":150,"spa":230,"spd":247,"spe":212},"moves":["psychic","dazzlinggleam","focusblast","nastyplot"],"baseAbility":"filter","item":"lifeorb","pokeball":"pokeball"}]},"rqid":3}"#;

    #[test]
    fn test_parse_request_roster() {
        let request = parse_team_request(REQUEST).unwrap();

        assert_eq!(request.player, Player::P2);
        assert_eq!(request.rqid, Some(3));
        assert_eq!(request.pokemon.len(), 2);
        assert!(request.needs_decision());

        let charizard = request.active().unwrap();
        assert_eq!(charizard.name, "Charizard");
        assert_eq!(charizard.details.level, Some(82));
        assert_eq!(charizard.condition.current, 250);
        assert_eq!(charizard.condition.max, Some(271));
        assert_eq!(charizard.stats.spa, 223);
        assert_eq!(charizard.item, "heavydutyboots");

        let mime = &request.pokemon[1];
        assert_eq!(mime.name, "Mr. Mime");
        assert_eq!(mime.details.species, "Mr. Mime");
        assert!(mime.condition.is_fainted());
        // falls back to base ability
        assert_eq!(mime.ability, "filter");
    }

    #[test]
    fn test_active_pokemon_uses_detailed_moves() {
        let request = parse_team_request(REQUEST).unwrap();
        let moves = &request.active().unwrap().moves;

        assert_eq!(moves.len(), 4);
        assert_eq!(moves[0].name, "Flamethrower");
        assert_eq!(moves[1].pp, Some(0));
        assert!(moves[2].disabled);
        assert_eq!(moves[3].id, "hiddenpowerice");
    }

    #[test]
    fn test_bench_move_names_are_normalized() {
        let request = parse_team_request(REQUEST).unwrap();
        let ids: Vec<_> = request.pokemon[1].moves.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["psychic", "dazzlinggleam", "focusblast", "nastyplot"]);
        assert_eq!(request.pokemon[1].moves[0].pp, None);
    }

    #[test]
    fn test_detailed_side_moves_shape() {
        let raw = r#"{"side":{"name":"A","id":"p1","pokemon":[{"ident":"p1: Pikachu","details":"Pikachu, L90","condition":"200/211","active":false,"stats":{"atk":1,"def":1,"spa":1,"spd":1,"spe":1},"moves":[{"move":"Thunderbolt","id":"thunderbolt","pp":24,"maxpp":24,"target":"normal","disabled":"Taunt"}]}]},"wait":true}"#;
        let request = parse_team_request(raw).unwrap();

        assert!(!request.needs_decision());
        let slot = &request.pokemon[0].moves[0];
        assert_eq!(slot.name, "Thunderbolt");
        assert_eq!(slot.pp, Some(24));
        assert!(slot.disabled);
    }

    #[test]
    fn test_force_switch() {
        let raw = r#"{"forceSwitch":[true],"side":{"name":"A","id":"p1","pokemon":[{"ident":"p1: Pikachu","details":"Pikachu, L90","condition":"0 fnt","active":true,"moves":["thunderbolt"]}]}}"#;
        let request = parse_team_request(raw).unwrap();
        assert!(request.force_switch);
    }

    #[test]
    fn test_invalid_requests() {
        assert!(matches!(
            parse_team_request("not json"),
            Err(ParseError::Malformed { .. })
        ));
        assert!(parse_team_request(r#"{"rqid":1}"#).is_err());
        assert!(parse_team_request(r#"{"side":{"name":"A","id":"p9","pokemon":[]}}"#).is_err());
        assert_eq!(
            parse_team_request(""),
            Err(ParseError::EmptyFragment(FragmentKind::TeamRequest))
        );
    }

    #[test]
    fn test_normalize_move_id() {
        assert_eq!(normalize_move_id("hiddenpowerfire60"), "hiddenpowerfire");
        assert_eq!(normalize_move_id("return102"), "return");
        assert_eq!(normalize_move_id("Flamethrower"), "flamethrower");
    }
}
