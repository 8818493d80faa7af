//! Turn-update grammar
//!
//! A turn-update block is a run of `|TAG|...` lines. Each recognised tag maps
//! to one [`BattleEvent`]; lines with other tags carry nothing the tracker
//! needs and are skipped.

use super::battle::{
    parse_details, parse_hp_status, parse_pokemon, HpStatus, Player, PokemonDetails, PokemonRef,
    Stat,
};
use super::FragmentKind;
use crate::ParseError;

/// A single state-changing event from a turn-update block
#[derive(Debug, Clone, PartialEq)]
pub enum BattleEvent {
    /// |player|PLAYER|USERNAME|AVATAR|RATING
    Player { player: Player, username: String },

    /// |switch|POKEMON|DETAILS|HP STATUS or |drag|... when `forced`
    Switch {
        pokemon: PokemonRef,
        details: PokemonDetails,
        hp_status: HpStatus,
        forced: bool,
    },

    /// |move|POKEMON|MOVE|TARGET
    Move {
        pokemon: PokemonRef,
        move_name: String,
        target: Option<PokemonRef>,
    },

    /// |-damage|POKEMON|HP STATUS
    Damage {
        pokemon: PokemonRef,
        hp_status: HpStatus,
    },

    /// |-heal|POKEMON|HP STATUS
    Heal {
        pokemon: PokemonRef,
        hp_status: HpStatus,
    },

    /// |-boost|POKEMON|STAT|AMOUNT
    Boost {
        pokemon: PokemonRef,
        stat: Stat,
        amount: i32,
    },

    /// |-unboost|POKEMON|STAT|AMOUNT
    Unboost {
        pokemon: PokemonRef,
        stat: Stat,
        amount: i32,
    },

    /// |faint|POKEMON
    Faint(PokemonRef),

    /// |turn|NUMBER
    Turn(u32),

    /// |win|USER
    Win(String),

    /// |tie
    Tie,
}

/// Parse a turn-update block into its events, in textual order.
///
/// All events of a kind are collected; a recognised line with a bad shape
/// rejects the whole block.
pub fn parse_turn_update(block: &str) -> Result<Vec<BattleEvent>, ParseError> {
    if block.trim().is_empty() {
        return Err(ParseError::EmptyFragment(FragmentKind::TurnUpdate));
    }

    let mut events = Vec::new();
    for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match parse_event_line(line) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(reason) => {
                return Err(ParseError::malformed(
                    FragmentKind::TurnUpdate,
                    format!("{} in line '{}'", reason, line),
                    block,
                ));
            }
        }
    }

    Ok(events)
}

/// Parse one line. `Ok(None)` means the tag is not one the tracker consumes.
pub fn parse_event_line(line: &str) -> Result<Option<BattleEvent>, String> {
    let Some(body) = line.strip_prefix('|') else {
        return Ok(None);
    };

    // Re-add the leading empty part so indices match the wire layout
    let parts: Vec<&str> = std::iter::once("").chain(body.split('|')).collect();

    let event = match parts[1] {
        "player" => parse_player(&parts)?,
        "switch" => parse_switch(&parts, false)?,
        "drag" => parse_switch(&parts, true)?,
        "move" => parse_move(&parts)?,
        "-damage" => BattleEvent::Damage {
            pokemon: parse_pokemon(&parts, 2)?,
            hp_status: parse_hp_status(&parts, 3)?,
        },
        "-heal" => BattleEvent::Heal {
            pokemon: parse_pokemon(&parts, 2)?,
            hp_status: parse_hp_status(&parts, 3)?,
        },
        "-boost" => {
            let (pokemon, stat, amount) = parse_boost(&parts)?;
            BattleEvent::Boost {
                pokemon,
                stat,
                amount,
            }
        }
        "-unboost" => {
            let (pokemon, stat, amount) = parse_boost(&parts)?;
            BattleEvent::Unboost {
                pokemon,
                stat,
                amount,
            }
        }
        "faint" => BattleEvent::Faint(parse_pokemon(&parts, 2)?),
        "turn" => {
            let turn = parts
                .get(2)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| "missing turn number".to_string())?;
            BattleEvent::Turn(turn)
        }
        "win" => {
            let winner = parts.get(2).filter(|s| !s.is_empty());
            BattleEvent::Win(winner.ok_or_else(|| "missing winner".to_string())?.to_string())
        }
        "tie" => BattleEvent::Tie,
        _ => return Ok(None),
    };

    Ok(Some(event))
}

fn parse_player(parts: &[&str]) -> Result<BattleEvent, String> {
    let player = parts
        .get(2)
        .and_then(|s| Player::parse(s))
        .ok_or_else(|| "missing player".to_string())?;
    let username = parts.get(3).unwrap_or(&"").to_string();

    Ok(BattleEvent::Player { player, username })
}

fn parse_switch(parts: &[&str], forced: bool) -> Result<BattleEvent, String> {
    Ok(BattleEvent::Switch {
        pokemon: parse_pokemon(parts, 2)?,
        details: parse_details(parts, 3)?,
        hp_status: parse_hp_status(parts, 4)?,
        forced,
    })
}

fn parse_move(parts: &[&str]) -> Result<BattleEvent, String> {
    let pokemon = parse_pokemon(parts, 2)?;
    let move_name = parts
        .get(3)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "missing move name".to_string())?
        .to_string();
    let target = parts.get(4).and_then(|s| PokemonRef::parse(s));

    Ok(BattleEvent::Move {
        pokemon,
        move_name,
        target,
    })
}

fn parse_boost(parts: &[&str]) -> Result<(PokemonRef, Stat, i32), String> {
    let pokemon = parse_pokemon(parts, 2)?;
    let stat = parts
        .get(3)
        .and_then(|s| Stat::parse(s))
        .ok_or_else(|| "missing stat".to_string())?;
    let amount = parts
        .get(4)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| "missing amount".to_string())?;

    Ok((pokemon, stat, amount))
}
