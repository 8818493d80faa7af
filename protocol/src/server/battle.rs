//! Shared types for battle protocol messages

use std::fmt;

/// Player in a two-player battle (p1, p2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    P1,
    P2,
}

impl Player {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "p1" => Some(Player::P1),
            "p2" => Some(Player::P2),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Player::P1 => "p1",
            Player::P2 => "p2",
        }
    }

    /// The other side of the battle
    pub fn opponent(&self) -> Self {
        match self {
            Player::P1 => Player::P2,
            Player::P2 => Player::P1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pokemon identifier in the form "POSITION: NAME" (e.g., "p1a: Pikachu")
#[derive(Debug, Clone, PartialEq)]
pub struct PokemonRef {
    /// Player who owns this pokemon
    pub player: Player,
    /// Position letter (a, b, c for active slots, or None if inactive)
    pub position: Option<char>,
    /// Pokemon's name/nickname
    pub name: String,
}

impl PokemonRef {
    /// Parse a pokemon ID string like "p1a: Pikachu" or "p2: Tapu Koko"
    pub fn parse(s: &str) -> Option<Self> {
        let (pos_part, name) = s.split_once(": ")?;
        let player = Player::parse(pos_part.get(..2)?)?;
        let position = pos_part.chars().nth(2);

        if name.trim().is_empty() {
            return None;
        }

        Some(PokemonRef {
            player,
            position,
            name: name.to_string(),
        })
    }
}

/// Pokemon details string (species, level, gender, shiny)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PokemonDetails {
    pub species: String,
    pub level: Option<u8>,
    pub gender: Option<char>,
    pub shiny: bool,
}

impl PokemonDetails {
    /// Parse a details string like "Pikachu, L50, M, shiny" or "Mr. Mime, L84"
    ///
    /// Species names may contain spaces, so fields are split on ", " only.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(", ");
        let species = parts.next()?.trim();
        if species.is_empty() {
            return None;
        }

        let mut details = PokemonDetails {
            species: species.to_string(),
            ..Default::default()
        };

        for part in parts {
            if let Some(level_str) = part.strip_prefix('L') {
                details.level = Some(level_str.parse().ok()?);
            } else if part == "M" {
                details.gender = Some('M');
            } else if part == "F" {
                details.gender = Some('F');
            } else if part == "shiny" {
                details.shiny = true;
            }
        }

        Some(details)
    }
}

/// HP and status condition (e.g., "100/100", "50/100 slp", "0 fnt")
#[derive(Debug, Clone, PartialEq)]
pub struct HpStatus {
    /// Current HP (absolute for our side, out of 100 for the opponent)
    pub current: u32,
    /// Denominator of `current`, absent for "0 fnt"
    pub max: Option<u32>,
    /// Status condition (slp, par, brn, psn, tox, frz, fnt)
    pub status: Option<String>,
}

impl HpStatus {
    /// Parse an HP status string like "100/100", "50/100 slp", or "0 fnt"
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split_whitespace();
        let hp_part = parts.next()?;
        let status = parts.next().map(|s| s.to_string());

        if let Some((current_str, max_str)) = hp_part.split_once('/') {
            Some(HpStatus {
                current: current_str.parse().ok()?,
                max: Some(max_str.parse().ok()?),
                status,
            })
        } else {
            Some(HpStatus {
                current: hp_part.parse().ok()?,
                max: None,
                status,
            })
        }
    }

    pub fn is_fainted(&self) -> bool {
        self.status.as_deref() == Some("fnt") || self.current == 0
    }

    /// HP as a percentage of `max` (0 when fainted or unknown)
    pub fn percent(&self) -> f64 {
        match self.max {
            Some(max) if max > 0 => f64::from(self.current) * 100.0 / f64::from(max),
            _ if self.current == 0 => 0.0,
            _ => f64::from(self.current.min(100)),
        }
    }
}

/// Stat abbreviation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stat {
    Atk,
    Def,
    Spa,
    Spd,
    Spe,
    Accuracy,
    Evasion,
}

impl Stat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "atk" => Some(Stat::Atk),
            "def" => Some(Stat::Def),
            "spa" => Some(Stat::Spa),
            "spd" => Some(Stat::Spd),
            "spe" => Some(Stat::Spe),
            "accuracy" => Some(Stat::Accuracy),
            "evasion" => Some(Stat::Evasion),
            _ => None,
        }
    }
}

/// Helper to parse a PokemonRef from message parts
pub(crate) fn parse_pokemon(parts: &[&str], index: usize) -> Result<PokemonRef, String> {
    let raw = parts
        .get(index)
        .ok_or_else(|| "missing pokemon".to_string())?;
    PokemonRef::parse(raw).ok_or_else(|| format!("invalid pokemon identifier '{}'", raw))
}

/// Helper to parse PokemonDetails from message parts
pub(crate) fn parse_details(parts: &[&str], index: usize) -> Result<PokemonDetails, String> {
    let raw = parts
        .get(index)
        .ok_or_else(|| "missing details".to_string())?;
    PokemonDetails::parse(raw).ok_or_else(|| format!("invalid details '{}'", raw))
}

/// Helper to parse a mandatory HpStatus from message parts
pub(crate) fn parse_hp_status(parts: &[&str], index: usize) -> Result<HpStatus, String> {
    let raw = parts
        .get(index)
        .ok_or_else(|| "missing hp status".to_string())?;
    HpStatus::parse(raw).ok_or_else(|| format!("invalid hp status '{}'", raw))
}
