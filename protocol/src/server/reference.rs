//! Reference-data grammar
//!
//! The server answers `/data NAME` with a one-entry "utilichart" HTML list.
//! The entry's `data-entry` attribute says whether it describes a move or a
//! pokemon; each kind is then validated field by field.

use std::sync::LazyLock;

use regex::Regex;

use super::FragmentKind;
use crate::ParseError;

/// Static facts about a move or species, as returned by a lookup
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceRecord {
    Move(MoveRecord),
    Species(SpeciesRecord),
}

impl ReferenceRecord {
    /// Canonical display name of the record
    pub fn name(&self) -> &str {
        match self {
            ReferenceRecord::Move(m) => &m.name,
            ReferenceRecord::Species(s) => &s.name,
        }
    }
}

/// Damage category of a move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveCategory {
    Physical,
    Special,
    Status,
}

impl MoveCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "physical" => Some(MoveCategory::Physical),
            "special" => Some(MoveCategory::Special),
            "status" => Some(MoveCategory::Status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveRecord {
    pub name: String,
    pub move_type: String,
    pub category: MoveCategory,
    /// None for status moves and moves with variable power
    pub base_power: Option<u32>,
    /// None for moves that never miss
    pub accuracy: Option<u32>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesRecord {
    pub name: String,
    /// One or two types
    pub types: Vec<String>,
    pub abilities: Vec<String>,
    pub base_stats: StatLine,
}

/// Six base stats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatLine {
    pub hp: u32,
    pub atk: u32,
    pub def: u32,
    pub spa: u32,
    pub spd: u32,
    pub spe: u32,
}

static ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-entry="(move|pokemon)\|([^"]+)""#).unwrap());
static TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"sprites/types/([A-Za-z?]+)\.png"#).unwrap());
static CATEGORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"sprites/categories/([A-Za-z]+)\.png"#).unwrap());
static POWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<em>Power</em><br\s*/?>\s*(\d+)"#).unwrap());
static ACCURACY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<em>Accuracy</em><br\s*/?>\s*(\d+)%"#).unwrap());
static DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class="col movedesccol">([^<]*)<"#).unwrap());
static ABILITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"class="col abilitycol">(?:<em>)?([^<]+)(?:</em>)?</span>"#).unwrap()
});
static STAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<em>(HP|Atk|Def|SpA|SpD|Spe)</em><br\s*/?>\s*(\d+)"#).unwrap()
});

/// Parse a lookup response into a move or species record
pub fn parse_reference_data(raw: &str) -> Result<ReferenceRecord, ParseError> {
    let kind = FragmentKind::ReferenceData;
    if raw.trim().is_empty() {
        return Err(ParseError::EmptyFragment(kind));
    }

    let Some(captures) = ENTRY.captures(raw) else {
        return Err(ParseError::Unparsed {
            raw: raw.to_string(),
        });
    };
    let name = decode_entities(&captures[2]);

    let record = match &captures[1] {
        "move" => parse_move(name, raw).map(ReferenceRecord::Move),
        _ => parse_species(name, raw).map(ReferenceRecord::Species),
    };

    record.map_err(|reason| ParseError::malformed(kind, reason, raw))
}

fn parse_move(name: String, raw: &str) -> Result<MoveRecord, String> {
    let types = captured(&TYPE, raw);
    let move_type = match types.as_slice() {
        [single] => single.clone(),
        [] => return Err(format!("move {} has no type", name)),
        _ => return Err(format!("move {} has {} types", name, types.len())),
    };

    let category = CATEGORY
        .captures(raw)
        .and_then(|c| MoveCategory::parse(c.get(1)?.as_str()))
        .ok_or_else(|| format!("move {} has no category", name))?;

    let base_power = first_number(&POWER, raw)?;
    let accuracy = first_number(&ACCURACY, raw)?;
    let description = DESCRIPTION
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .unwrap_or_default();

    Ok(MoveRecord {
        name,
        move_type,
        category,
        base_power: base_power.filter(|_| category != MoveCategory::Status),
        accuracy,
        description,
    })
}

fn parse_species(name: String, raw: &str) -> Result<SpeciesRecord, String> {
    let types = captured(&TYPE, raw);
    if types.is_empty() || types.len() > 2 {
        return Err(format!("species {} has {} types", name, types.len()));
    }

    let abilities = ABILITY
        .captures_iter(raw)
        .filter_map(|c| c.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|a| !a.is_empty())
        .collect();

    let mut stats = StatLine::default();
    let mut seen = 0u8;
    for captures in STAT.captures_iter(raw) {
        let value: u32 = captures[2]
            .parse()
            .map_err(|_| format!("species {} has a non-numeric stat", name))?;
        let (slot, bit) = match &captures[1] {
            "HP" => (&mut stats.hp, 0),
            "Atk" => (&mut stats.atk, 1),
            "Def" => (&mut stats.def, 2),
            "SpA" => (&mut stats.spa, 3),
            "SpD" => (&mut stats.spd, 4),
            _ => (&mut stats.spe, 5),
        };
        *slot = value;
        seen |= 1 << bit;
    }
    if seen != 0b11_1111 {
        return Err(format!("species {} is missing base stats", name));
    }

    Ok(SpeciesRecord {
        name,
        types,
        abilities,
        base_stats: stats,
    })
}

fn captured(re: &Regex, raw: &str) -> Vec<String> {
    re.captures_iter(raw)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn first_number(re: &Regex, raw: &str) -> Result<Option<u32>, String> {
    match re.captures(raw).and_then(|c| c.get(1)) {
        Some(m) => m
            .as_str()
            .parse()
            .map(Some)
            .map_err(|_| format!("'{}' is not a number", m.as_str())),
        None => Ok(None),
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
