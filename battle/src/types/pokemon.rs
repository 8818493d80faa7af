//! Combatant state

use std::sync::Arc;

use tactician_protocol::{HpStatus, PokemonDetails, RevealedPokemon, SpeciesRecord, StatLine, to_id};

use super::moves::MoveSlot;
use super::pokemon_type::Type;
use super::stats::BattleStats;

/// Maximum number of move slots per pokemon
pub const MAX_MOVES: usize = 4;

/// Battle-only formes the lookup service does not know, and the species
/// whose data they share
const FORME_ALIASES: &[(&str, &str)] = &[("eiscuenoice", "eiscue"), ("mimikyubusted", "mimikyu")];

/// Registry key for a species name
pub fn species_id(species: &str) -> String {
    let id = to_id(species);
    FORME_ALIASES
        .iter()
        .find(|(forme, _)| *forme == id)
        .map(|(_, base)| base.to_string())
        .unwrap_or(id)
}

/// Static species facts from a reference lookup
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesData {
    pub id: String,
    pub name: String,
    pub types: Vec<Type>,
    pub abilities: Vec<String>,
    pub base_stats: StatLine,
}

impl SpeciesData {
    pub fn from_record(record: &SpeciesRecord) -> Self {
        Self {
            id: species_id(&record.name),
            name: record.name.clone(),
            types: record
                .types
                .iter()
                .filter_map(|t| Type::from_protocol(t))
                .collect(),
            abilities: record.abilities.clone(),
            base_stats: record.base_stats,
        }
    }
}

/// A pokemon on either side of the battle
#[derive(Debug, Clone)]
pub struct Pokemon {
    /// Name used in battle events (nickname or species)
    pub name: String,
    pub species: String,
    pub level: u8,
    pub gender: Option<char>,

    /// Current HP: absolute for our pokemon, out of 100 for the opponent's
    pub hp: u32,
    /// Denominator of `hp`
    pub hp_scale: u32,
    pub status: Option<String>,
    pub fainted: bool,
    pub active: bool,

    pub stats: BattleStats,
    pub ability: Option<String>,
    pub base_ability: Option<String>,
    pub item: Option<String>,
    pub moves: Vec<MoveSlot>,

    /// Resolved species data, once the lookup has been answered
    pub species_data: Option<Arc<SpeciesData>>,
}

impl Pokemon {
    pub fn new(name: impl Into<String>, details: &PokemonDetails) -> Self {
        Self {
            name: name.into(),
            species: details.species.clone(),
            level: details.level.unwrap_or(100),
            gender: details.gender,
            hp: 100,
            hp_scale: 100,
            status: None,
            fainted: false,
            active: false,
            stats: BattleStats::default(),
            ability: None,
            base_ability: None,
            item: None,
            moves: Vec::new(),
            species_data: None,
        }
    }

    /// Build one of our own pokemon from a request entry
    pub fn from_request(entry: &RevealedPokemon) -> Self {
        let mut pokemon = Self::new(&entry.name, &entry.details);
        pokemon.update_from_request(entry);
        pokemon
    }

    /// Refresh everything a request reveals about our own pokemon
    pub fn update_from_request(&mut self, entry: &RevealedPokemon) {
        self.species = entry.details.species.clone();
        self.level = entry.details.level.unwrap_or(100);
        self.gender = entry.details.gender;
        self.apply_hp(&entry.condition);
        self.active = entry.active;

        let max_hp = entry.condition.max.unwrap_or(self.stats.hp);
        self.stats = BattleStats::from_request(entry.stats, max_hp);

        self.ability = non_empty(&entry.ability);
        self.base_ability = non_empty(&entry.base_ability);
        self.item = non_empty(&entry.item);
        self.moves = entry.moves.iter().take(MAX_MOVES).map(MoveSlot::from).collect();
    }

    /// Registry key of this pokemon's species
    pub fn species_id(&self) -> String {
        species_id(&self.species)
    }

    /// Apply an HP/status update from the feed
    pub fn apply_hp(&mut self, hp: &HpStatus) {
        self.hp = hp.current;
        if let Some(max) = hp.max.filter(|m| *m > 0) {
            self.hp_scale = max;
        }

        match hp.status.as_deref() {
            Some("fnt") => {
                self.fainted = true;
                self.status = None;
            }
            Some(status) => {
                self.fainted = false;
                self.status = Some(status.to_string());
            }
            None => {
                self.fainted = hp.current == 0;
                self.status = None;
            }
        }
        if self.fainted {
            self.hp = 0;
        }
    }

    pub fn faint(&mut self) {
        self.hp = 0;
        self.fainted = true;
        self.status = None;
    }

    /// HP as a percentage (0-100) whatever scale the feed used
    pub fn hp_percent(&self) -> f64 {
        if self.fainted || self.hp_scale == 0 {
            return 0.0;
        }
        f64::from(self.hp) * 100.0 / f64::from(self.hp_scale)
    }

    pub fn is_alive(&self) -> bool {
        !self.fainted && self.hp > 0
    }

    /// Whether this pokemon can be switched in
    pub fn can_switch_to(&self) -> bool {
        self.is_alive() && !self.active
    }

    /// Types from the resolved species data (empty until resolved)
    pub fn types(&self) -> &[Type] {
        self.species_data
            .as_deref()
            .map(|s| s.types.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_type(&self, t: Type) -> bool {
        self.types().contains(&t)
    }

    /// Possible abilities from the resolved species data
    pub fn possible_abilities(&self) -> &[String] {
        self.species_data
            .as_deref()
            .map(|s| s.abilities.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_species_resolved(&self) -> bool {
        self.species_data.is_some()
    }

    /// Attach resolved species data. With `derive_stats`, live stats are
    /// replaced by estimates from the base stats (used for the opponent).
    pub fn resolve_species(&mut self, data: Arc<SpeciesData>, derive_stats: bool) {
        if derive_stats {
            self.stats = BattleStats::derive(&data.base_stats, self.level);
        }
        self.species_data = Some(data);
    }

    /// Add a move seen in battle, up to four
    pub fn record_move(&mut self, move_name: &str) -> Option<&MoveSlot> {
        let slot = MoveSlot::revealed(move_name);
        if let Some(index) = self.moves.iter().position(|m| m.id == slot.id) {
            return self.moves.get(index);
        }
        if self.moves.len() >= MAX_MOVES {
            return None;
        }
        self.moves.push(slot);
        self.moves.last()
    }

    /// Move slots that can be chosen right now, with their 1-based slot
    pub fn castable_moves(&self) -> impl Iterator<Item = (usize, &MoveSlot)> {
        self.moves
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_castable())
            .map(|(i, m)| (i + 1, m))
    }

    /// Called when this pokemon leaves the field
    pub fn on_switch_out(&mut self) {
        self.active = false;
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
