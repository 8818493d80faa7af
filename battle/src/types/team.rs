//! One player's roster and stage buffs

use std::sync::Arc;

use tactician_protocol::{PokemonDetails, Player};

use super::pokemon::{Pokemon, SpeciesData};
use super::stats::SideBuffs;

/// Maximum roster size
pub const MAX_TEAM_SIZE: usize = 6;

/// One player's side of the battle
#[derive(Debug, Clone, Default)]
pub struct Team {
    /// Side tag, once known
    pub player: Option<Player>,

    /// Pokemon in reveal order (never removed)
    members: Vec<Pokemon>,

    pub buffs: SideBuffs,
}

impl Team {
    pub fn new(player: Option<Player>) -> Self {
        Self {
            player,
            members: Vec::new(),
            buffs: SideBuffs::new(),
        }
    }

    pub fn members(&self) -> &[Pokemon] {
        &self.members
    }

    pub fn members_mut(&mut self) -> impl Iterator<Item = &mut Pokemon> {
        self.members.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= MAX_TEAM_SIZE
    }

    /// Find a pokemon by battle name or species
    pub fn find(&self, name: &str) -> Option<&Pokemon> {
        self.position(name).map(|i| &self.members[i])
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Pokemon> {
        self.position(name).map(|i| &mut self.members[i])
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.members
            .iter()
            .position(|p| p.name == name)
            .or_else(|| self.members.iter().position(|p| p.species == name))
    }

    /// Add a pokemon, keeping reveal order. Returns `None` when the roster is
    /// full; an existing member with the same name is returned unchanged.
    pub fn reveal(&mut self, pokemon: Pokemon) -> Option<&mut Pokemon> {
        if let Some(index) = self.members.iter().position(|p| p.name == pokemon.name) {
            return Some(&mut self.members[index]);
        }
        if self.is_full() {
            return None;
        }
        self.members.push(pokemon);
        self.members.last_mut()
    }

    /// Find a pokemon, revealing it from switch-in details if new
    pub fn find_or_reveal(&mut self, name: &str, details: &PokemonDetails) -> Option<&mut Pokemon> {
        match self.position(name) {
            Some(index) => Some(&mut self.members[index]),
            None => self.reveal(Pokemon::new(name, details)),
        }
    }

    pub fn active(&self) -> Option<&Pokemon> {
        self.members.iter().find(|p| p.active)
    }

    pub fn active_mut(&mut self) -> Option<&mut Pokemon> {
        self.members.iter_mut().find(|p| p.active)
    }

    /// Make `name` the only active member and reset the side's buffs.
    /// Returns false if no member has that name.
    pub fn set_active(&mut self, name: &str) -> bool {
        let Some(index) = self.position(name) else {
            return false;
        };
        for (i, pokemon) in self.members.iter_mut().enumerate() {
            if i == index {
                pokemon.active = true;
            } else if pokemon.active {
                pokemon.on_switch_out();
            }
        }
        self.buffs.reset();
        true
    }

    /// Mark a member fainted and reset the side's buffs
    pub fn faint(&mut self, name: &str) -> bool {
        let Some(pokemon) = self.find_mut(name) else {
            return false;
        };
        pokemon.faint();
        self.buffs.reset();
        true
    }

    /// Members that could be switched in, in roster order
    pub fn switch_candidates(&self) -> impl Iterator<Item = &Pokemon> {
        self.members.iter().filter(|p| p.can_switch_to())
    }

    /// Attach species data to every member of that species. Returns how many
    /// members were updated.
    pub fn apply_species(&mut self, data: &Arc<SpeciesData>, derive_stats: bool) -> usize {
        let mut updated = 0;
        for pokemon in self.members.iter_mut().filter(|p| p.species_id() == data.id) {
            pokemon.resolve_species(Arc::clone(data), derive_stats);
            updated += 1;
        }
        updated
    }

    pub fn alive_count(&self) -> usize {
        self.members.iter().filter(|p| p.is_alive()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;
    use tactician_protocol::{HpStatus, Stat, StatLine};

    fn details(species: &str) -> PokemonDetails {
        PokemonDetails {
            species: species.to_string(),
            level: Some(80),
            ..Default::default()
        }
    }

    fn create_test_team(names: &[&str]) -> Team {
        let mut team = Team::new(Some(Player::P2));
        for name in names {
            team.reveal(Pokemon::new(*name, &details(name)));
        }
        team
    }

    #[test]
    fn test_roster_never_exceeds_six() {
        let mut team = Team::new(None);
        for i in 0..10 {
            let name = format!("Mon{}", i);
            let revealed = team.find_or_reveal(&name, &details(&name)).is_some();
            assert_eq!(revealed, i < MAX_TEAM_SIZE);
            assert!(team.len() <= MAX_TEAM_SIZE);
        }
        assert!(team.is_full());
    }

    #[test]
    fn test_reveal_is_idempotent() {
        let mut team = create_test_team(&["Venusaur"]);
        team.find_or_reveal("Venusaur", &details("Venusaur"));
        assert_eq!(team.len(), 1);
    }

    #[test]
    fn test_at_most_one_active() {
        let mut team = create_test_team(&["Venusaur", "Starmie", "Snorlax"]);
        for name in ["Venusaur", "Starmie", "Snorlax", "Starmie"] {
            assert!(team.set_active(name));
            assert_eq!(team.members().iter().filter(|p| p.active).count(), 1);
            assert_eq!(team.active().map(|p| p.name.as_str()), Some(name));
        }
        assert!(!team.set_active("Mew"));
    }

    #[test]
    fn test_switch_and_faint_reset_buffs() {
        let mut team = create_test_team(&["Venusaur", "Starmie"]);
        team.set_active("Venusaur");
        team.buffs.raise(Stat::Spa, 2);
        team.buffs.raise(Stat::Spe, 1);

        team.set_active("Starmie");
        assert!(team.buffs.is_neutral());

        team.buffs.lower(Stat::Def, 1);
        team.faint("Starmie");
        assert!(team.buffs.is_neutral());
        assert_eq!(team.alive_count(), 1);
    }

    #[test]
    fn test_switch_candidates() {
        let mut team = create_test_team(&["Venusaur", "Starmie", "Snorlax"]);
        team.set_active("Venusaur");
        team.find_mut("Snorlax")
            .unwrap()
            .apply_hp(&HpStatus::parse("0 fnt").unwrap());

        let names: Vec<&str> = team.switch_candidates().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Starmie"]);
    }

    #[test]
    fn test_apply_species_matches_formes() {
        let mut team = create_test_team(&["Eiscue-Noice", "Starmie"]);
        let data = Arc::new(SpeciesData {
            id: "eiscue".into(),
            name: "Eiscue".into(),
            types: vec![Type::Ice],
            abilities: vec!["Ice Face".into()],
            base_stats: StatLine {
                hp: 75,
                atk: 80,
                def: 110,
                spa: 65,
                spd: 90,
                spe: 50,
            },
        });

        assert_eq!(team.apply_species(&data, true), 1);
        assert!(team.find("Eiscue-Noice").unwrap().is_species_resolved());
        assert!(!team.find("Starmie").unwrap().is_species_resolved());
    }
}
