//! Damage estimates
//!
//! All estimates are deterministic: the random roll is fixed at its maximum,
//! so identical inputs always give identical percentages.

use std::sync::Arc;

use tactician_protocol::MoveCategory;

use crate::sync::ReferenceRegistry;
use crate::types::{MoveData, Pokemon, TypeChart};

/// Same-type attack bonus
pub const STAB: f64 = 1.5;

/// Damage multiplier from types alone: STAB times type effectiveness
pub fn modifier(chart: &TypeChart, attacker: &Pokemon, defender: &Pokemon, mv: &MoveData) -> f64 {
    let Some(move_type) = mv.move_type else {
        return 1.0;
    };
    let stab = if attacker.has_type(move_type) { STAB } else { 1.0 };
    stab * f64::from(chart.type_multiplier(move_type, defender.types()))
}

/// Estimated damage of `mv` as a whole percentage of the defender's
/// remaining HP. Status moves and moves without a fixed power score 0.
pub fn damage_calc(chart: &TypeChart, attacker: &Pokemon, defender: &Pokemon, mv: &MoveData) -> u32 {
    let (attack, defense) = match mv.category {
        MoveCategory::Physical => (attacker.stats.atk, defender.stats.def),
        MoveCategory::Special => (attacker.stats.spa, defender.stats.spd),
        MoveCategory::Status => return 0,
    };
    let Some(power) = mv.base_power.filter(|p| *p > 0) else {
        return 0;
    };

    let remaining_hp = f64::from(defender.stats.hp) * defender.hp_percent() / 100.0;
    if remaining_hp <= 0.0 {
        return 0;
    }

    let level = f64::from(attacker.level);
    let base = ((level * 0.4 + 2.0) * f64::from(attack) * f64::from(power))
        / (f64::from(defense.max(1)) * 50.0);
    let damage = ((base.trunc() + 2.0) * modifier(chart, attacker, defender, mv)).trunc();

    (damage / remaining_hp * 100.0) as u32
}

/// The attacker's best castable move against the defender.
///
/// Returns the 1-based slot, the move and its estimate. Only moves scoring
/// above 0 qualify; on ties the earlier slot wins. Moves missing from the
/// registry are skipped.
pub fn select_move(
    chart: &TypeChart,
    registry: &ReferenceRegistry,
    attacker: &Pokemon,
    defender: &Pokemon,
) -> Option<(usize, Arc<MoveData>, u32)> {
    let mut best: Option<(usize, Arc<MoveData>, u32)> = None;
    let mut max_damage = 0;

    for (slot, move_slot) in attacker.castable_moves() {
        let Some(data) = registry.get_move(&move_slot.id) else {
            continue;
        };
        let damage = damage_calc(chart, attacker, defender, data);
        if damage > max_damage {
            max_damage = damage;
            best = Some((slot, Arc::clone(data), damage));
        }
    }

    best
}

/// Whether `pokemon` moves first (ties go to `pokemon`)
pub fn speed_tie(pokemon: &Pokemon, opponent: &Pokemon) -> bool {
    pokemon.stats.spe >= opponent.stats.spe
}

/// Worst case damage the opponent could deal to `pokemon`: for each of the
/// opponent's types, a physical and a special 100 power probe
pub fn threat(chart: &TypeChart, pokemon: &Pokemon, opponent: &Pokemon) -> u32 {
    opponent
        .types()
        .iter()
        .flat_map(|t| {
            [MoveCategory::Physical, MoveCategory::Special]
                .map(|category| MoveData::probe(*t, category))
        })
        .map(|probe| damage_calc(chart, opponent, pokemon, &probe))
        .max()
        .unwrap_or(0)
}
