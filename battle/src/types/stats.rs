//! Side stage buffs and live battle stats

use tactician_protocol::{PokemonStats, Stat, StatLine};

/// Stage counters for one side, reset whenever a member switches or faints.
///
/// Stages are not clamped: the model keeps the raw running sum of every
/// boost and unboost seen while the side's active pokemon stayed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideBuffs {
    pub atk: i32,
    pub def: i32,
    pub spa: i32,
    pub spd: i32,
    pub spe: i32,
}

impl SideBuffs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stat: Stat) -> Option<i32> {
        match stat {
            Stat::Atk => Some(self.atk),
            Stat::Def => Some(self.def),
            Stat::Spa => Some(self.spa),
            Stat::Spd => Some(self.spd),
            Stat::Spe => Some(self.spe),
            Stat::Accuracy | Stat::Evasion => None,
        }
    }

    /// Apply a signed delta. Accuracy and evasion are not tracked; returns
    /// whether the stat is one of the five counters.
    pub fn apply(&mut self, stat: Stat, delta: i32) -> bool {
        let counter = match stat {
            Stat::Atk => &mut self.atk,
            Stat::Def => &mut self.def,
            Stat::Spa => &mut self.spa,
            Stat::Spd => &mut self.spd,
            Stat::Spe => &mut self.spe,
            Stat::Accuracy | Stat::Evasion => return false,
        };
        *counter += delta;
        true
    }

    pub fn raise(&mut self, stat: Stat, amount: i32) -> bool {
        self.apply(stat, amount)
    }

    pub fn lower(&mut self, stat: Stat, amount: i32) -> bool {
        self.apply(stat, -amount)
    }

    /// Reset all five counters to 0
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}

/// Live stats of a combatant.
///
/// `hp` is the maximum HP in absolute points. For our own pokemon these come
/// from the request and already include level scaling; for the opponent they
/// are derived from base stats once those are known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BattleStats {
    pub hp: u32,
    pub atk: u32,
    pub def: u32,
    pub spa: u32,
    pub spd: u32,
    pub spe: u32,
}

impl BattleStats {
    /// Own-side stats from a request entry and its absolute max HP
    pub fn from_request(stats: PokemonStats, max_hp: u32) -> Self {
        Self {
            hp: max_hp,
            atk: stats.atk,
            def: stats.def,
            spa: stats.spa,
            spd: stats.spd,
            spe: stats.spe,
        }
    }

    /// Estimate stats from base stats, assuming 31 IVs and no EVs
    pub fn derive(base: &StatLine, level: u8) -> Self {
        Self {
            hp: derive_stat(base.hp, level, HP_OFFSET),
            atk: derive_stat(base.atk, level, STAT_OFFSET),
            def: derive_stat(base.def, level, STAT_OFFSET),
            spa: derive_stat(base.spa, level, STAT_OFFSET),
            spd: derive_stat(base.spd, level, STAT_OFFSET),
            spe: derive_stat(base.spe, level, STAT_OFFSET),
        }
    }

    /// Whether any attacking or defending stat is known
    pub fn is_known(&self) -> bool {
        *self != Self::default()
    }
}

const HP_OFFSET: u32 = 10;
const STAT_OFFSET: u32 = 5;

/// `floor(((2 * base + 31) * level) / 100 + offset) + 17`
pub fn derive_stat(base: u32, level: u8, offset: u32) -> u32 {
    (2 * base + 31) * u32::from(level) / 100 + offset + 17
}
