//! Move/switch selection from damage and threat estimates

mod damage;
mod engine;

use serde::Deserialize;

pub use damage::{STAB, damage_calc, modifier, select_move, speed_tie, threat};
pub use engine::{Action, Decision, DecisionEngine, DecisionReason, Estimate, TurnContext};

/// Percentage thresholds for committing to a move or switching
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Damage that counts as a knockout
    pub ko_damage: u32,
    /// Threat below which trading hits is acceptable
    pub survivable_threat: u32,
    /// Damage worth committing to when the threat is low
    pub chip_damage: u32,
    /// Threat considered low
    pub low_threat: u32,
    /// Threat considered negligible for a switch-in
    pub negligible_threat: u32,
    /// A switch-in with negligible threat must out-damage it by this factor
    pub damage_to_threat_ratio: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ko_damage: 100,
            survivable_threat: 90,
            chip_damage: 50,
            low_threat: 45,
            negligible_threat: 25,
            damage_to_threat_ratio: 2,
        }
    }
}

impl EngineConfig {
    /// Whether the active pokemon should attack
    pub fn should_commit(&self, estimate: &Estimate) -> bool {
        let Estimate {
            damage,
            threat,
            outspeeds,
            ..
        } = *estimate;

        (damage >= self.ko_damage && outspeeds)
            || (damage >= threat && outspeeds)
            || (damage >= self.ko_damage && threat < self.survivable_threat)
            || (damage >= self.chip_damage && threat < self.low_threat)
    }

    /// Whether a bench pokemon is a good switch-in
    pub fn is_good_switch(&self, estimate: &Estimate) -> bool {
        let Estimate {
            damage,
            threat,
            outspeeds,
            ..
        } = *estimate;

        (outspeeds && damage >= self.ko_damage && threat < self.survivable_threat)
            || (threat < self.negligible_threat && damage > self.damage_to_threat_ratio * threat)
            || (damage >= self.ko_damage && threat < self.low_threat)
    }
}
