use std::fmt;
use std::sync::Arc;

use super::EngineConfig;
use super::damage::{select_move, speed_tie, threat};
use crate::error::BattleError;
use crate::sync::ReferenceRegistry;
use crate::types::{MoveData, Pokemon, Team, TypeChart};

/// The action chosen for a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Use the move in 1-based `slot` of the active pokemon
    UseMove { name: String, slot: usize },
    /// Switch to the named bench pokemon
    SwitchTo { name: String },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::UseMove { name, slot } => write!(f, "move {} (slot {})", name, slot),
            Action::SwitchTo { name } => write!(f, "switch to {}", name),
        }
    }
}

/// Which branch of the heuristic produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// The active pokemon's best move passed the commit rules
    Commit,
    /// A bench pokemon passed the switch rules
    Matchup,
    /// Nothing passed; first castable move or first eligible switch
    Fallback,
    /// Reference data did not converge in time; fallback action
    SyncTimeout,
}

/// Estimated figures for one pokemon facing the opponent's active pokemon
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    /// Best move: 1-based slot and its data
    pub best_move: Option<(usize, Arc<MoveData>)>,
    /// Best move's damage, % of the opponent's remaining HP
    pub damage: u32,
    /// Opponent's worst case damage, % of our remaining HP
    pub threat: u32,
    /// Whether we move first
    pub outspeeds: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    pub reason: DecisionReason,
    /// Figures behind a `Commit` or `Matchup` decision
    pub estimate: Option<Estimate>,
}

/// Flags from the latest request that restrict the choice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnContext {
    /// Only a switch is allowed
    pub force_switch: bool,
    /// The active pokemon cannot switch out
    pub trapped: bool,
}

/// Scores moves and switch-ins and picks one action per turn
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: EngineConfig,
    chart: Arc<TypeChart>,
}

impl DecisionEngine {
    pub fn new(config: EngineConfig, chart: Arc<TypeChart>) -> Self {
        Self { config, chart }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Damage, threat and speed for `pokemon` against `opponent`
    pub fn estimate(&self, registry: &ReferenceRegistry, pokemon: &Pokemon, opponent: &Pokemon) -> Estimate {
        let best = select_move(&self.chart, registry, pokemon, opponent);
        let damage = best.as_ref().map_or(0, |(_, _, damage)| *damage);

        Estimate {
            best_move: best.map(|(slot, data, _)| (slot, data)),
            damage,
            threat: threat(&self.chart, pokemon, opponent),
            outspeeds: speed_tie(pokemon, opponent),
        }
    }

    /// Choose this turn's action.
    ///
    /// Every pokemon the heuristic looks at must have its reference data
    /// resolved; otherwise `UnresolvedReference` is returned.
    pub fn decide(
        &self,
        registry: &ReferenceRegistry,
        own: &Team,
        opponent: &Team,
        context: TurnContext,
    ) -> Result<Decision, BattleError> {
        let active = own.active().filter(|p| p.is_alive());
        let target = opponent.active().filter(|p| p.is_alive());

        let must_switch = context.force_switch || active.is_none();
        let can_switch = must_switch || !context.trapped;

        if let Some(target) = target {
            require_species(target)?;

            if !must_switch && let Some(active) = active {
                require_resolved(active, registry)?;
                let estimate = self.estimate(registry, active, target);
                tracing::debug!(
                    pokemon = %active.name,
                    opponent = %target.name,
                    damage = estimate.damage,
                    threat = estimate.threat,
                    outspeeds = estimate.outspeeds,
                    "Estimated active matchup"
                );

                if let Some((slot, data)) = &estimate.best_move
                    && self.config.should_commit(&estimate)
                {
                    let action = Action::UseMove {
                        name: data.name.clone(),
                        slot: *slot,
                    };
                    return Ok(Decision {
                        action,
                        reason: DecisionReason::Commit,
                        estimate: Some(estimate),
                    });
                }
            }

            if can_switch {
                for candidate in own.switch_candidates() {
                    require_resolved(candidate, registry)?;
                    let estimate = self.estimate(registry, candidate, target);
                    if self.config.is_good_switch(&estimate) {
                        return Ok(Decision {
                            action: Action::SwitchTo {
                                name: candidate.name.clone(),
                            },
                            reason: DecisionReason::Matchup,
                            estimate: Some(estimate),
                        });
                    }
                }
            }
        }

        self.fallback(own, context).map(|action| Decision {
            action,
            reason: DecisionReason::Fallback,
            estimate: None,
        })
    }

    /// First castable move of the active pokemon, else the first eligible
    /// switch. Needs no reference data.
    pub fn fallback(&self, own: &Team, context: TurnContext) -> Result<Action, BattleError> {
        let active = own.active().filter(|p| p.is_alive());
        let must_switch = context.force_switch || active.is_none();

        if !must_switch
            && let Some((slot, mv)) = active.and_then(|p| p.castable_moves().next())
        {
            return Ok(Action::UseMove {
                name: mv.name.clone(),
                slot,
            });
        }

        if must_switch || !context.trapped {
            if let Some(candidate) = own.switch_candidates().next() {
                return Ok(Action::SwitchTo {
                    name: candidate.name.clone(),
                });
            }
        }

        Err(BattleError::NoLegalAction)
    }
}

fn require_species(pokemon: &Pokemon) -> Result<(), BattleError> {
    if pokemon.is_species_resolved() {
        Ok(())
    } else {
        Err(BattleError::UnresolvedReference {
            name: pokemon.species.clone(),
        })
    }
}

fn require_resolved(pokemon: &Pokemon, registry: &ReferenceRegistry) -> Result<(), BattleError> {
    require_species(pokemon)?;
    match pokemon.moves.iter().find(|m| !registry.has_move(&m.id)) {
        Some(missing) => Err(BattleError::UnresolvedReference {
            name: missing.name.clone(),
        }),
        None => Ok(()),
    }
}
