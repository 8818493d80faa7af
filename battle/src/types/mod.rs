//! Domain types for battle state tracking

mod moves;
mod pokemon;
mod pokemon_type;
mod stats;
mod team;

pub use moves::{MoveData, MoveSlot};
pub use pokemon::{MAX_MOVES, Pokemon, SpeciesData, species_id};
pub use pokemon_type::{STANDARD_CHART, Type, TypeChart, TypeChartError};
pub use stats::{BattleStats, SideBuffs, derive_stat};
pub use team::{MAX_TEAM_SIZE, Team};
