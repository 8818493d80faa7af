//! Battle tracking and move selection for Pokemon Showdown random battles.
//!
//! # Overview
//!
//! `tactician-battle` sits on top of `tactician-protocol` (fragment decoding):
//!
//! ```text
//! tactician-protocol (frames, fragments, reference records)
//!        │
//!        ▼
//! tactician-battle ← THIS CRATE
//!        ├─ types      teams, pokemon, moves, the type chart
//!        ├─ sync       /data lookups and the reference registry
//!        ├─ decision   damage estimates and the commit/switch heuristic
//!        └─ controller per-room orchestration
//! ```
//!
//! # Main Types
//!
//! - [`BattleController`] - Applies fragments for one room and submits a choice each turn
//! - [`Synchronizer`] - Requests reference data and detects stalled lookups
//! - [`DecisionEngine`] - Picks a move or switch from damage and threat estimates
//! - [`Team`], [`Pokemon`] - Tracked state of each side
//!
//! # Example Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tactician_battle::{BattleController, ControllerConfig, TypeChart};
//!
//! let (tx, _outbound) = tokio::sync::mpsc::unbounded_channel();
//! let mut battle = BattleController::on_room_init(
//!     ControllerConfig::new("battle-gen7randombattle-1"),
//!     Arc::new(TypeChart::standard()),
//!     tx,
//! );
//!
//! // Feed every frame for the room
//! battle.on_frame(&frame)?;
//!
//! // Once a request asks for a choice
//! let decision = battle.decide_and_act(&mut inbound).await?;
//! println!("{} ({:?})", decision.action, decision.reason);
//! ```

pub mod controller;
pub mod decision;
pub mod error;
pub mod sync;
pub mod types;

pub use controller::{BattleController, CommandSink, ControllerConfig, Outcome};
pub use decision::{Action, Decision, DecisionEngine, DecisionReason, EngineConfig, Estimate, TurnContext};
pub use error::BattleError;
pub use sync::{ReferenceRegistry, SyncPolicy, Synchronizer};
pub use types::{MoveData, Pokemon, SpeciesData, Team, Type, TypeChart};

// Re-export commonly used protocol types
pub use tactician_protocol::{Player, RoomFragment, Stat};
