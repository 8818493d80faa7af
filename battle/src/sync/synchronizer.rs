use std::collections::BTreeSet;
use std::sync::Arc;

use tactician_protocol::{ClientCommand, ReferenceRecord, normalize_move_id};

use super::{ReferenceRegistry, SyncPolicy};
use crate::types::{MoveData, SpeciesData, Team, species_id};

/// What a lookup is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Move,
    Species,
}

/// A record that has been merged into the registry
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Move(Arc<MoveData>),
    Species(Arc<SpeciesData>),
}

/// Requested and resolved IDs for one lookup kind
#[derive(Debug, Default)]
struct NameSets {
    requested: BTreeSet<String>,
    resolved: BTreeSet<String>,
}

impl NameSets {
    fn missing(&self) -> impl Iterator<Item = &String> {
        self.requested.difference(&self.resolved)
    }
}

/// Tracks lookups and merges their answers.
///
/// IDs are the registry keys: normalized move IDs and species IDs with
/// battle-only formes folded into their base species.
#[derive(Debug)]
pub struct Synchronizer {
    policy: SyncPolicy,
    registry: ReferenceRegistry,
    moves: NameSets,
    species: NameSets,

    last_counts: Option<(usize, usize)>,
    unchanged_polls: u32,
    resends: u32,
}

impl Synchronizer {
    pub fn new(policy: SyncPolicy) -> Self {
        Self {
            policy,
            registry: ReferenceRegistry::new(),
            moves: NameSets::default(),
            species: NameSets::default(),
            last_counts: None,
            unchanged_polls: 0,
            resends: 0,
        }
    }

    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }

    fn sets_mut(&mut self, kind: LookupKind) -> &mut NameSets {
        match kind {
            LookupKind::Move => &mut self.moves,
            LookupKind::Species => &mut self.species,
        }
    }

    /// Mark `name` as requested and return the lookup to send, unless it was
    /// already requested or is already resolved
    pub fn request_if_unknown(&mut self, kind: LookupKind, name: &str) -> Option<ClientCommand> {
        let id = match kind {
            LookupKind::Move => normalize_move_id(name),
            LookupKind::Species => species_id(name),
        };
        if id.is_empty() {
            return None;
        }

        let known = match kind {
            LookupKind::Move => self.registry.has_move(&id),
            LookupKind::Species => self.registry.has_species(&id),
        };
        let sets = self.sets_mut(kind);
        if known || !sets.requested.insert(id.clone()) {
            return None;
        }

        tracing::debug!(kind = ?kind, name = %name, id = %id, "Requesting reference data");
        Some(ClientCommand::Data(id))
    }

    /// Merge a lookup answer. Answers for names nobody asked about are kept
    /// too; repeated answers leave the first record in place.
    pub fn mark_resolved(&mut self, record: &ReferenceRecord) -> Resolved {
        let resolved = match record {
            ReferenceRecord::Move(m) => Resolved::Move(self.registry.insert_move(MoveData::from_record(m))),
            ReferenceRecord::Species(s) => {
                Resolved::Species(self.registry.insert_species(SpeciesData::from_record(s)))
            }
        };

        let (kind, id) = match &resolved {
            Resolved::Move(m) => (LookupKind::Move, m.id.clone()),
            Resolved::Species(s) => (LookupKind::Species, s.id.clone()),
        };
        let sets = self.sets_mut(kind);
        if !sets.requested.contains(&id) {
            tracing::debug!(kind = ?kind, id = %id, "Received unrequested reference data");
        }
        sets.resolved.insert(id);

        resolved
    }

    /// IDs requested but not yet answered, moves first
    pub fn pending(&self) -> Vec<String> {
        self.moves
            .missing()
            .chain(self.species.missing())
            .cloned()
            .collect()
    }

    /// (requested, resolved) counts over both kinds
    pub fn counts(&self) -> (usize, usize) {
        (
            self.moves.requested.len() + self.species.requested.len(),
            self.moves.resolved.len() + self.species.resolved.len(),
        )
    }

    /// Start a fresh convergence wait
    pub fn begin_wait(&mut self) {
        self.last_counts = None;
        self.unchanged_polls = 0;
        self.resends = 0;
    }

    /// One convergence poll while unconverged. When the counts have not moved
    /// for `stall_polls` consecutive polls, returns lookups for every missing
    /// name (at most `max_resends` times per wait).
    pub fn poll(&mut self) -> Vec<ClientCommand> {
        let counts = self.counts();
        if self.last_counts == Some(counts) {
            self.unchanged_polls += 1;
        } else {
            self.last_counts = Some(counts);
            self.unchanged_polls = 0;
        }

        if self.unchanged_polls < self.policy.stall_polls {
            return Vec::new();
        }
        self.unchanged_polls = 0;

        let pending = self.pending();
        if pending.is_empty() {
            return Vec::new();
        }
        if self.resends >= self.policy.max_resends {
            tracing::warn!(
                resends = self.resends,
                pending = pending.len(),
                "Reference data stalled, resend limit reached"
            );
            return Vec::new();
        }

        self.resends += 1;
        tracing::info!(
            attempt = self.resends,
            requested = counts.0,
            resolved = counts.1,
            pending = ?pending,
            "Reference data stalled, resending lookups"
        );
        pending.into_iter().map(ClientCommand::Data).collect()
    }
}

/// Whether every member of `team` has its species and all of its moves
/// resolved
pub fn is_team_synchronized(team: &Team, registry: &ReferenceRegistry) -> bool {
    team.members().iter().all(|pokemon| {
        pokemon.is_species_resolved()
            && pokemon.moves.iter().all(|slot| registry.has_move(&slot.id))
    })
}
