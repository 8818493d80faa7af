use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{MoveData, SpeciesData};

/// Battle-scoped canonical store of resolved reference data, keyed by ID.
///
/// Each move or species is stored once; pokemon refer to moves by ID, so a
/// single insert resolves the move for every holder.
#[derive(Debug, Default)]
pub struct ReferenceRegistry {
    moves: HashMap<String, Arc<MoveData>>,
    species: HashMap<String, Arc<SpeciesData>>,
}

impl ReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_move(&self, id: &str) -> Option<&Arc<MoveData>> {
        self.moves.get(id)
    }

    pub fn get_species(&self, id: &str) -> Option<&Arc<SpeciesData>> {
        self.species.get(id)
    }

    pub fn has_move(&self, id: &str) -> bool {
        self.moves.contains_key(id)
    }

    pub fn has_species(&self, id: &str) -> bool {
        self.species.contains_key(id)
    }

    /// Store a move; the first record for an ID wins
    pub fn insert_move(&mut self, data: MoveData) -> Arc<MoveData> {
        Arc::clone(
            self.moves
                .entry(data.id.clone())
                .or_insert_with(|| Arc::new(data)),
        )
    }

    /// Store a species; the first record for an ID wins
    pub fn insert_species(&mut self, data: SpeciesData) -> Arc<SpeciesData> {
        Arc::clone(
            self.species
                .entry(data.id.clone())
                .or_insert_with(|| Arc::new(data)),
        )
    }

    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }
}
