//! Move slots and resolved move data

use tactician_protocol::{MoveCategory, MoveRecord, MoveSlotInfo, normalize_move_id};

use super::Type;

/// Static move facts from a reference lookup, shared by every pokemon that
/// knows the move
#[derive(Debug, Clone, PartialEq)]
pub struct MoveData {
    pub id: String,
    pub name: String,
    /// None for the typeless `???` type
    pub move_type: Option<Type>,
    pub category: MoveCategory,
    pub base_power: Option<u32>,
    pub accuracy: Option<u32>,
    pub description: String,
}

impl MoveData {
    pub fn from_record(record: &MoveRecord) -> Self {
        Self {
            id: normalize_move_id(&record.name),
            name: record.name.clone(),
            move_type: Type::from_protocol(&record.move_type),
            category: record.category,
            base_power: record.base_power,
            accuracy: record.accuracy,
            description: record.description.clone(),
        }
    }

    /// Whether the move deals direct damage
    pub fn is_attack(&self) -> bool {
        self.category != MoveCategory::Status && self.base_power.is_some_and(|p| p > 0)
    }

    /// A synthetic 100 power, 100 accuracy attack used to probe threats
    pub fn probe(move_type: Type, category: MoveCategory) -> Self {
        Self {
            id: String::new(),
            name: format!("{} probe", move_type),
            move_type: Some(move_type),
            category,
            base_power: Some(100),
            accuracy: Some(100),
            description: String::new(),
        }
    }
}

/// One of a pokemon's move slots, as observed in battle.
///
/// The slot holds the move's ID; resolved data lives in the battle's
/// reference registry under that ID.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveSlot {
    pub id: String,
    pub name: String,
    pub target: Option<String>,
    pub disabled: bool,
    pub pp: Option<u32>,
    pub max_pp: Option<u32>,
}

impl MoveSlot {
    /// A move seen in a `|move|` line
    pub fn revealed(name: &str) -> Self {
        Self {
            id: normalize_move_id(name),
            name: name.to_string(),
            target: None,
            disabled: false,
            pp: None,
            max_pp: None,
        }
    }

    /// Whether the move can be chosen right now
    pub fn is_castable(&self) -> bool {
        !self.disabled && self.pp != Some(0)
    }
}

impl From<&MoveSlotInfo> for MoveSlot {
    fn from(info: &MoveSlotInfo) -> Self {
        Self {
            id: info.id.clone(),
            name: info.name.clone(),
            target: info.target.clone(),
            disabled: info.disabled,
            pp: info.pp,
            max_pp: info.max_pp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_data_from_record() {
        let record = MoveRecord {
            name: "Hidden Power Fire".into(),
            move_type: "Fire".into(),
            category: MoveCategory::Special,
            base_power: Some(60),
            accuracy: Some(100),
            description: String::new(),
        };
        let data = MoveData::from_record(&record);

        assert_eq!(data.id, "hiddenpowerfire");
        assert_eq!(data.move_type, Some(Type::Fire));
        assert!(data.is_attack());
    }

    #[test]
    fn test_status_move_is_not_an_attack() {
        let record = MoveRecord {
            name: "Growth".into(),
            move_type: "Normal".into(),
            category: MoveCategory::Status,
            base_power: None,
            accuracy: None,
            description: String::new(),
        };
        assert!(!MoveData::from_record(&record).is_attack());
    }

    #[test]
    fn test_castable() {
        let mut slot = MoveSlot::revealed("Return");
        assert_eq!(slot.id, "return");
        assert!(slot.is_castable());

        slot.pp = Some(0);
        assert!(!slot.is_castable());

        slot.pp = Some(3);
        slot.disabled = true;
        assert!(!slot.is_castable());
    }
}
