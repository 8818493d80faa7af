//! Elemental types and the type-effectiveness table

use std::fmt;
use std::sync::LazyLock;

use thiserror::Error;

/// Pokemon types (18 types as of Gen 6+)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Type {
    Normal = 0,
    Fire = 1,
    Water = 2,
    Electric = 3,
    Grass = 4,
    Ice = 5,
    Fighting = 6,
    Poison = 7,
    Ground = 8,
    Flying = 9,
    Psychic = 10,
    Bug = 11,
    Rock = 12,
    Ghost = 13,
    Dragon = 14,
    Dark = 15,
    Steel = 16,
    Fairy = 17,
}

impl Type {
    /// All 18 types in table order
    pub const ALL: [Type; 18] = [
        Type::Normal,
        Type::Fire,
        Type::Water,
        Type::Electric,
        Type::Grass,
        Type::Ice,
        Type::Fighting,
        Type::Poison,
        Type::Ground,
        Type::Flying,
        Type::Psychic,
        Type::Bug,
        Type::Rock,
        Type::Ghost,
        Type::Dragon,
        Type::Dark,
        Type::Steel,
        Type::Fairy,
    ];

    /// Parse a type name as the server spells it (case-insensitive)
    pub fn from_protocol(s: &str) -> Option<Self> {
        let s = s.trim();
        Type::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Type::Normal => "Normal",
            Type::Fire => "Fire",
            Type::Water => "Water",
            Type::Electric => "Electric",
            Type::Grass => "Grass",
            Type::Ice => "Ice",
            Type::Fighting => "Fighting",
            Type::Poison => "Poison",
            Type::Ground => "Ground",
            Type::Flying => "Flying",
            Type::Psychic => "Psychic",
            Type::Bug => "Bug",
            Type::Rock => "Rock",
            Type::Ghost => "Ghost",
            Type::Dragon => "Dragon",
            Type::Dark => "Dark",
            Type::Steel => "Steel",
            Type::Fairy => "Fairy",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type table that could not be loaded
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeChartError {
    #[error("Type table is empty")]
    Empty,

    #[error("Unknown type '{0}' in type table")]
    UnknownType(String),

    #[error("Type '{0}' appears twice in type table")]
    DuplicateType(String),

    #[error("Row {row}: expected {expected} multipliers, found {found}")]
    ColumnCount {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row {row}: '{cell}' is not a multiplier")]
    InvalidCell { row: usize, cell: String },

    #[error("Expected {expected} attacking rows, found {found}")]
    RowCount { expected: usize, found: usize },
}

/// Attacking type x defending type damage multipliers
///
/// Rows are attacking types, columns defending types, both in [`Type::ALL`]
/// order. A loaded table is immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeChart {
    multipliers: [[f32; 18]; 18],
}

/// The built-in table, shared by every battle in the process
pub static STANDARD_CHART: LazyLock<TypeChart> = LazyLock::new(TypeChart::standard);

impl TypeChart {
    /// The Gen 6+ table
    pub fn standard() -> Self {
        Self {
            multipliers: TYPE_CHART,
        }
    }

    /// Multiplier of one attacking type against one defending type
    pub fn effectiveness(&self, attack: Type, defender: Type) -> f32 {
        self.multipliers[attack as usize][defender as usize]
    }

    /// Multiplier against every defending type, multiplied together
    pub fn type_multiplier(&self, attack: Type, defenders: &[Type]) -> f32 {
        defenders
            .iter()
            .map(|t| self.effectiveness(attack, *t))
            .product()
    }

    /// Load a table from rows of text.
    ///
    /// The first row names the defending types (an optional leading cell
    /// such as `attacking` is ignored); each following row is
    /// `ATTACKING_TYPE,m1,m2,...` with one multiplier per defending type.
    /// Every type must appear exactly once as a row and as a column.
    pub fn from_rows<'a, I>(rows: I) -> Result<Self, TypeChartError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut rows = rows
            .into_iter()
            .map(str::trim)
            .filter(|r| !r.is_empty());

        let header = rows.next().ok_or(TypeChartError::Empty)?;
        let mut columns: Vec<&str> = header.split(',').map(str::trim).collect();
        if columns.first().is_some_and(|c| Type::from_protocol(c).is_none()) {
            columns.remove(0);
        }
        let columns = parse_type_list(&columns)?;

        let mut multipliers = [[1.0; 18]; 18];
        let mut seen_rows = Vec::new();

        for (row_index, row) in rows.enumerate() {
            let row_number = row_index + 2;
            let mut cells = row.split(',').map(str::trim);
            let name = cells.next().unwrap_or_default();
            let attack =
                Type::from_protocol(name).ok_or_else(|| TypeChartError::UnknownType(name.into()))?;
            if seen_rows.contains(&attack) {
                return Err(TypeChartError::DuplicateType(name.into()));
            }
            seen_rows.push(attack);

            let values: Vec<&str> = cells.collect();
            if values.len() != columns.len() {
                return Err(TypeChartError::ColumnCount {
                    row: row_number,
                    expected: columns.len(),
                    found: values.len(),
                });
            }

            for (defender, cell) in columns.iter().zip(values) {
                let value: f32 = cell.parse().map_err(|_| TypeChartError::InvalidCell {
                    row: row_number,
                    cell: cell.to_string(),
                })?;
                if !value.is_finite() || value < 0.0 {
                    return Err(TypeChartError::InvalidCell {
                        row: row_number,
                        cell: cell.to_string(),
                    });
                }
                multipliers[attack as usize][*defender as usize] = value;
            }
        }

        if seen_rows.len() != columns.len() {
            return Err(TypeChartError::RowCount {
                expected: columns.len(),
                found: seen_rows.len(),
            });
        }

        Ok(Self { multipliers })
    }

    /// Load a table from comma-separated text (see [`TypeChart::from_rows`])
    pub fn parse_csv(text: &str) -> Result<Self, TypeChartError> {
        Self::from_rows(text.lines())
    }
}

impl Default for TypeChart {
    fn default() -> Self {
        Self::standard()
    }
}

fn parse_type_list(names: &[&str]) -> Result<Vec<Type>, TypeChartError> {
    let mut types = Vec::with_capacity(names.len());
    for name in names {
        let t = Type::from_protocol(name).ok_or_else(|| TypeChartError::UnknownType(name.to_string()))?;
        if types.contains(&t) {
            return Err(TypeChartError::DuplicateType(name.to_string()));
        }
        types.push(t);
    }
    if types.len() != Type::ALL.len() {
        return Err(TypeChartError::RowCount {
            expected: Type::ALL.len(),
            found: types.len(),
        });
    }
    Ok(types)
}

/// 18x18 type effectiveness chart
/// Row = attacking type, Column = defending type
/// Values: 0.0 = immune, 0.5 = not very effective, 1.0 = neutral, 2.0 = super effective
///
/// Order: Normal, Fire, Water, Electric, Grass, Ice, Fighting, Poison, Ground,
///        Flying, Psychic, Bug, Rock, Ghost, Dragon, Dark, Steel, Fairy
#[rustfmt::skip]
const TYPE_CHART: [[f32; 18]; 18] = [
    // Normal attacking
    [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.5, 0.0, 1.0, 1.0, 0.5, 1.0],
    // Fire attacking
    [1.0, 0.5, 0.5, 1.0, 2.0, 2.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 0.5, 1.0, 0.5, 1.0, 2.0, 1.0],
    // Water attacking
    [1.0, 2.0, 0.5, 1.0, 0.5, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 2.0, 1.0, 0.5, 1.0, 1.0, 1.0],
    // Electric attacking
    [1.0, 1.0, 2.0, 0.5, 0.5, 1.0, 1.0, 1.0, 0.0, 2.0, 1.0, 1.0, 1.0, 1.0, 0.5, 1.0, 1.0, 1.0],
    // Grass attacking
    [1.0, 0.5, 2.0, 1.0, 0.5, 1.0, 1.0, 0.5, 2.0, 0.5, 1.0, 0.5, 2.0, 1.0, 0.5, 1.0, 0.5, 1.0],
    // Ice attacking
    [1.0, 0.5, 0.5, 1.0, 2.0, 0.5, 1.0, 1.0, 2.0, 2.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0, 0.5, 1.0],
    // Fighting attacking
    [2.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0, 0.5, 1.0, 0.5, 0.5, 0.5, 2.0, 0.0, 1.0, 2.0, 2.0, 0.5],
    // Poison attacking
    [1.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 0.5, 0.5, 1.0, 1.0, 1.0, 0.5, 0.5, 1.0, 1.0, 0.0, 2.0],
    // Ground attacking
    [1.0, 2.0, 1.0, 2.0, 0.5, 1.0, 1.0, 2.0, 1.0, 0.0, 1.0, 0.5, 2.0, 1.0, 1.0, 1.0, 2.0, 1.0],
    // Flying attacking
    [1.0, 1.0, 1.0, 0.5, 2.0, 1.0, 2.0, 1.0, 1.0, 1.0, 1.0, 2.0, 0.5, 1.0, 1.0, 1.0, 0.5, 1.0],
    // Psychic attacking
    [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 1.0, 1.0, 0.5, 1.0, 1.0, 1.0, 1.0, 0.0, 0.5, 1.0],
    // Bug attacking
    [1.0, 0.5, 1.0, 1.0, 2.0, 1.0, 0.5, 0.5, 1.0, 0.5, 2.0, 1.0, 1.0, 0.5, 1.0, 2.0, 0.5, 0.5],
    // Rock attacking
    [1.0, 2.0, 1.0, 1.0, 1.0, 2.0, 0.5, 1.0, 0.5, 2.0, 1.0, 2.0, 1.0, 1.0, 1.0, 1.0, 0.5, 1.0],
    // Ghost attacking
    [0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 2.0, 1.0, 0.5, 1.0, 1.0],
    // Dragon attacking
    [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0, 0.5, 0.0],
    // Dark attacking
    [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.5, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 2.0, 1.0, 0.5, 1.0, 0.5],
    // Steel attacking
    [1.0, 0.5, 0.5, 0.5, 1.0, 2.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 0.5, 2.0],
    // Fairy attacking
    [1.0, 0.5, 1.0, 1.0, 1.0, 1.0, 2.0, 0.5, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 0.5, 1.0],
];

#[cfg(test)]
mod tests {
    use super::*;

    fn standard_csv() -> String {
        let chart = TypeChart::standard();
        let header: Vec<&str> = Type::ALL.iter().map(Type::as_str).collect();
        let mut text = format!("attacking,{}\n", header.join(","));
        for attack in Type::ALL {
            let cells: Vec<String> = Type::ALL
                .iter()
                .map(|d| chart.effectiveness(attack, *d).to_string())
                .collect();
            text.push_str(&format!("{},{}\n", attack, cells.join(",")));
        }
        text
    }

    #[test]
    fn test_single_type_lookups() {
        let chart = TypeChart::standard();
        assert_eq!(chart.effectiveness(Type::Fire, Type::Grass), 2.0);
        assert_eq!(chart.effectiveness(Type::Fire, Type::Water), 0.5);
        assert_eq!(chart.effectiveness(Type::Normal, Type::Ghost), 0.0);
        assert_eq!(chart.effectiveness(Type::Dragon, Type::Fairy), 0.0);
    }

    #[test]
    fn test_dual_type_multiplier_is_product() {
        let chart = &*STANDARD_CHART;
        for attack in Type::ALL {
            for a in Type::ALL {
                for b in Type::ALL {
                    let product = chart.effectiveness(attack, a) * chart.effectiveness(attack, b);
                    assert_eq!(chart.type_multiplier(attack, &[a, b]), product);
                    assert_eq!(chart.type_multiplier(attack, &[b, a]), product);
                }
            }
        }

        assert_eq!(chart.type_multiplier(Type::Fire, &[Type::Grass, Type::Steel]), 4.0);
        assert_eq!(chart.type_multiplier(Type::Ground, &[Type::Flying, Type::Steel]), 0.0);
        assert_eq!(chart.type_multiplier(Type::Water, &[]), 1.0);
    }

    #[test]
    fn test_type_from_protocol() {
        assert_eq!(Type::from_protocol("Fire"), Some(Type::Fire));
        assert_eq!(Type::from_protocol("FIRE"), Some(Type::Fire));
        assert_eq!(Type::from_protocol("???"), None);
    }

    #[test]
    fn test_load_table_from_rows() {
        let chart = TypeChart::parse_csv(&standard_csv()).unwrap();
        assert_eq!(chart, TypeChart::standard());
    }

    #[test]
    fn test_load_table_validation() {
        let csv = standard_csv();
        let mut lines: Vec<&str> = csv.lines().collect();

        let short = lines[..5].join("\n");
        assert!(matches!(
            TypeChart::parse_csv(&short),
            Err(TypeChartError::RowCount { expected: 18, found: 4 })
        ));

        let bad_cell = lines[1].replacen("1", "x", 1);
        lines[1] = &bad_cell;
        assert!(matches!(
            TypeChart::parse_csv(&lines.join("\n")),
            Err(TypeChartError::InvalidCell { row: 2, .. })
        ));

        assert_eq!(TypeChart::parse_csv(""), Err(TypeChartError::Empty));
        assert!(matches!(
            TypeChart::from_rows(["Fire,Water", "Fire,1,2,3"]),
            Err(TypeChartError::RowCount { .. })
        ));
    }
}
