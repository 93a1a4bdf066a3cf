//! Compressed program import document.
//!
//! The text parser emits a deduplicated form of a program: routine templates
//! are defined once under `t` and referenced by id from each block's
//! schedule entries. Keys are single letters to keep the parser output small.
//!
//! ```json
//! {
//!   "n": "Powerbuilding",
//!   "t": { "t1": { "n": "Lower A", "d": "Mon",
//!                  "e": [["Back Squat", 4, 5, 6, 75, 8, "pause first rep"]] } },
//!   "b": [ { "n": "Strength", "w": 4, "s": [ { "w": [1, 2], "r": ["t1"] } ] } ]
//! }
//! ```
//!
//! Rows, schedule weeks and template references are kept as raw JSON and
//! decoded one at a time, so a single malformed cell costs only that item.
//! Scalar block and program fields fall back to "absent" when they have
//! the wrong type.

use crate::{BlockType, Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The whole import document
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ImportDoc {
    #[serde(rename = "n", default, deserialize_with = "lenient")]
    pub name: Option<String>,

    #[serde(rename = "d", default, deserialize_with = "lenient")]
    pub description: Option<String>,

    #[serde(rename = "g", default, deserialize_with = "lenient")]
    pub goal: Option<String>,

    #[serde(rename = "t", default)]
    pub templates: BTreeMap<String, RoutineTemplate>,

    #[serde(rename = "b", default)]
    pub blocks: Vec<ImportBlock>,
}

impl ImportDoc {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A routine defined once and run on one weekday
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RoutineTemplate {
    #[serde(rename = "n", default, deserialize_with = "lenient")]
    pub name: Option<String>,

    /// Weekday code such as "Mon" or "mié"
    #[serde(rename = "d", default, deserialize_with = "lenient")]
    pub day: Option<String>,

    /// Positional exercise rows, see [`ExerciseRow`]
    #[serde(rename = "e", default)]
    pub exercises: Vec<Value>,
}

impl RoutineTemplate {
    /// Decode each row on its own
    pub fn rows(&self) -> impl Iterator<Item = Result<ExerciseRow>> + '_ {
        self.exercises.iter().map(ExerciseRow::from_value)
    }
}

/// A block and the weeks its templates run in
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ImportBlock {
    #[serde(rename = "n", default, deserialize_with = "lenient")]
    pub name: Option<String>,

    #[serde(rename = "w", default, deserialize_with = "lenient_count")]
    pub duration_weeks: Option<u32>,

    /// Explicit block type; classified from the name when absent
    #[serde(rename = "k", default, deserialize_with = "lenient")]
    pub kind: Option<BlockType>,

    #[serde(rename = "s", default)]
    pub schedule: Vec<ScheduleEntry>,
}

/// Templates that run in each of the listed weeks
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ScheduleEntry {
    #[serde(rename = "w", default)]
    pub weeks: Vec<Value>,

    #[serde(rename = "r", default)]
    pub templates: Vec<Value>,
}

impl ScheduleEntry {
    pub fn new(weeks: &[u32], templates: &[&str]) -> Self {
        Self {
            weeks: weeks.iter().copied().map(Value::from).collect(),
            templates: templates.iter().copied().map(Value::from).collect(),
        }
    }

    /// Week numbers, with the offending cell for anything that is not a
    /// non-negative number
    pub fn week_numbers(&self) -> impl Iterator<Item = std::result::Result<u32, &Value>> + '_ {
        self.weeks.iter().map(|cell| count_cell(cell).ok_or(cell))
    }

    /// Template ids; numeric ids are read as their decimal text
    pub fn template_ids(&self) -> impl Iterator<Item = std::result::Result<String, &Value>> + '_ {
        self.templates.iter().map(|cell| match cell {
            Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(other),
        })
    }
}

/// Positional exercise row:
/// `[name, setCount, repsMin, repsMax, weightPercent, rpe, notes?]`
///
/// Numeric cells may be numbers, numeric strings or null. Trailing cells
/// may be omitted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExerciseRow {
    pub name: String,
    pub set_count: Option<u32>,
    pub reps_min: Option<u32>,
    pub reps_max: Option<u32>,
    pub weight_percent: Option<f64>,
    pub rpe: Option<f64>,
    pub notes: Option<String>,
}

impl ExerciseRow {
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Array(cells) = value else {
            return Err(Error::Import(format!(
                "exercise row must be an array, got {}",
                value
            )));
        };

        let name = match cells.first() {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(other) => {
                return Err(Error::Import(format!(
                    "exercise row name must be a non-empty string, got {}",
                    other
                )))
            }
            None => return Err(Error::Import("empty exercise row".into())),
        };

        let count = |idx: usize| cells.get(idx).and_then(count_cell);
        let number = |idx: usize| cells.get(idx).and_then(numeric_cell);

        Ok(ExerciseRow {
            name,
            set_count: count(1),
            reps_min: count(2),
            reps_max: count(3),
            weight_percent: number(4),
            rpe: number(5),
            notes: cells
                .get(6)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        })
    }
}

impl From<ExerciseRow> for Value {
    fn from(row: ExerciseRow) -> Self {
        let mut cells = vec![
            Value::String(row.name),
            row.set_count.map_or(Value::Null, Value::from),
            row.reps_min.map_or(Value::Null, Value::from),
            row.reps_max.map_or(Value::Null, Value::from),
            row.weight_percent.map_or(Value::Null, Value::from),
            row.rpe.map_or(Value::Null, Value::from),
        ];
        if let Some(notes) = row.notes {
            cells.push(Value::String(notes));
        }
        Value::Array(cells)
    }
}

fn numeric_cell(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Non-negative counts; fractional cells are rounded
fn count_cell(value: &Value) -> Option<u32> {
    numeric_cell(value)
        .map(f64::round)
        .filter(|n| (0.0..=f64::from(u32::MAX)).contains(n))
        .map(|n| n as u32)
}

/// Decode an optional field, treating a value of the wrong type as absent
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(count_cell(&value))
}
