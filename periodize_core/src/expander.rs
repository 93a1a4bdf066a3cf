//! Template expander.
//!
//! Turns a compressed [`ImportDoc`] into the full schedule tree:
//! - One block per import block, numbered from 1 in document order
//! - One phase per distinct week, built from a week → templates map
//! - One routine per referenced template, with catalog-resolved exercises
//!   and per-set targets
//! - A dated session for every (week, template) pair, with each block's
//!   weeks following on from the blocks before it
//!
//! Expansion is pure and mints no ids, so the same document and catalog
//! always produce an equal [`ExpandedProgram`]. Problems with individual
//! items are collected as [`ImportWarning`]s and never abort the expansion.

use crate::config::ImportConfig;
use crate::dates::{at_midnight, next_monday, parse_weekday, weekday_offset};
use crate::import::{ExerciseRow, ImportBlock, ImportDoc, RoutineTemplate};
use crate::matching::ExerciseMatcher;
use crate::{rpe_to_rir, BlockType, ExerciseCatalogEntry, SetTarget};
use chrono::{Duration, NaiveDate, NaiveDateTime, Weekday};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Longest block an import may create. Longer explicit durations are capped
/// and weeks past it never stretch a block.
pub const MAX_BLOCK_WEEKS: u32 = 520;

/// A fully expanded program, ready to persist
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ExpandedProgram {
    pub name: String,
    pub description: Option<String>,
    pub goal: Option<String>,
    /// Monday that week 1 of the schedule starts on
    pub program_start: NaiveDate,
    /// Routines in order of first use
    pub routines: Vec<ExpandedRoutine>,
    pub blocks: Vec<ExpandedBlock>,
    pub warnings: Vec<ImportWarning>,
}

impl ExpandedProgram {
    pub fn routine(&self, template_id: &str) -> Option<&ExpandedRoutine> {
        self.routines.iter().find(|r| r.template_id == template_id)
    }

    pub fn phase_count(&self) -> usize {
        self.blocks.iter().map(|b| b.phases.len()).sum()
    }

    pub fn session_count(&self) -> usize {
        self.blocks
            .iter()
            .flat_map(|b| &b.phases)
            .map(|p| p.sessions.len())
            .sum()
    }
}

/// A routine materialized from one template
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ExpandedRoutine {
    pub template_id: String,
    pub name: String,
    pub weekday: Weekday,
    pub exercises: Vec<ExpandedExercise>,
}

/// An exercise row resolved against the catalog
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ExpandedExercise {
    pub exercise_id: String,
    pub exercise_name: String,
    /// Name as written in the import document
    pub import_name: String,
    pub order_index: u32,
    pub reps_min: Option<u32>,
    pub reps_max: Option<u32>,
    pub notes: Option<String>,
    pub sets: Vec<SetTarget>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ExpandedBlock {
    pub name: String,
    pub block_type: BlockType,
    pub order_index: u32,
    pub duration_weeks: u32,
    pub phases: Vec<ExpandedPhase>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ExpandedPhase {
    pub week_number: u32,
    pub intensity_modifier: f64,
    pub volume_modifier: f64,
    pub sessions: Vec<ExpandedSession>,
}

/// A routine run on a concrete date
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ExpandedSession {
    pub template_id: String,
    pub scheduled_at: NaiveDateTime,
}

/// An item skipped or patched up during expansion
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportWarning {
    MissingTemplate { block: String, week: u32, template_id: String },
    UnmatchedExercise { template_id: String, exercise: String },
    UnknownWeekday { template_id: String, code: Option<String> },
    WeekOutOfRange { block: String, week: u32, duration_weeks: u32 },
    MalformedRow { template_id: String, row: usize, reason: String },
    MalformedSchedule { block: String, value: String },
    DurationCapped { block: String, requested: u32, used: u32 },
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportWarning::MissingTemplate { block, week, template_id } => write!(
                f,
                "block '{}' week {} references unknown template '{}'",
                block, week, template_id
            ),
            ImportWarning::UnmatchedExercise { template_id, exercise } => write!(
                f,
                "template '{}': no catalog exercise matches '{}'",
                template_id, exercise
            ),
            ImportWarning::UnknownWeekday { template_id, code } => write!(
                f,
                "template '{}': unknown weekday {:?}, scheduled on Monday",
                template_id, code
            ),
            ImportWarning::WeekOutOfRange { block, week, duration_weeks } => write!(
                f,
                "block '{}': week {} is outside 1..={}",
                block, week, duration_weeks
            ),
            ImportWarning::MalformedRow { template_id, row, reason } => {
                write!(f, "template '{}' row {} skipped: {}", template_id, row, reason)
            }
            ImportWarning::MalformedSchedule { block, value } => write!(
                f,
                "block '{}': schedule cell {} is not a week or template id",
                block, value
            ),
            ImportWarning::DurationCapped { block, requested, used } => write!(
                f,
                "block '{}': duration of {} weeks capped at {}",
                block, requested, used
            ),
        }
    }
}

/// Expand `doc` into a dated schedule.
///
/// Week 1 starts on the Monday on or after `today`; each block's weeks
/// follow on from the blocks before it.
pub fn expand(
    doc: &ImportDoc,
    catalog: &[ExerciseCatalogEntry],
    today: NaiveDate,
    config: &ImportConfig,
    matcher: &dyn ExerciseMatcher,
) -> ExpandedProgram {
    let mut expander = Expander {
        doc,
        catalog,
        config,
        matcher,
        program_start: next_monday(today),
        routines: Vec::new(),
        routine_index: HashMap::new(),
        warnings: Vec::new(),
    };

    let mut weeks_before = 0u32;
    let mut blocks = Vec::with_capacity(doc.blocks.len());
    for (idx, block) in doc.blocks.iter().enumerate() {
        let expanded = expander.expand_block(idx as u32 + 1, weeks_before, block);
        weeks_before = weeks_before.saturating_add(expanded.duration_weeks);
        blocks.push(expanded);
    }

    let name = doc
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .unwrap_or_else(|| config.default_program_name.clone());

    let expanded = ExpandedProgram {
        name,
        description: doc.description.clone(),
        goal: doc.goal.clone(),
        program_start: expander.program_start,
        routines: expander.routines,
        blocks,
        warnings: expander.warnings,
    };

    tracing::info!(
        "Expanded '{}': {} blocks, {} phases, {} routines, {} sessions, {} warnings",
        expanded.name,
        expanded.blocks.len(),
        expanded.phase_count(),
        expanded.routines.len(),
        expanded.session_count(),
        expanded.warnings.len()
    );

    expanded
}

struct Expander<'a> {
    doc: &'a ImportDoc,
    catalog: &'a [ExerciseCatalogEntry],
    config: &'a ImportConfig,
    matcher: &'a dyn ExerciseMatcher,
    program_start: NaiveDate,
    routines: Vec<ExpandedRoutine>,
    routine_index: HashMap<String, usize>,
    warnings: Vec<ImportWarning>,
}

impl Expander<'_> {
    fn warn(&mut self, warning: ImportWarning) {
        tracing::warn!("Import: {}", warning);
        self.warnings.push(warning);
    }

    /// `weeks_before` is the total duration of the blocks preceding this one,
    /// which shifts the block's week-relative dates onto the program calendar.
    fn expand_block(
        &mut self,
        order_index: u32,
        weeks_before: u32,
        block: &ImportBlock,
    ) -> ExpandedBlock {
        let name = block
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("Block {}", order_index));
        let block_type = block.kind.unwrap_or_else(|| BlockType::classify(&name));

        let doc = self.doc;
        let weeks = self.week_map(&name, block);
        let duration_weeks = self.block_duration(&name, block, &weeks);

        let mut phases = Vec::with_capacity(weeks.len());
        for (week, template_ids) in weeks {
            if week == 0 || week > duration_weeks {
                self.warn(ImportWarning::WeekOutOfRange {
                    block: name.clone(),
                    week,
                    duration_weeks,
                });
                continue;
            }

            let mut sessions = Vec::with_capacity(template_ids.len());
            for template_id in &template_ids {
                let Some(template) = doc.templates.get(template_id) else {
                    self.warn(ImportWarning::MissingTemplate {
                        block: name.clone(),
                        week,
                        template_id: template_id.clone(),
                    });
                    continue;
                };

                let routine_idx = self.routine_for(template_id, template);
                let weekday = self.routines[routine_idx].weekday;
                let program_start = self.program_start;
                let date = weeks_before
                    .checked_add(week)
                    .and_then(|program_week| scheduled_at(program_start, program_week, weekday));
                let Some(at) = date else {
                    self.warn(ImportWarning::WeekOutOfRange {
                        block: name.clone(),
                        week,
                        duration_weeks,
                    });
                    continue;
                };
                sessions.push(ExpandedSession {
                    template_id: template_id.clone(),
                    scheduled_at: at,
                });
            }

            phases.push(ExpandedPhase {
                week_number: week,
                intensity_modifier: crate::types::default_modifier(),
                volume_modifier: crate::types::default_modifier(),
                sessions,
            });
        }

        tracing::debug!(
            "Block {} '{}' ({}): {} weeks, {} phases",
            order_index,
            name,
            block_type,
            duration_weeks,
            phases.len()
        );

        ExpandedBlock {
            name,
            block_type,
            order_index,
            duration_weeks,
            phases,
        }
    }

    /// Explicit duration, else two weeks per schedule entry (stretched to
    /// cover every referenced week), else the configured fallback. Never
    /// more than [`MAX_BLOCK_WEEKS`].
    fn block_duration(
        &mut self,
        name: &str,
        block: &ImportBlock,
        weeks: &BTreeMap<u32, Vec<String>>,
    ) -> u32 {
        if let Some(explicit) = block.duration_weeks {
            if explicit > MAX_BLOCK_WEEKS {
                self.warn(ImportWarning::DurationCapped {
                    block: name.to_string(),
                    requested: explicit,
                    used: MAX_BLOCK_WEEKS,
                });
                return MAX_BLOCK_WEEKS;
            }
            return explicit;
        }
        if block.schedule.is_empty() {
            return self.config.fallback_block_weeks.min(MAX_BLOCK_WEEKS);
        }
        let entries = u32::try_from(block.schedule.len()).unwrap_or(u32::MAX);
        let by_entries = entries.saturating_mul(self.config.weeks_per_schedule_entry);
        let highest_week = weeks
            .keys()
            .copied()
            .filter(|week| *week <= MAX_BLOCK_WEEKS)
            .next_back()
            .unwrap_or(0);
        by_entries.max(highest_week).min(MAX_BLOCK_WEEKS)
    }

    /// Week → template ids for a block, each week listed once
    fn week_map(&mut self, name: &str, block: &ImportBlock) -> BTreeMap<u32, Vec<String>> {
        let mut weeks: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for entry in &block.schedule {
            let mut template_ids = Vec::with_capacity(entry.templates.len());
            for id in entry.template_ids() {
                match id {
                    Ok(id) => template_ids.push(id),
                    Err(cell) => self.warn(ImportWarning::MalformedSchedule {
                        block: name.to_string(),
                        value: cell.to_string(),
                    }),
                }
            }

            for week in entry.week_numbers() {
                let week = match week {
                    Ok(week) => week,
                    Err(cell) => {
                        self.warn(ImportWarning::MalformedSchedule {
                            block: name.to_string(),
                            value: cell.to_string(),
                        });
                        continue;
                    }
                };
                let templates = weeks.entry(week).or_default();
                for template_id in &template_ids {
                    if !templates.contains(template_id) {
                        templates.push(template_id.clone());
                    }
                }
            }
        }
        weeks
    }

    fn routine_for(&mut self, template_id: &str, template: &RoutineTemplate) -> usize {
        if let Some(idx) = self.routine_index.get(template_id) {
            return *idx;
        }

        let weekday = match template.day.as_deref().and_then(parse_weekday) {
            Some(day) => day,
            None => {
                self.warn(ImportWarning::UnknownWeekday {
                    template_id: template_id.to_string(),
                    code: template.day.clone(),
                });
                Weekday::Mon
            }
        };

        let mut exercises = Vec::with_capacity(template.exercises.len());
        for (idx, row) in template.rows().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    self.warn(ImportWarning::MalformedRow {
                        template_id: template_id.to_string(),
                        row: idx + 1,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            match self.matcher.match_exercise(&row.name, self.catalog) {
                Some(found) => {
                    let order_index = exercises.len() as u32 + 1;
                    exercises.push(ExpandedExercise {
                        exercise_id: found.entry.id.clone(),
                        exercise_name: found.entry.name.clone(),
                        import_name: row.name.clone(),
                        order_index,
                        reps_min: row.reps_min,
                        reps_max: row.reps_max,
                        notes: row.notes.clone(),
                        sets: set_targets(&row, self.config.default_set_count),
                    });
                }
                None => self.warn(ImportWarning::UnmatchedExercise {
                    template_id: template_id.to_string(),
                    exercise: row.name.clone(),
                }),
            }
        }

        let name = template
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(template_id)
            .to_string();

        self.routines.push(ExpandedRoutine {
            template_id: template_id.to_string(),
            name,
            weekday,
            exercises,
        });
        let idx = self.routines.len() - 1;
        self.routine_index.insert(template_id.to_string(), idx);
        idx
    }
}

/// Identical targets for every set of a row
fn set_targets(row: &ExerciseRow, default_set_count: u32) -> Vec<SetTarget> {
    let set_count = row.set_count.filter(|n| *n > 0).unwrap_or(default_set_count);
    let target_rir = row.rpe.filter(|rpe| *rpe > 0.0).map(rpe_to_rir);

    (1..=set_count)
        .map(|set_number| SetTarget {
            set_number,
            target_reps: row.reps_min,
            target_weight_percent: row.weight_percent,
            target_rir,
        })
        .collect()
}

/// Midnight of `weekday` in 1-based program week `program_week`, or `None`
/// past the end of the calendar
fn scheduled_at(
    program_start: NaiveDate,
    program_week: u32,
    weekday: Weekday,
) -> Option<NaiveDateTime> {
    let offset = i64::from(program_week.checked_sub(1)?) * 7 + weekday_offset(weekday);
    program_start
        .checked_add_signed(Duration::days(offset))
        .map(at_midnight)
}
