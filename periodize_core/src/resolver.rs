//! Periodization resolver.
//!
//! Works out where an athlete is inside a program on a given day:
//! - Global week number counted from the program start date
//! - The block that week falls in, and the week within that block
//! - The phase for that week, repeating earlier phases cyclically once the
//!   authored weeks run out
//!
//! The resolver is pure. "Today" and the last completed session are passed
//! in through [`ResolveContext`]; nothing here reads a clock or storage.

use crate::dates::days_between;
use crate::{Block, BlockType, Phase, Program, RoutineVariantRef, ScheduledRoutine};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inputs the resolver needs besides the program tree
#[derive(Clone, Debug)]
pub struct ResolveContext {
    pub today: NaiveDate,
    pub last_completed_session: Option<NaiveDate>,
}

impl ResolveContext {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            last_completed_session: None,
        }
    }
}

/// Outcome of resolving a program on a given day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    /// The program has no start date yet
    NeedsStartDate,
    /// The program starts in the future
    NotStartedYet { days_until_start: i64 },
    /// Every block has been trained through
    Completed { completed_on: NaiveDate },
    /// The program is running
    Suggestion(Suggestion),
}

/// Where the athlete is today and what to train
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub program_id: Uuid,
    pub program_name: String,
    pub current_week: u32,
    pub total_weeks: u32,
    pub block: Option<BlockSummary>,
    pub phase: Option<PhaseSummary>,
    pub routine: Option<RoutineSuggestion>,
    pub days_since_last_session: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BlockSummary {
    pub id: Uuid,
    pub name: String,
    pub block_type: BlockType,
    pub week_in_block: u32,
    pub total_block_weeks: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PhaseSummary {
    pub id: Uuid,
    pub week_number: u32,
    pub intensity_modifier: f64,
    pub volume_modifier: f64,
    pub notes: Option<String>,
    /// Set when the week had no phase of its own and this one repeats
    pub repeated_from_week: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoutineSuggestion {
    pub scheduled_routine_id: Uuid,
    pub variant: RoutineVariantRef,
    pub intensity_modifier: f64,
    pub volume_modifier: f64,
    pub notes: Option<String>,
}

/// Resolve the program position for `ctx.today`
pub fn resolve(program: &Program, ctx: &ResolveContext) -> Resolution {
    let Some(start_date) = program.start_date else {
        tracing::debug!("Program {} has no start date", program.id);
        return Resolution::NeedsStartDate;
    };

    let days_elapsed = days_between(start_date, ctx.today);
    if days_elapsed < 0 {
        return Resolution::NotStartedYet {
            days_until_start: -days_elapsed,
        };
    }

    let current_week = week_number_for(days_elapsed);
    let total_weeks = program.total_weeks();

    if current_week > total_weeks {
        // Falls before today whenever current_week > total_weeks
        let completed_on = start_date
            .checked_add_signed(Duration::weeks(i64::from(total_weeks)))
            .unwrap_or(ctx.today);
        tracing::debug!(
            "Program {} completed on {} (week {} of {})",
            program.id,
            completed_on,
            current_week,
            total_weeks
        );
        return Resolution::Completed { completed_on };
    }

    let located = locate_block(program, current_week);

    let mut block_summary = None;
    let mut phase_summary = None;
    let mut routine = None;

    if let Some((block, week_in_block)) = located {
        block_summary = Some(BlockSummary {
            id: block.id,
            name: block.name.clone(),
            block_type: block.block_type,
            week_in_block,
            total_block_weeks: block.duration_weeks,
        });

        if let Some((phase, repeated)) = select_phase(block, week_in_block) {
            phase_summary = Some(PhaseSummary {
                id: phase.id,
                week_number: phase.week_number,
                intensity_modifier: phase.intensity_modifier,
                volume_modifier: phase.volume_modifier,
                notes: phase.notes.clone(),
                repeated_from_week: repeated.then_some(phase.week_number),
            });

            routine = suggest_routine(phase, ctx.today).map(|scheduled| RoutineSuggestion {
                scheduled_routine_id: scheduled.id,
                variant: scheduled.variant.clone(),
                intensity_modifier: phase.intensity_modifier,
                volume_modifier: phase.volume_modifier,
                notes: scheduled.notes.clone(),
            });
        }
    }

    tracing::info!(
        "Program '{}': week {} of {}, block {:?}",
        program.name,
        current_week,
        total_weeks,
        block_summary.as_ref().map(|b| b.name.as_str())
    );

    Resolution::Suggestion(Suggestion {
        program_id: program.id,
        program_name: program.name.clone(),
        current_week,
        total_weeks,
        block: block_summary,
        phase: phase_summary,
        routine,
        days_since_last_session: ctx
            .last_completed_session
            .map(|last| days_between(last, ctx.today)),
    })
}

/// 1-based global week for a non-negative day count
fn week_number_for(days_elapsed: i64) -> u32 {
    u32::try_from(days_elapsed / 7 + 1).unwrap_or(u32::MAX)
}

/// Find the block containing `current_week` and the 1-based week inside it
fn locate_block(program: &Program, current_week: u32) -> Option<(&Block, u32)> {
    let mut weeks_so_far = 0u32;
    for block in program.ordered_blocks() {
        let block_end = weeks_so_far.saturating_add(block.duration_weeks);
        if block_end >= current_week {
            return Some((block, current_week - weeks_so_far));
        }
        weeks_so_far = block_end;
    }
    None
}

/// Pick the phase for `week_in_block`.
///
/// An exact week match wins. Otherwise the authored phases repeat in week
/// order, so week `n` maps to `phases[(n - 1) % len]`. The flag reports
/// whether the phase was reached through that cycle.
fn select_phase(block: &Block, week_in_block: u32) -> Option<(&Phase, bool)> {
    let phases = block.ordered_phases();

    if let Some(exact) = phases.iter().copied().find(|p| p.week_number == week_in_block) {
        return Some((exact, false));
    }

    if phases.is_empty() {
        return None;
    }

    let cycle_position = (week_in_block.saturating_sub(1) as usize) % phases.len();
    tracing::debug!(
        "Block '{}' week {} has no phase, repeating phase for week {}",
        block.name,
        week_in_block,
        phases[cycle_position].week_number
    );
    Some((phases[cycle_position], true))
}

/// The routine scheduled on `today`, else the phase's earliest routine
fn suggest_routine(phase: &Phase, today: NaiveDate) -> Option<&ScheduledRoutine> {
    phase
        .routines
        .iter()
        .find(|r| r.scheduled_at.date() == today)
        .or_else(|| phase.routines.iter().min_by_key(|r| r.scheduled_at))
}
