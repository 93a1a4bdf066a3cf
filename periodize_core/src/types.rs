//! Core domain types for training periodization.
//!
//! This module defines the schedule model shared by the resolver, the
//! template expander and the persistence gateway:
//! - Programs, blocks and weekly phases
//! - Scheduled routines and their variant references
//! - Exercise catalog entries and per-set targets
//! - Completed training sessions

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Block Types
// ============================================================================

/// Training focus of a block
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Strength,
    Hypertrophy,
    Endurance,
    Peaking,
}

impl BlockType {
    /// Classify a free-text block name by keyword.
    ///
    /// Matches English and Spanish keywords anywhere in the lower-cased name;
    /// anything unrecognised is treated as hypertrophy.
    pub fn classify(name: &str) -> BlockType {
        let lower = name.to_lowercase();
        if lower.contains("hypertrophy") || lower.contains("hipertrofia") {
            BlockType::Hypertrophy
        } else if lower.contains("strength") || lower.contains("fuerza") {
            BlockType::Strength
        } else if lower.contains("adaptation")
            || lower.contains("adaptacion")
            || lower.contains("adaptación")
        {
            BlockType::Endurance
        } else if lower.contains("peak") || lower.contains("pico") {
            BlockType::Peaking
        } else {
            BlockType::Hypertrophy
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BlockType::Strength => "strength",
            BlockType::Hypertrophy => "hypertrophy",
            BlockType::Endurance => "endurance",
            BlockType::Peaking => "peaking",
        };
        f.write_str(label)
    }
}

// ============================================================================
// Schedule Tree
// ============================================================================

/// A top-level periodization plan
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Program {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub goal: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub blocks: Vec<Block>,
}

impl Program {
    /// Blocks in the order they are trained
    pub fn ordered_blocks(&self) -> Vec<&Block> {
        let mut blocks: Vec<&Block> = self.blocks.iter().collect();
        blocks.sort_by_key(|b| b.order_index);
        blocks
    }

    /// Sum of all block durations
    pub fn total_weeks(&self) -> u32 {
        self.blocks
            .iter()
            .fold(0u32, |total, b| total.saturating_add(b.duration_weeks))
    }
}

/// A contiguous multi-week training block within a program
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub id: Uuid,
    pub name: String,
    pub block_type: BlockType,
    pub order_index: u32,
    pub duration_weeks: u32,
    pub phases: Vec<Phase>,
}

impl Block {
    /// Phases ordered by week number
    pub fn ordered_phases(&self) -> Vec<&Phase> {
        let mut phases: Vec<&Phase> = self.phases.iter().collect();
        phases.sort_by_key(|p| p.week_number);
        phases
    }
}

/// One week's configuration within a block
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Phase {
    pub id: Uuid,
    /// 1-based week relative to the start of the owning block
    pub week_number: u32,
    #[serde(default = "default_modifier")]
    pub intensity_modifier: f64,
    #[serde(default = "default_modifier")]
    pub volume_modifier: f64,
    pub notes: Option<String>,
    pub routines: Vec<ScheduledRoutine>,
}

pub fn default_modifier() -> f64 {
    1.0
}

/// Identity of a concrete routine variant
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoutineVariantRef {
    pub id: Uuid,
    pub name: String,
    pub intensity_level: Option<u8>,
}

/// A routine variant placed on a calendar date
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScheduledRoutine {
    pub id: Uuid,
    pub variant: RoutineVariantRef,
    pub scheduled_at: NaiveDateTime,
    pub notes: Option<String>,
}

// ============================================================================
// Exercises and Targets
// ============================================================================

/// An exercise known to the catalog (read-only to the core)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExerciseCatalogEntry {
    pub id: String,
    pub name: String,
}

/// Target for a single working set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetTarget {
    /// 1-based position within the exercise
    pub set_number: u32,
    pub target_reps: Option<u32>,
    pub target_weight_percent: Option<f64>,
    pub target_rir: Option<f64>,
}

/// Convert an RPE rating into reps-in-reserve.
///
/// Both scales run 0–10, so RIR is `10 - RPE`, floored at zero.
pub fn rpe_to_rir(rpe: f64) -> f64 {
    (10.0 - rpe).max(0.0)
}

// ============================================================================
// Sessions
// ============================================================================

/// A training session the athlete marked as done
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompletedSession {
    pub id: Uuid,
    pub performed_at: DateTime<Utc>,
    #[serde(default)]
    pub program_id: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
}
