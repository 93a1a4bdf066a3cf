//! Persistence gateway boundary and the operations built on it.
//!
//! The resolver and expander never touch storage. This module defines the
//! CRUD surface they rely on and the glue that:
//! - Persists an [`ExpandedProgram`] in dependency order, skipping items
//!   whose insert fails
//! - Runs a full import (parse → expand → persist)
//! - Fetches what the resolver needs and resolves a program for a day

use crate::dates::local_day;
use crate::expander::{expand, ExpandedProgram, ExpandedRoutine};
use crate::matching::SubstringMatcher;
use crate::parser::TemplateParser;
use crate::resolver::{resolve, Resolution, ResolveContext};
use crate::{
    BlockType, CompletedSession, Error, ExerciseCatalogEntry, ImportConfig, Program, Result,
    SetTarget,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct NewProgram {
    pub name: String,
    pub description: Option<String>,
    pub goal: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewBlock {
    pub program_id: Uuid,
    pub name: String,
    pub block_type: BlockType,
    pub order_index: u32,
    pub duration_weeks: u32,
}

#[derive(Clone, Debug)]
pub struct NewPhase {
    pub block_id: Uuid,
    pub week_number: u32,
    pub intensity_modifier: f64,
    pub volume_modifier: f64,
    pub notes: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewRoutine {
    /// Program the routine was imported for
    pub program_id: Option<Uuid>,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct NewVariant {
    pub routine_id: Uuid,
    pub name: String,
    pub intensity_level: Option<u8>,
}

#[derive(Clone, Debug)]
pub struct NewVariantExercise {
    pub variant_id: Uuid,
    pub exercise_id: String,
    pub order_index: u32,
    pub reps_min: Option<u32>,
    pub reps_max: Option<u32>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewScheduledRoutine {
    pub phase_id: Uuid,
    pub variant_id: Uuid,
    pub scheduled_at: NaiveDateTime,
    pub notes: Option<String>,
}

/// Listing row for a stored program
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ProgramSummary {
    pub id: Uuid,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub block_count: usize,
    pub total_weeks: u32,
}

/// Storage operations the core depends on.
///
/// Every insert may fail on its own; callers decide whether a failure is
/// fatal.
pub trait PersistenceGateway {
    fn insert_program(&mut self, program: &NewProgram) -> Result<Uuid>;
    fn insert_block(&mut self, block: &NewBlock) -> Result<Uuid>;
    fn insert_phase(&mut self, phase: &NewPhase) -> Result<Uuid>;
    fn insert_routine(&mut self, routine: &NewRoutine) -> Result<Uuid>;
    fn insert_variant(&mut self, variant: &NewVariant) -> Result<Uuid>;
    fn insert_exercise(&mut self, exercise: &NewVariantExercise) -> Result<Uuid>;
    fn insert_sets(&mut self, variant_exercise_id: Uuid, sets: &[SetTarget]) -> Result<()>;
    fn insert_scheduled_routine(&mut self, entry: &NewScheduledRoutine) -> Result<Uuid>;

    fn get_program_with_blocks_and_phases(&self, id: Uuid) -> Result<Program>;
    fn list_programs(&self) -> Result<Vec<ProgramSummary>>;
    fn set_program_start_date(&mut self, id: Uuid, start_date: Option<NaiveDate>) -> Result<()>;
    /// Removes the program and everything it owns
    fn delete_program(&mut self, id: Uuid) -> Result<()>;

    fn find_exercise_by_id_or_name(&self, key: &str) -> Result<Option<ExerciseCatalogEntry>>;
    fn list_exercises(&self) -> Result<Vec<ExerciseCatalogEntry>>;

    fn last_completed_session(&self) -> Result<Option<CompletedSession>>;
}

/// What an import actually wrote
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct ImportReport {
    pub program_id: Uuid,
    pub program_name: String,
    pub program_start: Option<NaiveDate>,
    pub blocks_created: usize,
    pub phases_created: usize,
    pub routines_created: usize,
    pub exercises_created: usize,
    pub sets_created: usize,
    pub sessions_scheduled: usize,
    /// Items the expander skipped or patched
    pub warnings: Vec<String>,
    /// Inserts that failed and were skipped
    pub failures: Vec<String>,
}

impl ImportReport {
    fn skip(&mut self, failure: String) {
        tracing::warn!("Import: {}", failure);
        self.failures.push(failure);
    }
}

/// Write an expanded program through the gateway.
///
/// Order is block → phase → routine, variant, exercises, sets → scheduled
/// routine, since each insert needs ids from the previous ones. Only a
/// failed program insert aborts; anything inserted under it stays for
/// storage-level cascade cleanup. Each template becomes one routine and
/// variant, created the first time a phase schedules it.
pub fn persist_expanded(
    gateway: &mut dyn PersistenceGateway,
    expanded: &ExpandedProgram,
) -> Result<ImportReport> {
    let program_id = gateway
        .insert_program(&NewProgram {
            name: expanded.name.clone(),
            description: expanded.description.clone(),
            goal: expanded.goal.clone(),
        })
        .map_err(|e| Error::Import(format!("could not create program: {}", e)))?;

    let mut report = ImportReport {
        program_id,
        program_name: expanded.name.clone(),
        program_start: Some(expanded.program_start),
        warnings: expanded.warnings.iter().map(|w| w.to_string()).collect(),
        ..Default::default()
    };
    // Variant per template; `None` once creating it failed
    let mut variants: HashMap<&str, Option<Uuid>> = HashMap::new();

    for block in &expanded.blocks {
        let block_id = match gateway.insert_block(&NewBlock {
            program_id,
            name: block.name.clone(),
            block_type: block.block_type,
            order_index: block.order_index,
            duration_weeks: block.duration_weeks,
        }) {
            Ok(id) => id,
            Err(e) => {
                report.skip(format!("block '{}' not saved: {}", block.name, e));
                continue;
            }
        };
        report.blocks_created += 1;

        for phase in &block.phases {
            let phase_id = match gateway.insert_phase(&NewPhase {
                block_id,
                week_number: phase.week_number,
                intensity_modifier: phase.intensity_modifier,
                volume_modifier: phase.volume_modifier,
                notes: None,
            }) {
                Ok(id) => id,
                Err(e) => {
                    report.skip(format!(
                        "block '{}' week {} not saved: {}",
                        block.name, phase.week_number, e
                    ));
                    continue;
                }
            };
            report.phases_created += 1;

            for session in &phase.sessions {
                let template_id = session.template_id.as_str();
                let cached = match variants.get(template_id) {
                    Some(cached) => *cached,
                    None => {
                        let created = match expanded.routine(template_id) {
                            Some(routine) => {
                                match create_routine(gateway, program_id, routine, &mut report) {
                                    Ok(id) => Some(id),
                                    Err(e) => {
                                        report.skip(format!(
                                            "routine '{}' not saved: {}",
                                            routine.name, e
                                        ));
                                        None
                                    }
                                }
                            }
                            None => {
                                report.skip(format!("template '{}' was not expanded", template_id));
                                None
                            }
                        };
                        variants.insert(template_id, created);
                        created
                    }
                };
                let Some(variant_id) = cached else {
                    report.skip(format!(
                        "session '{}' on {} skipped, its routine was not saved",
                        template_id, session.scheduled_at
                    ));
                    continue;
                };

                match gateway.insert_scheduled_routine(&NewScheduledRoutine {
                    phase_id,
                    variant_id,
                    scheduled_at: session.scheduled_at,
                    notes: None,
                }) {
                    Ok(_) => report.sessions_scheduled += 1,
                    Err(e) => report.skip(format!(
                        "session '{}' on {} not saved: {}",
                        template_id, session.scheduled_at, e
                    )),
                }
            }
        }
    }

    tracing::info!(
        "Imported program '{}' ({}): {} blocks, {} phases, {} sessions, {} failures",
        report.program_name,
        program_id,
        report.blocks_created,
        report.phases_created,
        report.sessions_scheduled,
        report.failures.len()
    );

    Ok(report)
}

/// Create a routine and its default variant, returning the variant id.
///
/// Exercise and set failures are recorded and skipped.
fn create_routine(
    gateway: &mut dyn PersistenceGateway,
    program_id: Uuid,
    routine: &ExpandedRoutine,
    report: &mut ImportReport,
) -> Result<Uuid> {
    let routine_id = gateway.insert_routine(&NewRoutine {
        program_id: Some(program_id),
        name: routine.name.clone(),
    })?;
    let variant_id = gateway.insert_variant(&NewVariant {
        routine_id,
        name: routine.name.clone(),
        intensity_level: None,
    })?;
    report.routines_created += 1;

    for exercise in &routine.exercises {
        let exercise_row_id = match gateway.insert_exercise(&NewVariantExercise {
            variant_id,
            exercise_id: exercise.exercise_id.clone(),
            order_index: exercise.order_index,
            reps_min: exercise.reps_min,
            reps_max: exercise.reps_max,
            notes: exercise.notes.clone(),
        }) {
            Ok(id) => id,
            Err(e) => {
                report.skip(format!(
                    "exercise '{}' in '{}' not saved: {}",
                    exercise.exercise_name, routine.name, e
                ));
                continue;
            }
        };
        report.exercises_created += 1;

        match gateway.insert_sets(exercise_row_id, &exercise.sets) {
            Ok(()) => report.sets_created += exercise.sets.len(),
            Err(e) => report.skip(format!(
                "sets for '{}' in '{}' not saved: {}",
                exercise.exercise_name, routine.name, e
            )),
        }
    }

    Ok(variant_id)
}

/// Parse, expand and persist a program description.
///
/// A parser that yields nothing, or a program that cannot be created, fails
/// the whole import. Everything else is best effort.
pub fn import_program(
    parser: &dyn TemplateParser,
    gateway: &mut dyn PersistenceGateway,
    text: &str,
    today: NaiveDate,
    config: &ImportConfig,
) -> Result<ImportReport> {
    let doc = parser
        .parse(text)?
        .ok_or_else(|| Error::Import("parser produced no program".into()))?;

    let catalog = gateway.list_exercises()?;
    let expanded = expand(&doc, &catalog, today, config, &SubstringMatcher);
    persist_expanded(gateway, &expanded)
}

/// Load a program and resolve where the athlete is on `today`
pub fn current_suggestion(
    gateway: &dyn PersistenceGateway,
    program_id: Uuid,
    today: NaiveDate,
) -> Result<Resolution> {
    let program = gateway.get_program_with_blocks_and_phases(program_id)?;
    let last_completed_session = gateway
        .last_completed_session()?
        .map(|s| local_day(s.performed_at));

    Ok(resolve(
        &program,
        &ResolveContext {
            today,
            last_completed_session,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::CompressedJsonParser;
    use crate::sessions::{JsonlSink, SessionSink};
    use crate::store::FileGateway;
    use crate::dates::local_noon;

    const PROGRAM: &str = r#"{
        "n": "Upper Lower",
        "g": "strength",
        "t": {
            "lower": { "n": "Lower", "d": "Mon",
                       "e": [["Squat", 4, 5, 6, 75, 8], ["Nordic Curl", 3, 6, 8]] },
            "upper": { "n": "Upper", "d": "Thu",
                       "e": [["Bench Press", 3, 8, 10, 70, 8]] }
        },
        "b": [
            { "n": "Hypertrophy", "w": 2,
              "s": [ { "w": [1, 2], "r": ["lower", "upper"] } ] },
            { "n": "Peak", "w": 2,
              "s": [ { "w": [1], "r": ["lower", "missing"] } ] }
        ]
    }"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Gateway that fails a chosen operation and delegates everything else
    struct FlakyGateway {
        inner: FileGateway,
        fail: &'static str,
        routine_inserts: usize,
    }

    impl FlakyGateway {
        fn check(&self, op: &str) -> Result<()> {
            if self.fail == op {
                Err(Error::Storage(format!("{} unavailable", op)))
            } else {
                Ok(())
            }
        }
    }

    impl PersistenceGateway for FlakyGateway {
        fn insert_program(&mut self, program: &NewProgram) -> Result<Uuid> {
            self.check("program")?;
            self.inner.insert_program(program)
        }
        fn insert_block(&mut self, block: &NewBlock) -> Result<Uuid> {
            self.check("block")?;
            self.inner.insert_block(block)
        }
        fn insert_phase(&mut self, phase: &NewPhase) -> Result<Uuid> {
            self.check("phase")?;
            self.inner.insert_phase(phase)
        }
        fn insert_routine(&mut self, routine: &NewRoutine) -> Result<Uuid> {
            self.routine_inserts += 1;
            self.check("routine")?;
            self.inner.insert_routine(routine)
        }
        fn insert_variant(&mut self, variant: &NewVariant) -> Result<Uuid> {
            self.check("variant")?;
            self.inner.insert_variant(variant)
        }
        fn insert_exercise(&mut self, exercise: &NewVariantExercise) -> Result<Uuid> {
            self.check("exercise")?;
            self.inner.insert_exercise(exercise)
        }
        fn insert_sets(&mut self, id: Uuid, sets: &[SetTarget]) -> Result<()> {
            self.check("sets")?;
            self.inner.insert_sets(id, sets)
        }
        fn insert_scheduled_routine(&mut self, entry: &NewScheduledRoutine) -> Result<Uuid> {
            self.check("scheduled")?;
            self.inner.insert_scheduled_routine(entry)
        }
        fn get_program_with_blocks_and_phases(&self, id: Uuid) -> Result<Program> {
            self.inner.get_program_with_blocks_and_phases(id)
        }
        fn list_programs(&self) -> Result<Vec<ProgramSummary>> {
            self.inner.list_programs()
        }
        fn set_program_start_date(&mut self, id: Uuid, start: Option<NaiveDate>) -> Result<()> {
            self.inner.set_program_start_date(id, start)
        }
        fn delete_program(&mut self, id: Uuid) -> Result<()> {
            self.inner.delete_program(id)
        }
        fn find_exercise_by_id_or_name(&self, key: &str) -> Result<Option<ExerciseCatalogEntry>> {
            self.inner.find_exercise_by_id_or_name(key)
        }
        fn list_exercises(&self) -> Result<Vec<ExerciseCatalogEntry>> {
            self.inner.list_exercises()
        }
        fn last_completed_session(&self) -> Result<Option<CompletedSession>> {
            self.inner.last_completed_session()
        }
    }

    #[test]
    fn test_import_persists_full_tree() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut gateway = FileGateway::open(temp_dir.path()).unwrap();

        let report = import_program(
            &CompressedJsonParser,
            &mut gateway,
            PROGRAM,
            date(2024, 1, 1),
            &ImportConfig::default(),
        )
        .unwrap();

        assert_eq!(report.program_name, "Upper Lower");
        assert_eq!(report.program_start, Some(date(2024, 1, 1)));
        assert_eq!(report.blocks_created, 2);
        assert_eq!(report.phases_created, 3);
        assert_eq!(report.routines_created, 2);
        // Nordic Curl is not in the catalog
        assert_eq!(report.exercises_created, 2);
        assert_eq!(report.sets_created, 7);
        assert_eq!(report.sessions_scheduled, 5);
        assert_eq!(report.warnings.len(), 2);
        assert!(report.failures.is_empty());

        let program = gateway
            .get_program_with_blocks_and_phases(report.program_id)
            .unwrap();
        assert_eq!(program.blocks.len(), 2);
        assert!(program.start_date.is_none());
        let first_block = program.ordered_blocks()[0];
        let first_phase = first_block.ordered_phases()[0];
        assert_eq!(first_phase.routines.len(), 2);
        assert_eq!(first_phase.routines[0].variant.name, "Lower");
    }

    #[test]
    fn test_import_without_program_is_fatal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut gateway = FileGateway::open(temp_dir.path()).unwrap();

        let result = import_program(
            &CompressedJsonParser,
            &mut gateway,
            "null",
            date(2024, 1, 1),
            &ImportConfig::default(),
        );
        assert!(matches!(result, Err(Error::Import(_))));
        assert!(gateway.list_programs().unwrap().is_empty());
    }

    #[test]
    fn test_program_insert_failure_is_fatal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut gateway = FlakyGateway {
            inner: FileGateway::open(temp_dir.path()).unwrap(),
            fail: "program",
            routine_inserts: 0,
        };

        let result = import_program(
            &CompressedJsonParser,
            &mut gateway,
            PROGRAM,
            date(2024, 1, 1),
            &ImportConfig::default(),
        );
        assert!(matches!(result, Err(Error::Import(_))));
    }

    #[test]
    fn test_failed_inserts_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();

        for (fail, check) in [
            ("block", (0usize, 0usize)),
            ("phase", (2, 0)),
            ("routine", (2, 0)),
            ("scheduled", (2, 0)),
        ] {
            let mut gateway = FlakyGateway {
                inner: FileGateway::open(temp_dir.path()).unwrap(),
                fail,
                routine_inserts: 0,
            };
            let report = import_program(
                &CompressedJsonParser,
                &mut gateway,
                PROGRAM,
                date(2024, 1, 1),
                &ImportConfig::default(),
            )
            .unwrap();

            assert_eq!(report.blocks_created, check.0, "failing {}", fail);
            assert_eq!(report.sessions_scheduled, check.1, "failing {}", fail);
            assert!(!report.failures.is_empty(), "failing {}", fail);
        }
    }

    #[test]
    fn test_failed_variant_tries_each_template_once() {
        crate::logging::init_test();
        let temp_dir = tempfile::tempdir().unwrap();
        let mut gateway = FlakyGateway {
            inner: FileGateway::open(temp_dir.path()).unwrap(),
            fail: "variant",
            routine_inserts: 0,
        };

        let report = import_program(
            &CompressedJsonParser,
            &mut gateway,
            PROGRAM,
            date(2024, 1, 1),
            &ImportConfig::default(),
        )
        .unwrap();

        // Two templates, five sessions between them
        assert_eq!(gateway.routine_inserts, 2);
        assert_eq!(report.routines_created, 0);
        assert_eq!(report.sessions_scheduled, 0);
        assert_eq!(report.phases_created, 3);
        assert_eq!(report.failures.len(), 2 + 5);
    }

    #[test]
    fn test_failed_sets_keep_sessions() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut gateway = FlakyGateway {
            inner: FileGateway::open(temp_dir.path()).unwrap(),
            fail: "sets",
            routine_inserts: 0,
        };

        let report = import_program(
            &CompressedJsonParser,
            &mut gateway,
            PROGRAM,
            date(2024, 1, 1),
            &ImportConfig::default(),
        )
        .unwrap();

        assert_eq!(report.sets_created, 0);
        assert_eq!(report.exercises_created, 2);
        assert_eq!(report.sessions_scheduled, 5);
        assert_eq!(report.failures.len(), 2);
    }

    #[test]
    fn test_current_suggestion_uses_last_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut gateway = FileGateway::open(temp_dir.path()).unwrap();
        let report = import_program(
            &CompressedJsonParser,
            &mut gateway,
            PROGRAM,
            date(2024, 1, 1),
            &ImportConfig::default(),
        )
        .unwrap();

        assert_eq!(
            current_suggestion(&gateway, report.program_id, date(2024, 1, 1)).unwrap(),
            Resolution::NeedsStartDate
        );

        gateway
            .set_program_start_date(report.program_id, Some(date(2024, 1, 1)))
            .unwrap();
        let mut sink = JsonlSink::new(gateway.sessions_path());
        sink.append(&CompletedSession {
            id: Uuid::new_v4(),
            performed_at: local_noon(date(2024, 1, 15)),
            program_id: Some(report.program_id),
            notes: None,
        })
        .unwrap();

        // Day 21 → week 4 → Peak block, week 2, repeating its week-1 phase
        let resolution = current_suggestion(&gateway, report.program_id, date(2024, 1, 22)).unwrap();
        let Resolution::Suggestion(s) = resolution else {
            panic!("Expected suggestion, got {:?}", resolution);
        };
        assert_eq!(s.current_week, 4);
        let block = s.block.unwrap();
        assert_eq!(block.name, "Peak");
        assert_eq!(block.block_type, BlockType::Peaking);
        assert_eq!(block.week_in_block, 2);
        assert_eq!(s.phase.unwrap().repeated_from_week, Some(1));
        assert_eq!(s.routine.unwrap().variant.name, "Lower");
        assert_eq!(s.days_since_last_session, Some(7));
    }
}
