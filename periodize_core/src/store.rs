//! File-backed persistence gateway.
//!
//! The whole relational store lives in one JSON document (`periodize.json`)
//! inside the data directory. Loading takes a shared lock; [`FileGateway::commit`]
//! writes a temp file under an exclusive lock, syncs it and renames it over
//! the original. Completed sessions live beside it in the session log.

use crate::gateway::{
    NewBlock, NewPhase, NewProgram, NewRoutine, NewScheduledRoutine, NewVariant,
    NewVariantExercise, PersistenceGateway, ProgramSummary,
};
use crate::{
    catalog, sessions, Block, BlockType, CompletedSession, Error, ExerciseCatalogEntry, Phase,
    Program, Result, RoutineVariantRef, ScheduledRoutine, SetTarget,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

const STORE_FILE: &str = "periodize.json";
const SESSIONS_FILE: &str = "sessions.wal";

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ProgramRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    goal: Option<String>,
    start_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct BlockRow {
    id: Uuid,
    program_id: Uuid,
    name: String,
    block_type: BlockType,
    order_index: u32,
    duration_weeks: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PhaseRow {
    id: Uuid,
    block_id: Uuid,
    week_number: u32,
    intensity_modifier: f64,
    volume_modifier: f64,
    notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct RoutineRow {
    id: Uuid,
    program_id: Option<Uuid>,
    name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct VariantRow {
    id: Uuid,
    routine_id: Uuid,
    name: String,
    intensity_level: Option<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct VariantExerciseRow {
    id: Uuid,
    variant_id: Uuid,
    exercise_id: String,
    order_index: u32,
    reps_min: Option<u32>,
    reps_max: Option<u32>,
    notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct SetTargetRow {
    variant_exercise_id: Uuid,
    #[serde(flatten)]
    target: SetTarget,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ScheduledRoutineRow {
    id: Uuid,
    phase_id: Uuid,
    variant_id: Uuid,
    scheduled_at: NaiveDateTime,
    notes: Option<String>,
}

/// Every table of the store
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    programs: Vec<ProgramRow>,
    #[serde(default)]
    blocks: Vec<BlockRow>,
    #[serde(default)]
    phases: Vec<PhaseRow>,
    #[serde(default)]
    routines: Vec<RoutineRow>,
    #[serde(default)]
    variants: Vec<VariantRow>,
    #[serde(default)]
    variant_exercises: Vec<VariantExerciseRow>,
    #[serde(default)]
    set_targets: Vec<SetTargetRow>,
    #[serde(default)]
    scheduled_routines: Vec<ScheduledRoutineRow>,
    #[serde(default)]
    exercises: Vec<ExerciseCatalogEntry>,
}

impl StoreData {
    /// Load the store with a shared lock
    ///
    /// Returns an empty store if the file doesn't exist. A file that cannot
    /// be parsed is renamed aside (see [`quarantine`]) before starting empty,
    /// so a later commit never overwrites it.
    fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No store found at {:?}, starting empty", path);
            return Ok(Self::default());
        }

        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = Vec::new();
        let read = std::io::BufReader::new(&file).read_to_end(&mut contents);
        file.unlock()?;
        drop(file);
        read?;

        match serde_json::from_slice::<StoreData>(&contents) {
            Ok(data) => {
                tracing::debug!("Loaded store from {:?}", path);
                Ok(data)
            }
            Err(e) => {
                let moved_to = quarantine(path)?;
                tracing::warn!(
                    "Failed to parse store {:?}: {}. Moved it to {:?}, starting empty.",
                    path,
                    e,
                    moved_to
                );
                Ok(Self::default())
            }
        }
    }

    /// Save the store atomically
    ///
    /// 1. Write to a temp file in the same directory
    /// 2. Sync to disk
    /// 3. Rename over the original
    fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Storage(format!("store path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved store to {:?}", path);
        Ok(())
    }
}

/// Rename an unreadable store to `<name>.corrupt-<timestamp>` beside it
fn quarantine(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Storage(format!("store path {:?} has no file name", path)))?
        .to_string_lossy();
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");

    let mut target = path.with_file_name(format!("{}.corrupt-{}", file_name, stamp));
    let mut attempt = 1;
    while target.exists() {
        attempt += 1;
        target = path.with_file_name(format!("{}.corrupt-{}-{}", file_name, stamp, attempt));
    }

    std::fs::rename(path, &target)?;
    Ok(target)
}

/// Persistence gateway over the JSON store and session log
pub struct FileGateway {
    path: PathBuf,
    sessions_path: PathBuf,
    data: StoreData,
}

impl FileGateway {
    /// Open the store in `data_dir`, seeding the exercise catalog if empty
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(STORE_FILE);
        let mut data = StoreData::load(&path)?;

        if data.exercises.is_empty() {
            data.exercises = catalog::default_catalog().to_vec();
            tracing::debug!("Seeded {} catalog exercises", data.exercises.len());
        }
        for problem in catalog::validate(&data.exercises) {
            tracing::warn!("Exercise catalog: {}", problem);
        }

        Ok(Self {
            path,
            sessions_path: data_dir.join(SESSIONS_FILE),
            data,
        })
    }

    /// Write all changes back to disk
    pub fn commit(&self) -> Result<()> {
        self.data.save(&self.path)
    }

    pub fn sessions_path(&self) -> &Path {
        &self.sessions_path
    }

    fn program_row_mut(&mut self, id: Uuid) -> Result<&mut ProgramRow> {
        self.data
            .programs
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("program {}", id)))
    }

    fn variant_ref(&self, variant_id: Uuid) -> Option<RoutineVariantRef> {
        self.data
            .variants
            .iter()
            .find(|v| v.id == variant_id)
            .map(|v| RoutineVariantRef {
                id: v.id,
                name: v.name.clone(),
                intensity_level: v.intensity_level,
            })
    }

    fn phase_tree(&self, row: &PhaseRow) -> Phase {
        let mut routines: Vec<ScheduledRoutine> = self
            .data
            .scheduled_routines
            .iter()
            .filter(|s| s.phase_id == row.id)
            .filter_map(|s| match self.variant_ref(s.variant_id) {
                Some(variant) => Some(ScheduledRoutine {
                    id: s.id,
                    variant,
                    scheduled_at: s.scheduled_at,
                    notes: s.notes.clone(),
                }),
                None => {
                    tracing::warn!(
                        "Scheduled routine {} references missing variant {}",
                        s.id,
                        s.variant_id
                    );
                    None
                }
            })
            .collect();
        routines.sort_by_key(|r| r.scheduled_at);

        Phase {
            id: row.id,
            week_number: row.week_number,
            intensity_modifier: row.intensity_modifier,
            volume_modifier: row.volume_modifier,
            notes: row.notes.clone(),
            routines,
        }
    }
}

impl PersistenceGateway for FileGateway {
    fn insert_program(&mut self, program: &NewProgram) -> Result<Uuid> {
        if program.name.trim().is_empty() {
            return Err(Error::Storage("program name must not be empty".into()));
        }
        let id = Uuid::new_v4();
        self.data.programs.push(ProgramRow {
            id,
            name: program.name.clone(),
            description: program.description.clone(),
            goal: program.goal.clone(),
            start_date: None,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    fn insert_block(&mut self, block: &NewBlock) -> Result<Uuid> {
        self.program_row_mut(block.program_id)?;
        let id = Uuid::new_v4();
        self.data.blocks.push(BlockRow {
            id,
            program_id: block.program_id,
            name: block.name.clone(),
            block_type: block.block_type,
            order_index: block.order_index,
            duration_weeks: block.duration_weeks,
        });
        Ok(id)
    }

    fn insert_phase(&mut self, phase: &NewPhase) -> Result<Uuid> {
        let block = self
            .data
            .blocks
            .iter()
            .find(|b| b.id == phase.block_id)
            .ok_or_else(|| Error::NotFound(format!("block {}", phase.block_id)))?;
        if phase.week_number == 0 || phase.week_number > block.duration_weeks {
            return Err(Error::Storage(format!(
                "week {} outside block '{}' (1..={})",
                phase.week_number, block.name, block.duration_weeks
            )));
        }

        let id = Uuid::new_v4();
        self.data.phases.push(PhaseRow {
            id,
            block_id: phase.block_id,
            week_number: phase.week_number,
            intensity_modifier: phase.intensity_modifier,
            volume_modifier: phase.volume_modifier,
            notes: phase.notes.clone(),
        });
        Ok(id)
    }

    fn insert_routine(&mut self, routine: &NewRoutine) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.data.routines.push(RoutineRow {
            id,
            program_id: routine.program_id,
            name: routine.name.clone(),
        });
        Ok(id)
    }

    fn insert_variant(&mut self, variant: &NewVariant) -> Result<Uuid> {
        if !self.data.routines.iter().any(|r| r.id == variant.routine_id) {
            return Err(Error::NotFound(format!("routine {}", variant.routine_id)));
        }
        let id = Uuid::new_v4();
        self.data.variants.push(VariantRow {
            id,
            routine_id: variant.routine_id,
            name: variant.name.clone(),
            intensity_level: variant.intensity_level,
        });
        Ok(id)
    }

    fn insert_exercise(&mut self, exercise: &NewVariantExercise) -> Result<Uuid> {
        if !self.data.variants.iter().any(|v| v.id == exercise.variant_id) {
            return Err(Error::NotFound(format!("variant {}", exercise.variant_id)));
        }
        if !self.data.exercises.iter().any(|e| e.id == exercise.exercise_id) {
            return Err(Error::NotFound(format!("exercise {}", exercise.exercise_id)));
        }
        let id = Uuid::new_v4();
        self.data.variant_exercises.push(VariantExerciseRow {
            id,
            variant_id: exercise.variant_id,
            exercise_id: exercise.exercise_id.clone(),
            order_index: exercise.order_index,
            reps_min: exercise.reps_min,
            reps_max: exercise.reps_max,
            notes: exercise.notes.clone(),
        });
        Ok(id)
    }

    fn insert_sets(&mut self, variant_exercise_id: Uuid, sets: &[SetTarget]) -> Result<()> {
        if !self
            .data
            .variant_exercises
            .iter()
            .any(|e| e.id == variant_exercise_id)
        {
            return Err(Error::NotFound(format!(
                "variant exercise {}",
                variant_exercise_id
            )));
        }
        self.data
            .set_targets
            .extend(sets.iter().cloned().map(|target| SetTargetRow {
                variant_exercise_id,
                target,
            }));
        Ok(())
    }

    fn insert_scheduled_routine(&mut self, entry: &NewScheduledRoutine) -> Result<Uuid> {
        if !self.data.phases.iter().any(|p| p.id == entry.phase_id) {
            return Err(Error::NotFound(format!("phase {}", entry.phase_id)));
        }
        if !self.data.variants.iter().any(|v| v.id == entry.variant_id) {
            return Err(Error::NotFound(format!("variant {}", entry.variant_id)));
        }
        let id = Uuid::new_v4();
        self.data.scheduled_routines.push(ScheduledRoutineRow {
            id,
            phase_id: entry.phase_id,
            variant_id: entry.variant_id,
            scheduled_at: entry.scheduled_at,
            notes: entry.notes.clone(),
        });
        Ok(id)
    }

    fn get_program_with_blocks_and_phases(&self, id: Uuid) -> Result<Program> {
        let row = self
            .data
            .programs
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("program {}", id)))?;

        let mut blocks: Vec<Block> = self
            .data
            .blocks
            .iter()
            .filter(|b| b.program_id == id)
            .map(|b| Block {
                id: b.id,
                name: b.name.clone(),
                block_type: b.block_type,
                order_index: b.order_index,
                duration_weeks: b.duration_weeks,
                phases: self
                    .data
                    .phases
                    .iter()
                    .filter(|p| p.block_id == b.id)
                    .map(|p| self.phase_tree(p))
                    .collect(),
            })
            .collect();
        blocks.sort_by_key(|b| b.order_index);

        Ok(Program {
            id: row.id,
            name: row.name.clone(),
            description: row.description.clone(),
            goal: row.goal.clone(),
            start_date: row.start_date,
            blocks,
        })
    }

    fn list_programs(&self) -> Result<Vec<ProgramSummary>> {
        let mut rows: Vec<&ProgramRow> = self.data.programs.iter().collect();
        rows.sort_by_key(|p| p.created_at);

        Ok(rows
            .into_iter()
            .map(|p| {
                let blocks: Vec<&BlockRow> = self
                    .data
                    .blocks
                    .iter()
                    .filter(|b| b.program_id == p.id)
                    .collect();
                ProgramSummary {
                    id: p.id,
                    name: p.name.clone(),
                    start_date: p.start_date,
                    block_count: blocks.len(),
                    total_weeks: blocks.iter().map(|b| b.duration_weeks).sum(),
                }
            })
            .collect())
    }

    fn set_program_start_date(&mut self, id: Uuid, start_date: Option<NaiveDate>) -> Result<()> {
        self.program_row_mut(id)?.start_date = start_date;
        tracing::info!("Program {} start date set to {:?}", id, start_date);
        Ok(())
    }

    fn delete_program(&mut self, id: Uuid) -> Result<()> {
        let before = self.data.programs.len();
        self.data.programs.retain(|p| p.id != id);
        if self.data.programs.len() == before {
            return Err(Error::NotFound(format!("program {}", id)));
        }

        let blocks: HashSet<Uuid> = self
            .data
            .blocks
            .iter()
            .filter(|b| b.program_id == id)
            .map(|b| b.id)
            .collect();
        let phases: HashSet<Uuid> = self
            .data
            .phases
            .iter()
            .filter(|p| blocks.contains(&p.block_id))
            .map(|p| p.id)
            .collect();
        let routines: HashSet<Uuid> = self
            .data
            .routines
            .iter()
            .filter(|r| r.program_id == Some(id))
            .map(|r| r.id)
            .collect();
        let variants: HashSet<Uuid> = self
            .data
            .variants
            .iter()
            .filter(|v| routines.contains(&v.routine_id))
            .map(|v| v.id)
            .collect();
        let variant_exercises: HashSet<Uuid> = self
            .data
            .variant_exercises
            .iter()
            .filter(|e| variants.contains(&e.variant_id))
            .map(|e| e.id)
            .collect();

        self.data.blocks.retain(|b| !blocks.contains(&b.id));
        self.data.phases.retain(|p| !phases.contains(&p.id));
        self.data
            .scheduled_routines
            .retain(|s| !phases.contains(&s.phase_id) && !variants.contains(&s.variant_id));
        self.data.routines.retain(|r| !routines.contains(&r.id));
        self.data.variants.retain(|v| !variants.contains(&v.id));
        self.data
            .variant_exercises
            .retain(|e| !variant_exercises.contains(&e.id));
        self.data
            .set_targets
            .retain(|s| !variant_exercises.contains(&s.variant_exercise_id));

        tracing::info!(
            "Deleted program {} with {} blocks and {} phases",
            id,
            blocks.len(),
            phases.len()
        );
        Ok(())
    }

    fn find_exercise_by_id_or_name(&self, key: &str) -> Result<Option<ExerciseCatalogEntry>> {
        let wanted = key.trim().to_lowercase();
        Ok(self
            .data
            .exercises
            .iter()
            .find(|e| e.id == key.trim() || e.name.trim().to_lowercase() == wanted)
            .cloned())
    }

    fn list_exercises(&self) -> Result<Vec<ExerciseCatalogEntry>> {
        Ok(self.data.exercises.clone())
    }

    fn last_completed_session(&self) -> Result<Option<CompletedSession>> {
        sessions::last_completed_session(&self.sessions_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Program with one two-week block, one phase and one scheduled routine
    fn seed(gateway: &mut FileGateway) -> Uuid {
        let program_id = gateway
            .insert_program(&NewProgram {
                name: "Base".into(),
                description: None,
                goal: None,
            })
            .unwrap();
        let block_id = gateway
            .insert_block(&NewBlock {
                program_id,
                name: "Strength".into(),
                block_type: BlockType::Strength,
                order_index: 1,
                duration_weeks: 2,
            })
            .unwrap();
        let phase_id = gateway
            .insert_phase(&NewPhase {
                block_id,
                week_number: 1,
                intensity_modifier: 1.0,
                volume_modifier: 0.8,
                notes: None,
            })
            .unwrap();
        let routine_id = gateway
            .insert_routine(&NewRoutine {
                program_id: Some(program_id),
                name: "Lower".into(),
            })
            .unwrap();
        let variant_id = gateway
            .insert_variant(&NewVariant {
                routine_id,
                name: "Lower".into(),
                intensity_level: Some(3),
            })
            .unwrap();
        let exercise_row = gateway
            .insert_exercise(&NewVariantExercise {
                variant_id,
                exercise_id: "barbell_back_squat".into(),
                order_index: 1,
                reps_min: Some(5),
                reps_max: Some(5),
                notes: None,
            })
            .unwrap();
        gateway
            .insert_sets(
                exercise_row,
                &[SetTarget {
                    set_number: 1,
                    target_reps: Some(5),
                    target_weight_percent: Some(80.0),
                    target_rir: Some(2.0),
                }],
            )
            .unwrap();
        gateway
            .insert_scheduled_routine(&NewScheduledRoutine {
                phase_id,
                variant_id,
                scheduled_at: crate::dates::at_midnight(date(2024, 1, 1)),
                notes: Some("top set".into()),
            })
            .unwrap();
        program_id
    }

    #[test]
    fn test_open_seeds_catalog() {
        let temp_dir = tempfile::tempdir().unwrap();
        let gateway = FileGateway::open(temp_dir.path()).unwrap();

        assert!(!gateway.list_exercises().unwrap().is_empty());
        let found = gateway.find_exercise_by_id_or_name("bench press").unwrap();
        assert_eq!(found.unwrap().id, "bench_press");
        let found = gateway.find_exercise_by_id_or_name("pull_up").unwrap();
        assert_eq!(found.unwrap().name, "Pull-up");
        assert!(gateway.find_exercise_by_id_or_name("Squat").unwrap().is_none());
    }

    #[test]
    fn test_commit_and_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut gateway = FileGateway::open(temp_dir.path()).unwrap();
        let program_id = seed(&mut gateway);
        gateway
            .set_program_start_date(program_id, Some(date(2024, 1, 1)))
            .unwrap();
        gateway.commit().unwrap();

        let reopened = FileGateway::open(temp_dir.path()).unwrap();
        let program = reopened.get_program_with_blocks_and_phases(program_id).unwrap();
        assert_eq!(program.start_date, Some(date(2024, 1, 1)));
        assert_eq!(program.blocks.len(), 1);
        let phase = &program.blocks[0].phases[0];
        assert_eq!(phase.volume_modifier, 0.8);
        assert_eq!(phase.routines.len(), 1);
        assert_eq!(phase.routines[0].variant.intensity_level, Some(3));
        assert_eq!(phase.routines[0].notes.as_deref(), Some("top set"));

        let summaries = reopened.list_programs().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].total_weeks, 2);
    }

    #[test]
    fn test_phase_week_must_fit_block() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut gateway = FileGateway::open(temp_dir.path()).unwrap();
        let program_id = seed(&mut gateway);
        let block_id = gateway.get_program_with_blocks_and_phases(program_id).unwrap().blocks[0].id;

        let result = gateway.insert_phase(&NewPhase {
            block_id,
            week_number: 3,
            intensity_modifier: 1.0,
            volume_modifier: 1.0,
            notes: None,
        });
        assert!(matches!(result, Err(Error::Storage(_))));
    }

    #[test]
    fn test_unknown_parents_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut gateway = FileGateway::open(temp_dir.path()).unwrap();

        let result = gateway.insert_block(&NewBlock {
            program_id: Uuid::new_v4(),
            name: "Orphan".into(),
            block_type: BlockType::Peaking,
            order_index: 1,
            duration_weeks: 1,
        });
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(gateway.insert_sets(Uuid::new_v4(), &[]).is_err());
    }

    #[test]
    fn test_delete_program_cascades() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut gateway = FileGateway::open(temp_dir.path()).unwrap();
        let program_id = seed(&mut gateway);

        gateway.delete_program(program_id).unwrap();

        assert!(gateway.list_programs().unwrap().is_empty());
        assert!(gateway.data.blocks.is_empty());
        assert!(gateway.data.phases.is_empty());
        assert!(gateway.data.routines.is_empty());
        assert!(gateway.data.variants.is_empty());
        assert!(gateway.data.variant_exercises.is_empty());
        assert!(gateway.data.set_targets.is_empty());
        assert!(gateway.data.scheduled_routines.is_empty());
        assert!(matches!(
            gateway.delete_program(program_id),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_corrupted_store_starts_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join(STORE_FILE), "{ invalid json }").unwrap();

        let gateway = FileGateway::open(temp_dir.path()).unwrap();
        assert!(gateway.list_programs().unwrap().is_empty());
        assert!(!gateway.list_exercises().unwrap().is_empty());
    }

    #[test]
    fn test_corrupted_store_kept_aside_after_commit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original = br#"{"programs":[{"id":"#;
        std::fs::write(temp_dir.path().join(STORE_FILE), original).unwrap();

        let mut gateway = FileGateway::open(temp_dir.path()).unwrap();
        gateway
            .insert_program(&NewProgram {
                name: "Fresh".into(),
                description: None,
                goal: None,
            })
            .unwrap();
        gateway.commit().unwrap();

        let aside: Vec<PathBuf> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().starts_with("periodize.json.corrupt-"))
                    .unwrap_or(false)
            })
            .collect();
        assert_eq!(aside.len(), 1);
        assert_eq!(std::fs::read(&aside[0]).unwrap(), original.to_vec());

        let reopened = FileGateway::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.list_programs().unwrap()[0].name, "Fresh");
    }

    #[test]
    fn test_atomic_commit_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let gateway = FileGateway::open(temp_dir.path()).unwrap();
        gateway.commit().unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != STORE_FILE)
            .collect();
        assert!(extras.is_empty(), "Found extras: {:?}", extras);
    }
}
