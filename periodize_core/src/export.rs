//! CSV export of a program's schedule.

use crate::{Program, Result};
use std::fs::File;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    date: String,
    weekday: String,
    block: String,
    block_type: String,
    week_in_block: u32,
    routine: String,
    intensity_modifier: f64,
    volume_modifier: f64,
    notes: Option<String>,
}

/// Write every scheduled routine of `program` to a CSV file, ordered by date.
///
/// The file is replaced if it exists and synced before returning. Returns
/// the number of rows written.
pub fn export_schedule_csv(program: &Program, path: &Path) -> Result<usize> {
    let mut rows: Vec<(chrono::NaiveDateTime, CsvRow)> = Vec::new();
    for block in program.ordered_blocks() {
        for phase in block.ordered_phases() {
            for routine in &phase.routines {
                rows.push((
                    routine.scheduled_at,
                    CsvRow {
                        date: routine.scheduled_at.date().to_string(),
                        weekday: routine.scheduled_at.format("%a").to_string(),
                        block: block.name.clone(),
                        block_type: block.block_type.to_string(),
                        week_in_block: phase.week_number,
                        routine: routine.variant.name.clone(),
                        intensity_modifier: phase.intensity_modifier,
                        volume_modifier: phase.volume_modifier,
                        notes: routine.notes.clone().or_else(|| phase.notes.clone()),
                    },
                ));
            }
        }
    }
    rows.sort_by_key(|(at, _)| *at);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(file);

    for (_, row) in &rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!(
        "Exported {} scheduled routines of '{}' to {:?}",
        rows.len(),
        program.name,
        path
    );

    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::at_midnight;
    use crate::{Block, BlockType, Phase, RoutineVariantRef, ScheduledRoutine};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn scheduled(name: &str, date: NaiveDate) -> ScheduledRoutine {
        ScheduledRoutine {
            id: Uuid::new_v4(),
            variant: RoutineVariantRef {
                id: Uuid::new_v4(),
                name: name.into(),
                intensity_level: None,
            },
            scheduled_at: at_midnight(date),
            notes: None,
        }
    }

    fn program() -> Program {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        Program {
            id: Uuid::new_v4(),
            name: "Export".into(),
            description: None,
            goal: None,
            start_date: Some(d(1)),
            blocks: vec![Block {
                id: Uuid::new_v4(),
                name: "Strength".into(),
                block_type: BlockType::Strength,
                order_index: 1,
                duration_weeks: 2,
                phases: vec![
                    Phase {
                        id: Uuid::new_v4(),
                        week_number: 2,
                        intensity_modifier: 1.1,
                        volume_modifier: 0.9,
                        notes: Some("heavy".into()),
                        routines: vec![scheduled("Lower", d(8))],
                    },
                    Phase {
                        id: Uuid::new_v4(),
                        week_number: 1,
                        intensity_modifier: 1.0,
                        volume_modifier: 1.0,
                        notes: None,
                        routines: vec![scheduled("Upper", d(4)), scheduled("Lower", d(1))],
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_export_rows_sorted_by_date() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("schedule.csv");

        let count = export_schedule_csv(&program(), &path).unwrap();
        assert_eq!(count, 3);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(&records[0][0], "2024-01-01");
        assert_eq!(&records[0][1], "Mon");
        assert_eq!(&records[1][5], "Upper");
        assert_eq!(&records[2][3], "strength");
        assert_eq!(&records[2][8], "heavy");
    }

    #[test]
    fn test_export_overwrites_existing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("schedule.csv");
        std::fs::write(&path, "stale").unwrap();

        export_schedule_csv(&program(), &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("date,weekday,block"));
    }
}
