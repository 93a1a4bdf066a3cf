//! Default exercise catalog.
//!
//! Seeds a fresh store so imported programs can resolve common lift names.

use crate::ExerciseCatalogEntry;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Vec<ExerciseCatalogEntry>> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn default_catalog() -> &'static [ExerciseCatalogEntry] {
    &DEFAULT_CATALOG
}

/// Builds the default catalog.
///
/// Names are deliberately specific ("Barbell Back Squat" rather than
/// "Squat") since the fuzzy matcher also accepts catalog names that appear
/// inside an imported name.
pub fn build_default_catalog() -> Vec<ExerciseCatalogEntry> {
    [
        // Squat pattern
        ("barbell_back_squat", "Barbell Back Squat"),
        ("barbell_front_squat", "Barbell Front Squat"),
        ("goblet_squat", "Goblet Squat"),
        ("bulgarian_split_squat", "Bulgarian Split Squat"),
        ("leg_press", "Leg Press"),
        // Hinge pattern
        ("conventional_deadlift", "Conventional Deadlift"),
        ("sumo_deadlift", "Sumo Deadlift"),
        ("romanian_deadlift", "Romanian Deadlift"),
        ("hip_thrust", "Barbell Hip Thrust"),
        ("kettlebell_swing", "Kettlebell Swing"),
        // Push
        ("bench_press", "Bench Press"),
        ("incline_bench_press", "Incline Bench Press"),
        ("dumbbell_bench_press", "Dumbbell Bench Press"),
        ("overhead_press", "Overhead Press"),
        ("parallel_bar_dip", "Parallel Bar Dip"),
        ("push_up", "Push-up"),
        // Pull
        ("pull_up", "Pull-up"),
        ("chin_up", "Chin-up"),
        ("barbell_row", "Barbell Row"),
        ("one_arm_dumbbell_row", "One-Arm Dumbbell Row"),
        ("lat_pulldown", "Lat Pulldown"),
        ("face_pull", "Face Pull"),
        // Accessories
        ("barbell_curl", "Barbell Curl"),
        ("triceps_pushdown", "Triceps Pushdown"),
        ("lateral_raise", "Dumbbell Lateral Raise"),
        ("leg_curl", "Lying Leg Curl"),
        ("leg_extension", "Leg Extension"),
        ("standing_calf_raise", "Standing Calf Raise"),
        ("plank", "Plank"),
        ("hanging_leg_raise", "Hanging Leg Raise"),
    ]
    .into_iter()
    .map(|(id, name)| ExerciseCatalogEntry {
        id: id.into(),
        name: name.into(),
    })
    .collect()
}

/// Validate a catalog for consistency
///
/// Returns a list of validation errors, or empty Vec if valid.
pub fn validate(catalog: &[ExerciseCatalogEntry]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut ids = HashSet::new();
    let mut names = HashSet::new();

    for entry in catalog {
        if entry.id.trim().is_empty() {
            errors.push(format!("Exercise '{}' has empty ID", entry.name));
        } else if !ids.insert(entry.id.as_str()) {
            errors.push(format!("Duplicate exercise ID '{}'", entry.id));
        }

        let name = entry.name.trim().to_lowercase();
        if name.is_empty() {
            errors.push(format!("Exercise '{}' has empty name", entry.id));
        } else if !names.insert(name) {
            errors.push(format!("Duplicate exercise name '{}'", entry.name));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{match_exercise, MatchKind};

    #[test]
    fn test_default_catalog_validates() {
        let errors = validate(default_catalog());
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_validate_reports_duplicates_and_blanks() {
        let catalog = vec![
            ExerciseCatalogEntry {
                id: "a".into(),
                name: "Row".into(),
            },
            ExerciseCatalogEntry {
                id: "a".into(),
                name: "row".into(),
            },
            ExerciseCatalogEntry {
                id: "".into(),
                name: " ".into(),
            },
        ];
        assert_eq!(validate(&catalog).len(), 4);
    }

    #[test]
    fn test_common_names_resolve() {
        let catalog = default_catalog();

        let squat = match_exercise("Squat", catalog).unwrap();
        assert_eq!(squat.id(), "barbell_back_squat");
        assert_eq!(squat.kind, MatchKind::Partial);

        let bench = match_exercise("bench press", catalog).unwrap();
        assert_eq!(bench.id(), "bench_press");
        assert_eq!(bench.kind, MatchKind::Exact);

        assert!(match_exercise("Nordic Curl", catalog).is_none());
    }
}
