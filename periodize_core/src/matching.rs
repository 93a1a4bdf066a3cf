//! Exercise name resolution against the catalog.
//!
//! The expander only talks to [`ExerciseMatcher`], so a stricter strategy can
//! replace [`SubstringMatcher`] without touching expansion.

use crate::ExerciseCatalogEntry;

/// Which pass produced a match
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchKind {
    /// Case-insensitive equality
    Exact,
    /// One name contains the other
    Partial,
}

/// A catalog entry chosen for an imported exercise name
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExerciseMatch<'a> {
    pub entry: &'a ExerciseCatalogEntry,
    pub kind: MatchKind,
}

impl ExerciseMatch<'_> {
    pub fn id(&self) -> &str {
        &self.entry.id
    }
}

/// Strategy for mapping an imported exercise name to a catalog entry
pub trait ExerciseMatcher {
    fn match_exercise<'a>(
        &self,
        name: &str,
        catalog: &'a [ExerciseCatalogEntry],
    ) -> Option<ExerciseMatch<'a>>;
}

/// Two-pass matcher: exact name first, then substring inclusion either way.
///
/// Both passes ignore case and surrounding whitespace. Within a pass the
/// first catalog entry that matches wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubstringMatcher;

impl ExerciseMatcher for SubstringMatcher {
    fn match_exercise<'a>(
        &self,
        name: &str,
        catalog: &'a [ExerciseCatalogEntry],
    ) -> Option<ExerciseMatch<'a>> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }

        let normalized: Vec<String> = catalog
            .iter()
            .map(|e| e.name.trim().to_lowercase())
            .collect();

        if let Some(idx) = normalized.iter().position(|n| *n == wanted) {
            return Some(ExerciseMatch {
                entry: &catalog[idx],
                kind: MatchKind::Exact,
            });
        }

        normalized
            .iter()
            .position(|n| !n.is_empty() && (n.contains(&wanted) || wanted.contains(n.as_str())))
            .map(|idx| {
                tracing::debug!(
                    "Fuzzy matched exercise '{}' to '{}'",
                    name,
                    catalog[idx].name
                );
                ExerciseMatch {
                    entry: &catalog[idx],
                    kind: MatchKind::Partial,
                }
            })
    }
}

/// Resolve `name` with the default two-pass matcher
pub fn match_exercise<'a>(
    name: &str,
    catalog: &'a [ExerciseCatalogEntry],
) -> Option<ExerciseMatch<'a>> {
    SubstringMatcher.match_exercise(name, catalog)
}
