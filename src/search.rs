use crate::breed::BreedRecord;

/// Lowercase a string for case-insensitive matching.
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
}

/// Returns the normalized query, or `None` when it is blank.
///
/// Trimming only decides blankness; the surrounding whitespace of a non-blank
/// query takes part in matching.
pub fn normalize_query(query: &str) -> Option<String> {
    if query.trim().is_empty() {
        None
    } else {
        Some(normalize(query))
    }
}

pub fn name_matches(name: &str, normalized_query: &str) -> bool {
    normalize(name).contains(normalized_query)
}

/// Names of every breed containing `query`, in breed-list order.
pub fn suggestions(breeds: &[BreedRecord], query: &str) -> Vec<String> {
    let Some(needle) = normalize_query(query) else {
        return Vec::new();
    };
    breeds
        .iter()
        .filter(|breed| name_matches(&breed.name, &needle))
        .map(|breed| breed.name.clone())
        .collect()
}

/// First breed whose name contains `query`.
///
/// Unlike [`suggestions`], a blank query is not special-cased: an empty
/// needle matches the first breed.
pub fn first_match<'a>(breeds: &'a [BreedRecord], query: &str) -> Option<&'a BreedRecord> {
    let needle = normalize(query);
    breeds.iter().find(|breed| name_matches(&breed.name, &needle))
}
