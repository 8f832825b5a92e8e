//! Search widget state: query, derived suggestions, and the card to display.
//!
//! Everything here is synchronous and owned by a single thread. Suggestions
//! are recomputed from `(query, breeds)` on every change; the dropdown may be
//! dismissed independently, in which case the list stays empty until the next
//! query change.

use tracing::debug;

use crate::breed::{popular_breed, BreedRecord};
use crate::search;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    /// Finished; holds the number of stored breeds (zero after a failed load).
    Loaded(usize),
}

/// What the result area shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Displayed<'a> {
    /// No search performed yet.
    Popular(&'a BreedRecord),
    /// First breed matching the query.
    Match(&'a BreedRecord),
    /// A search found nothing.
    Empty,
}

impl<'a> Displayed<'a> {
    pub fn record(self) -> Option<&'a BreedRecord> {
        match self {
            Displayed::Popular(record) | Displayed::Match(record) => Some(record),
            Displayed::Empty => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchState {
    breeds: Vec<BreedRecord>,
    popular: BreedRecord,
    query: String,
    suggestions: Vec<String>,
    highlighted: Option<usize>,
    show_results: bool,
    search_performed: bool,
    load: LoadState,
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchState {
    pub fn new() -> Self {
        Self {
            breeds: Vec::new(),
            popular: popular_breed(),
            query: String::new(),
            suggestions: Vec::new(),
            highlighted: None,
            show_results: false,
            search_performed: false,
            load: LoadState::Pending,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn highlighted_suggestion(&self) -> Option<&str> {
        self.highlighted
            .and_then(|index| self.suggestions.get(index))
            .map(String::as_str)
    }

    pub fn show_results(&self) -> bool {
        self.show_results
    }

    pub fn search_performed(&self) -> bool {
        self.search_performed
    }

    pub fn load_state(&self) -> LoadState {
        self.load
    }

    /// Store the loaded breed list. Only the first call has any effect.
    pub fn finish_load(&mut self, breeds: Vec<BreedRecord>) {
        if self.load != LoadState::Pending {
            debug!("ignoring repeated breed load");
            return;
        }
        self.load = LoadState::Loaded(breeds.len());
        self.breeds = breeds;
        self.refresh_suggestions();
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        if query == self.query {
            return;
        }
        self.query = query;
        self.refresh_suggestions();
    }

    fn refresh_suggestions(&mut self) {
        self.suggestions = search::suggestions(&self.breeds, &self.query);
        self.highlighted = None;
    }

    /// Returns `false` (and changes nothing) for a blank query.
    pub fn execute_search(&mut self) -> bool {
        if self.query.trim().is_empty() {
            return false;
        }
        self.show_results = true;
        self.search_performed = true;
        true
    }

    pub fn select_suggestion(&mut self, name: &str) {
        self.set_query(name);
        self.show_results = true;
        self.search_performed = true;
    }

    /// Select the highlighted suggestion if there is one, otherwise search.
    pub fn confirm(&mut self) -> bool {
        if let Some(name) = self.highlighted_suggestion().map(str::to_owned) {
            self.select_suggestion(&name);
            return true;
        }
        self.execute_search()
    }

    pub fn dismiss_suggestions(&mut self) {
        self.suggestions.clear();
        self.highlighted = None;
    }

    pub fn highlight_next(&mut self) {
        if self.suggestions.is_empty() {
            return;
        }
        self.highlighted = Some(match self.highlighted {
            Some(index) => (index + 1) % self.suggestions.len(),
            None => 0,
        });
    }

    pub fn highlight_prev(&mut self) {
        if self.suggestions.is_empty() {
            return;
        }
        let last = self.suggestions.len() - 1;
        self.highlighted = Some(match self.highlighted {
            Some(0) | None => last,
            Some(index) => index - 1,
        });
    }

    pub fn displayed(&self) -> Displayed<'_> {
        if !self.search_performed {
            return Displayed::Popular(&self.popular);
        }
        if !self.show_results {
            return Displayed::Empty;
        }
        match search::first_match(&self.breeds, &self.query) {
            Some(record) => Displayed::Match(record),
            None => Displayed::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breed::breed;

    fn loaded(names: &[&str]) -> SearchState {
        let mut state = SearchState::new();
        let breeds = names
            .iter()
            .enumerate()
            .map(|(index, name)| breed(index as u64 + 1, name))
            .collect();
        state.finish_load(breeds);
        state
    }

    #[test]
    fn popular_breed_shown_before_any_search() {
        let state = loaded(&["Pug", "Poodle"]);
        match state.displayed() {
            Displayed::Popular(record) => assert_eq!(record.name, "Labrador Retriever"),
            other => panic!("unexpected display: {other:?}"),
        }

        let empty = SearchState::new();
        assert_eq!(
            empty.displayed().record().map(|r| r.name.as_str()),
            Some("Labrador Retriever")
        );
    }

    #[test]
    fn typing_does_not_perform_search() {
        let mut state = loaded(&["Pug", "Poodle"]);
        state.set_query("oo");

        assert_eq!(state.suggestions(), ["Poodle"]);
        assert!(!state.search_performed());
        assert!(matches!(state.displayed(), Displayed::Popular(_)));
    }

    #[test]
    fn search_shows_first_match() {
        let mut state = loaded(&["Pug", "Poodle"]);
        state.set_query("oo");

        assert!(state.execute_search());
        assert!(state.show_results());
        match state.displayed() {
            Displayed::Match(record) => {
                assert_eq!(record.name, "Poodle");
                assert_eq!(record.id, 2);
            }
            other => panic!("unexpected display: {other:?}"),
        }
    }

    #[test]
    fn search_without_matches_shows_nothing() {
        let mut state = loaded(&["Pug", "Poodle"]);
        state.set_query("zz");

        assert!(state.execute_search());
        assert_eq!(state.displayed(), Displayed::Empty);
    }

    #[test]
    fn blank_search_is_a_no_op() {
        let mut state = loaded(&["Pug"]);
        state.set_query("   ");

        assert!(!state.execute_search());
        assert!(!state.search_performed());
        assert!(!state.show_results());
    }

    #[test]
    fn search_performed_never_resets() {
        let mut state = loaded(&["Pug"]);
        state.set_query("pug");
        state.execute_search();
        state.set_query("");

        assert!(state.search_performed());
        assert!(!state.execute_search());
        assert!(state.search_performed());
    }

    #[test]
    fn selecting_suggestion_searches_it() {
        let mut state = loaded(&["Pug", "Poodle", "Toy Poodle"]);
        state.set_query("poo");
        state.select_suggestion("Toy Poodle");

        assert_eq!(state.query(), "Toy Poodle");
        assert!(state.search_performed());
        assert_eq!(
            state.displayed().record().map(|r| r.name.as_str()),
            Some("Toy Poodle")
        );
    }

    #[test]
    fn selected_name_matches_earlier_superstring() {
        let mut state = loaded(&["Miniature Poodle", "Poodle"]);
        state.select_suggestion("Poodle");

        assert_eq!(
            state.displayed().record().map(|r| r.name.as_str()),
            Some("Miniature Poodle")
        );
    }

    #[test]
    fn suggestions_follow_late_load() {
        let mut state = SearchState::new();
        state.set_query("pu");
        assert!(state.suggestions().is_empty());

        state.finish_load(vec![breed(1, "Pug")]);
        assert_eq!(state.suggestions(), ["Pug"]);
        assert_eq!(state.load_state(), LoadState::Loaded(1));
    }

    #[test]
    fn only_first_load_is_stored() {
        let mut state = loaded(&["Pug"]);
        state.finish_load(vec![breed(9, "Beagle"), breed(10, "Boxer")]);

        assert_eq!(state.breeds.len(), 1);
        assert_eq!(state.load_state(), LoadState::Loaded(1));
    }

    #[test]
    fn dismissed_suggestions_return_on_next_edit() {
        let mut state = loaded(&["Pug", "Poodle"]);
        state.set_query("p");
        state.dismiss_suggestions();
        assert!(state.suggestions().is_empty());

        state.set_query("po");
        assert_eq!(state.suggestions(), ["Poodle"]);
    }

    #[test]
    fn highlight_wraps_and_confirm_selects() {
        let mut state = loaded(&["Pug", "Poodle"]);
        state.set_query("p");

        state.highlight_prev();
        assert_eq!(state.highlighted_suggestion(), Some("Poodle"));
        state.highlight_next();
        assert_eq!(state.highlighted_suggestion(), Some("Pug"));

        assert!(state.confirm());
        assert_eq!(state.query(), "Pug");
        assert_eq!(state.highlighted(), None);
        assert_eq!(
            state.displayed().record().map(|r| r.name.as_str()),
            Some("Pug")
        );
    }

    #[test]
    fn confirm_without_highlight_searches_query() {
        let mut state = loaded(&["Pug", "Poodle"]);
        state.set_query("oodle");

        assert!(state.confirm());
        assert_eq!(state.query(), "oodle");
        assert_eq!(
            state.displayed().record().map(|r| r.name.as_str()),
            Some("Poodle")
        );
    }
}
