use std::collections::BTreeSet;

use crate::locations::Location;
use crate::status::normalize_status;

/// Transient search and status filter state.
///
/// The search term is stored lowercased and trimmed; status filters are
/// stored lowercased. An empty term or an empty status set matches
/// everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    search_term: String,
    status_filters: BTreeSet<String>,
}

impl FilterState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_search(mut self, term: &str) -> Self {
        self.set_search_term(term);
        self
    }

    #[must_use]
    pub fn with_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_status_filters(statuses);
        self
    }

    #[must_use]
    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = term.trim().to_lowercase();
    }

    #[must_use]
    pub fn status_filters(&self) -> &BTreeSet<String> {
        &self.status_filters
    }

    pub fn set_status_filters<I, S>(&mut self, statuses: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.status_filters = statuses
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
    }

    /// Selects `status` if it is not selected, deselects it otherwise.
    /// Returns whether the status is selected afterwards.
    pub fn toggle_status(&mut self, status: &str) -> bool {
        let normalized = status.trim().to_lowercase();
        if self.status_filters.remove(&normalized) {
            false
        } else {
            self.status_filters.insert(normalized);
            true
        }
    }

    #[must_use]
    pub fn is_status_selected(&self, status: &str) -> bool {
        self.status_filters.contains(&status.trim().to_lowercase())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search_term.is_empty() && self.status_filters.is_empty()
    }

    #[must_use]
    pub fn matches(&self, location: &Location) -> bool {
        self.matches_search(location) && self.matches_status(location)
    }

    fn matches_search(&self, location: &Location) -> bool {
        if self.search_term.is_empty() {
            return true;
        }
        location
            .searchable_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&self.search_term))
    }

    fn matches_status(&self, location: &Location) -> bool {
        self.status_filters.is_empty()
            || self
                .status_filters
                .contains(&normalize_status(location.status.as_deref()))
    }

    /// Returns the locations that pass both predicates, in input order.
    #[must_use]
    pub fn apply<'a>(&self, locations: &'a [Location]) -> Vec<&'a Location> {
        locations.iter().filter(|l| self.matches(l)).collect()
    }
}
