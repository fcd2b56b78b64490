//! The map page's view model.
//!
//! [`MapView`] owns everything the page displays: the working set, the load
//! state, the filter state with its debounced search input, the selection and
//! the offline flag. Rendering reads from it; nothing here performs I/O.

use std::time::{Duration, Instant};

use chargemap_core::{
    status_color, status_text, Canvas, Debouncer, FilterState, Location, LocationId, Projection,
    StatusColor, StatusKind,
};
use serde::Serialize;

use crate::error::LoadError;
use crate::loader::LoadOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    /// The load failed; the message replaces the map.
    Failed(String),
}

/// One rendered point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub id: LocationId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub color: StatusColor,
}

/// Contents of the detail panel for the selected location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationDetail {
    pub id: LocationId,
    pub name: String,
    pub street: String,
    pub zip_code: String,
    pub city: String,
    pub status: String,
    pub color: StatusColor,
    pub max_power_kw: f64,
    pub connector_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: &'static str,
    pub color: StatusColor,
}

#[derive(Debug)]
pub struct MapView {
    locations: Vec<Location>,
    state: LoadState,
    filter: FilterState,
    search_input: Debouncer<String>,
    selected: Option<LocationId>,
    offline: bool,
    canvas: Canvas,
}

impl Default for MapView {
    fn default() -> Self {
        Self::new(chargemap_core::SEARCH_DEBOUNCE)
    }
}

impl MapView {
    /// A view in the `Loading` state whose search input settles after
    /// `search_delay`.
    #[must_use]
    pub fn new(search_delay: Duration) -> Self {
        Self {
            locations: Vec::new(),
            state: LoadState::Loading,
            filter: FilterState::new(),
            search_input: Debouncer::new(search_delay),
            selected: None,
            offline: false,
            canvas: Canvas::default(),
        }
    }

    #[must_use]
    pub fn with_canvas(mut self, canvas: Canvas) -> Self {
        self.canvas = canvas;
        self
    }

    #[must_use]
    pub fn load_state(&self) -> &LoadState {
        &self.state
    }

    /// Applies the result of the initial load. Success replaces the working
    /// set wholesale; failure keeps the previous set but switches to
    /// `Failed`.
    pub fn apply_load(&mut self, result: Result<LoadOutcome, LoadError>) {
        match result {
            Ok(outcome) => {
                tracing::debug!(
                    count = outcome.locations.len(),
                    source = ?outcome.source,
                    "working set replaced"
                );
                self.set_locations(outcome.locations);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load locations");
                self.state = LoadState::Failed(e.to_string());
            }
        }
    }

    pub fn set_locations(&mut self, locations: Vec<Location>) {
        self.locations = locations;
        self.state = LoadState::Ready;
        if let Some(id) = &self.selected {
            if !self.locations.iter().any(|l| &l.location_id == id) {
                self.selected = None;
            }
        }
    }

    #[must_use]
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    #[must_use]
    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Records raw search input. It takes effect once it has been stable for
    /// the debounce delay (see [`MapView::tick`]).
    pub fn input_search(&mut self, raw: &str, now: Instant) {
        self.search_input.push(raw.to_owned(), now);
    }

    /// Applies settled search input. Returns `true` if the search term was
    /// updated.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.search_input.poll(now) {
            Some(raw) => {
                self.filter.set_search_term(&raw);
                true
            }
            None => false,
        }
    }

    /// Applies pending search input immediately.
    pub fn flush_search(&mut self) -> bool {
        match self.search_input.flush() {
            Some(raw) => {
                self.filter.set_search_term(&raw);
                true
            }
            None => false,
        }
    }

    /// Discards pending search input; the active term is unchanged.
    pub fn cancel_search(&mut self) {
        self.search_input.cancel();
    }

    /// When the pending search input will settle, if any.
    #[must_use]
    pub fn search_deadline(&self) -> Option<Instant> {
        self.search_input.deadline()
    }

    /// Sets the search term without debouncing (e.g. from a query string).
    pub fn set_search(&mut self, term: &str) {
        self.search_input.cancel();
        self.filter.set_search_term(term);
    }

    /// Toggles a status in the toggle group. Returns whether it is now
    /// selected.
    pub fn toggle_status(&mut self, status: &str) -> bool {
        self.filter.toggle_status(status)
    }

    pub fn set_status_filters<I, S>(&mut self, statuses: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filter.set_status_filters(statuses);
    }

    #[must_use]
    pub fn filtered(&self) -> Vec<&Location> {
        self.filter.apply(&self.locations)
    }

    #[must_use]
    pub fn count_text(&self) -> String {
        format!("Showing {} locations", self.filtered().len())
    }

    /// Projection fitted to the full, unfiltered working set.
    #[must_use]
    pub fn projection(&self) -> Projection {
        Projection::fit(&self.locations, self.canvas)
    }

    /// The filtered locations as canvas points.
    #[must_use]
    pub fn points(&self) -> Vec<MapPoint> {
        let projection = self.projection();
        self.filtered()
            .into_iter()
            .map(|location| {
                let pixel = projection.project(location.coordinates);
                MapPoint {
                    id: location.location_id.clone(),
                    name: location.address.name.clone(),
                    x: pixel.x,
                    y: pixel.y,
                    color: status_color(location.status.as_deref()),
                }
            })
            .collect()
    }

    /// Selects a location for the detail panel. Returns `false`, leaving the
    /// selection unchanged, if no location has that id.
    pub fn select(&mut self, id: &LocationId) -> bool {
        if self.locations.iter().any(|l| &l.location_id == id) {
            self.selected = Some(id.clone());
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    #[must_use]
    pub fn selected_detail(&self) -> Option<LocationDetail> {
        let id = self.selected.as_ref()?;
        let location = self.locations.iter().find(|l| &l.location_id == id)?;
        let status = location.status.as_deref();
        Some(LocationDetail {
            id: location.location_id.clone(),
            name: location.address.name.clone(),
            street: location.address.street.clone(),
            zip_code: location.address.zip_code.clone(),
            city: location.address.city.clone(),
            status: status_text(status).to_owned(),
            color: status_color(status),
            max_power_kw: location.max_power,
            connector_type: location.connector_type.clone(),
        })
    }

    /// The four status colours in legend order.
    #[must_use]
    pub fn legend() -> Vec<LegendEntry> {
        StatusKind::ALL
            .iter()
            .map(|kind| LegendEntry {
                label: kind.label(),
                color: kind.color(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chargemap_core::{Address, Coordinates};

    use super::*;
    use crate::loader::LoadSource;

    fn location(id: i64, name: &str, status: Option<&str>, lat: f64, lon: f64) -> Location {
        Location {
            location_id: LocationId::Number(id),
            address: Address {
                name: name.to_owned(),
                street: format!("{name} Street 1"),
                zip_code: "10115".to_owned(),
                city: "Berlin".to_owned(),
                country_iso: "DE".to_owned(),
            },
            coordinates: Coordinates { lat, lon },
            connector_type: "CCS".to_owned(),
            status: status.map(str::to_owned),
            max_power: 150.0,
            public: true,
            kind: "fast".to_owned(),
        }
    }

    fn ready_view() -> MapView {
        let mut view = MapView::default();
        view.apply_load(Ok(LoadOutcome {
            locations: vec![
                location(1, "Alpha", Some("Available"), 10.0, 10.0),
                location(2, "Beta", Some("Suspended"), 20.0, 20.0),
            ],
            source: LoadSource::Network,
        }));
        view
    }

    #[test]
    fn starts_loading_then_ready() {
        assert_eq!(MapView::default().load_state(), &LoadState::Loading);
        assert_eq!(ready_view().load_state(), &LoadState::Ready);
    }

    #[test]
    fn failed_load_carries_message() {
        let mut view = MapView::default();
        view.apply_load(Err(LoadError::UnexpectedStatus {
            status: 500,
            url: "http://localhost:3000/api/locations".to_owned(),
        }));
        match view.load_state() {
            LoadState::Failed(message) => assert!(message.contains("failed to fetch locations")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn search_is_debounced() {
        let mut view = ready_view();
        let t0 = Instant::now();

        view.input_search("  ALP", t0);
        assert!(!view.tick(t0 + Duration::from_millis(299)));
        assert_eq!(view.filtered().len(), 2);

        view.input_search("  ALPHA ", t0 + Duration::from_millis(200));
        assert!(!view.tick(t0 + Duration::from_millis(350)));
        assert!(view.tick(t0 + Duration::from_millis(500)));

        assert_eq!(view.filter().search_term(), "alpha");
        assert_eq!(view.count_text(), "Showing 1 locations");
    }

    #[test]
    fn flush_and_cancel_search() {
        let mut view = ready_view();
        let t0 = Instant::now();

        view.input_search("beta", t0);
        assert!(view.flush_search());
        assert_eq!(view.filtered()[0].address.name, "Beta");

        view.input_search("alpha", t0);
        view.cancel_search();
        assert!(!view.tick(t0 + Duration::from_secs(1)));
        assert_eq!(view.filter().search_term(), "beta");
    }

    #[test]
    fn status_toggles_filter_points() {
        let mut view = ready_view();
        assert!(view.toggle_status("Suspended"));
        let points = view.points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].id, LocationId::Number(2));
        assert_eq!(points[0].color.rgb, "rgb(239, 68, 68)");

        assert!(!view.toggle_status("Suspended"));
        assert_eq!(view.points().len(), 2);
    }

    #[test]
    fn projection_ignores_filters() {
        let mut view = ready_view();
        let before: Vec<_> = view.points().into_iter().map(|p| (p.x, p.y)).collect();
        view.set_search("beta");
        let after = view.points();
        assert_eq!(after.len(), 1);
        assert_eq!((after[0].x, after[0].y), before[1]);
        assert_eq!(before[0], (40.0, 560.0));
        assert_eq!(before[1], (760.0, 40.0));
    }

    #[test]
    fn selection_reveals_detail() {
        let mut view = ready_view();
        assert!(view.select(&LocationId::Number(1)));
        let detail = view.selected_detail().expect("detail");
        assert_eq!(detail.name, "Alpha");
        assert_eq!(detail.status, "Available");
        assert_eq!(detail.color.class, "bg-green-500");
        assert!((detail.max_power_kw - 150.0).abs() < f64::EPSILON);

        assert!(!view.select(&LocationId::Number(99)));
        assert_eq!(view.selected_detail().map(|d| d.name), Some("Alpha".to_owned()));

        view.clear_selection();
        assert!(view.selected_detail().is_none());
    }

    #[test]
    fn detail_for_missing_status_reads_unknown() {
        let mut view = MapView::default();
        view.set_locations(vec![location(7, "Gamma", None, 0.0, 0.0)]);
        assert!(view.select(&LocationId::Number(7)));
        let detail = view.selected_detail().expect("detail");
        assert_eq!(detail.status, "Unknown");
        assert_eq!(detail.color.rgb, "rgb(107, 114, 128)");
    }

    #[test]
    fn replacing_working_set_drops_stale_selection() {
        let mut view = ready_view();
        view.select(&LocationId::Number(2));
        view.set_locations(vec![location(1, "Alpha", None, 0.0, 0.0)]);
        assert!(view.selected_detail().is_none());
    }

    #[test]
    fn legend_lists_four_statuses() {
        let labels: Vec<_> = MapView::legend().iter().map(|e| e.label).collect();
        assert_eq!(labels, vec!["Available", "In Use", "Suspended", "Unknown"]);
    }
}
