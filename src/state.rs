use std::sync::Arc;

use chrono::NaiveDate;

use crate::data::archive::{ArchiveClient, SeriesVariant};
use crate::data::loader;
use crate::data::lookup;
use crate::data::model::{GlacierRecord, GlacierTable, TimeSeriesBundle};
use crate::error::{Result, SnowlineError};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Selection lists longer than this ask the user to refine instead.
pub const MAX_CANDIDATES: usize = 100;

/// Which central view is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Map,
    Plots,
}

/// The full UI state, independent of rendering.
///
/// Every user action maps to one handler method taking the current state
/// and input; rendering code only reads state and routes events here.
pub struct AppState {
    /// Loaded glacier table (None when loading failed).
    pub table: Option<GlacierTable>,

    /// Why the table is unavailable, if it is.
    pub table_error: Option<String>,

    /// Remote archive client; owns all fetch caches.
    pub archive: ArchiveClient,

    pub view: View,

    /// Free-text search box contents.
    pub search_input: String,

    /// Coordinate query box contents (`"lat,lon"`).
    pub coordinate_input: String,

    /// Disambiguation list: table indices awaiting a user choice.
    pub candidates: Vec<usize>,

    /// Resolved glacier (table index).
    pub selected: Option<usize>,

    /// Fetched time series for the selected glacier.
    pub bundle: Option<Arc<TimeSeriesBundle>>,

    /// Plot date range, half-open `[start, end)`.
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,

    /// End-of-season correction and bin-mode switches.
    pub variant: SeriesVariant,

    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,

    /// Bumped whenever plot inputs change; the plot view rebuilds its
    /// textures when its cached revision falls behind.
    pub plot_revision: u64,

    /// Textures and curves built by the plot view for `plot_revision`.
    pub plot_cache: Option<crate::ui::plot::PlotCache>,
}

impl AppState {
    pub fn date_min() -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 1, 1).unwrap()
    }

    pub fn date_max() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    /// Load the glacier table from `table_source` and set up an archive
    /// client. A failed table load is recorded, not fatal: the UI surfaces
    /// a loading error and lookup stays unavailable.
    pub fn new(table_source: &str, archive: ArchiveClient) -> Self {
        let (table, table_error) = match loader::load_table(table_source) {
            Ok(table) => {
                log::info!("loaded glacier table: {} records", table.len());
                (Some(table), None)
            }
            Err(e) => {
                log::error!("failed to load glacier table: {e:#}");
                (None, Some(format!("{e:#}")))
            }
        };

        AppState {
            table,
            table_error,
            archive,
            view: View::Map,
            search_input: String::new(),
            coordinate_input: String::new(),
            candidates: Vec::new(),
            selected: None,
            bundle: None,
            date_start: NaiveDate::from_ymd_opt(2017, 1, 1).unwrap(),
            date_end: Self::date_max(),
            variant: SeriesVariant::default(),
            status_message: None,
            plot_revision: 0,
            plot_cache: None,
        }
    }

    pub fn selected_record(&self) -> Option<&GlacierRecord> {
        let table = self.table.as_ref()?;
        table.get(self.selected?)
    }

    fn invalidate_plots(&mut self) {
        self.plot_revision += 1;
    }

    fn report(&mut self, err: &SnowlineError) {
        log::error!("{err}");
        let user_facing =
            err.is_not_found() || matches!(err, SnowlineError::InvalidCoordinate(_));
        self.status_message = Some(if user_facing {
            format!("{err}")
        } else {
            format!("Error: {err}")
        });
    }

    // -----------------------------------------------------------------------
    // Request handlers, one per user action
    // -----------------------------------------------------------------------

    /// Free-text search submitted.
    pub fn handle_search(&mut self) {
        self.status_message = None;
        self.candidates.clear();

        let matches = match &self.table {
            Some(table) => lookup::search(table, &self.search_input),
            None => {
                self.report(&SnowlineError::TableUnavailable);
                return;
            }
        };

        match matches.len() {
            0 => self.status_message = Some("No matching glacier found.".to_string()),
            1 => self.handle_select(matches[0]),
            n if n > MAX_CANDIDATES => {
                self.status_message =
                    Some(format!("Found {n} matches. Please refine the search."));
            }
            n => {
                self.status_message =
                    Some(format!("Found {n} possible matches. Please choose one:"));
                self.candidates = matches;
            }
        }
    }

    /// Coordinate query submitted.
    pub fn handle_coordinate_query(&mut self) {
        self.status_message = None;
        self.candidates.clear();

        let (lat, lon) = match lookup::parse_coordinate(&self.coordinate_input) {
            Ok(parsed) => parsed,
            Err(e) => return self.report(&e),
        };

        let nearest = match &self.table {
            Some(table) => lookup::nearest(table, lat, lon),
            None => {
                self.report(&SnowlineError::TableUnavailable);
                return;
            }
        };

        if nearest.is_empty() {
            self.status_message = Some("No matching glacier found.".to_string());
        } else {
            self.status_message = Some("Nearest glaciers, closest first:".to_string());
            self.candidates = nearest;
        }
    }

    /// A glacier picked from the map, a unique search hit or the
    /// disambiguation list.
    pub fn handle_select(&mut self, index: usize) {
        let Some(record) = self.table.as_ref().and_then(|t| t.get(index)) else {
            return;
        };
        let label = record.label();

        self.selected = Some(index);
        self.status_message = Some(format!("Matched glacier: {label}"));
        self.fetch_selected();
    }

    /// Variant toggles changed; the bundle content depends on them.
    pub fn handle_variant_change(&mut self, variant: SeriesVariant) {
        if self.variant == variant {
            return;
        }
        self.variant = variant;
        if self.selected.is_some() {
            self.fetch_selected();
        }
    }

    /// Date range changed.
    pub fn handle_date_range(&mut self, start: NaiveDate, end: NaiveDate) {
        if start == self.date_start && end == self.date_end {
            return;
        }
        self.date_start = start;
        self.date_end = end.max(start);
        self.invalidate_plots();
    }

    pub fn handle_view_change(&mut self, view: View) {
        self.view = view;
    }

    /// Blocking fetch of the selected glacier's bundle.
    fn fetch_selected(&mut self) {
        let Some(number) = self.selected_record().map(|r| r.number()) else {
            return;
        };

        match self.archive.fetch_bundle(&number, self.variant) {
            Ok(bundle) => {
                self.bundle = Some(bundle);
                self.view = View::Plots;
                self.invalidate_plots();
            }
            Err(e) => {
                self.bundle = None;
                self.report(&e);
            }
        }
    }

    /// Raw archive bytes for the download button: suggested file name
    /// plus the inner zip contents.
    pub fn raw_download(&mut self) -> Result<(String, Arc<Vec<u8>>)> {
        let number = self
            .selected_record()
            .map(|r| r.number())
            .ok_or(SnowlineError::TableUnavailable)?;
        let bytes = self.archive.fetch_raw(&number)?;
        Ok((format!("{number}.zip"), bytes))
    }

    /// Animation archive bytes for the download button.
    pub fn animation_download(&mut self) -> Result<(String, Arc<Vec<u8>>)> {
        let (name, number) = self
            .selected_record()
            .map(|r| (r.glac_name.clone(), r.number()))
            .ok_or(SnowlineError::TableUnavailable)?;
        let bytes = self.archive.fetch_animation(&name)?;
        Ok((format!("{number}_animation.zip"), bytes))
    }

    /// Route a fetch error through the status bar (for UI callers).
    pub fn report_error(&mut self, err: &SnowlineError) {
        self.report(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn state_with_table() -> AppState {
        let csv = "\
rgi_id,glac_name,cenlat,cenlon,area_km2
RGI2000-v7.0-G-01-00013,Gulkana Glacier,63.28,-145.42,18.2
RGI2000-v7.0-G-01-00020,Kennicott Glacier,61.60,-143.00,100.0
RGI2000-v7.0-G-01-00031,Matanuska Glacier,61.75,-147.80,60.0
";
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glaciers.csv");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(csv.as_bytes())
            .unwrap();

        AppState::new(
            path.to_str().unwrap(),
            ArchiveClient::new("http://127.0.0.1:9").unwrap(),
        )
    }

    #[test]
    fn search_with_no_match_reports_not_found() {
        let mut state = state_with_table();
        state.search_input = "zzz".to_string();
        state.handle_search();

        assert!(state.candidates.is_empty());
        assert_eq!(
            state.status_message.as_deref(),
            Some("No matching glacier found.")
        );
    }

    #[test]
    fn ambiguous_search_fills_the_candidate_list() {
        let mut state = state_with_table();
        state.search_input = "glacier".to_string();
        state.handle_search();

        assert_eq!(state.candidates.len(), 3);
        assert!(state.selected.is_none());
    }

    #[test]
    fn coordinate_query_lists_nearest_records() {
        let mut state = state_with_table();
        state.coordinate_input = "63.28,-145.42".to_string();
        state.handle_coordinate_query();

        assert_eq!(state.candidates.len(), 3);
        // Gulkana is at the query point.
        assert_eq!(state.candidates[0], 0);
    }

    #[test]
    fn malformed_coordinates_are_an_input_error() {
        let mut state = state_with_table();
        state.coordinate_input = "not,a,number".to_string();
        state.handle_coordinate_query();

        assert!(state.candidates.is_empty());
        let msg = state.status_message.unwrap();
        assert!(msg.contains("not,a,number"));
        assert!(!msg.starts_with("Error:"));
    }

    #[test]
    fn missing_table_surfaces_a_loading_error() {
        let mut state = AppState::new(
            "/nonexistent/glaciers.csv",
            ArchiveClient::new("http://127.0.0.1:9").unwrap(),
        );
        assert!(state.table_error.is_some());

        state.search_input = "Gulkana".to_string();
        state.handle_search();
        let msg = state.status_message.unwrap();
        assert!(msg.contains("glacier table is not loaded"));
    }

    #[test]
    fn date_range_change_bumps_the_plot_revision() {
        let mut state = state_with_table();
        let before = state.plot_revision;
        state.handle_date_range(
            NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        );
        assert_eq!(state.plot_revision, before + 1);

        // Same range again is a no-op.
        let after = state.plot_revision;
        state.handle_date_range(state.date_start, state.date_end);
        assert_eq!(state.plot_revision, after);
    }
}
