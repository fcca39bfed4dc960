use std::path::Path;

use anyhow::{Context, Result};

use crate::color::ColorMap;
use crate::dashboard::unlisted_values;
use crate::data::filter::{FilterBounds, FilterState};
use crate::data::loader::load_file;
use crate::data::model::{CategoryColumn, CustomerTable};
use crate::data::query::join_values;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded dataset (None until a file loads).
    pub dataset: Option<CustomerTable>,

    /// Widget bounds of the loaded dataset.
    pub bounds: FilterBounds,

    /// Current filter selections.
    pub filters: FilterState,

    /// Colour per sex, shared by every chart.
    pub sex_colors: ColorMap,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            dataset: None,
            bounds: FilterBounds {
                dates: None,
                ages: None,
            },
            filters: FilterState::default(),
            sex_colors: ColorMap::new(Vec::<String>::new()),
            status_message: None,
        }
    }
}

impl AppState {
    pub fn with_dataset(dataset: CustomerTable) -> Self {
        let mut state = Self::default();
        state.set_dataset(dataset);
        state
    }

    /// Ingest a newly loaded dataset, reset filters to select everything.
    pub fn set_dataset(&mut self, dataset: CustomerTable) {
        self.bounds = FilterBounds::of(&dataset);
        self.filters = FilterState::for_table(&dataset);
        self.sex_colors = ColorMap::new(
            dataset
                .observed_values(CategoryColumn::Sex)
                .iter()
                .map(|v| v.to_string()),
        );
        for (column, values) in unlisted_values(&dataset) {
            log::warn!(
                "{column}: values outside the chart order are hidden: {}",
                join_values(&values)
            );
        }
        self.status_message = if dataset.is_empty() {
            log::warn!("Loaded dataset has no customers");
            Some("Dataset has no customers".to_string())
        } else {
            None
        };
        self.dataset = Some(dataset);
    }

    /// Replace the dataset with the contents of `path`.
    ///
    /// On failure the current dataset stays loaded and the error is shown.
    pub fn load_from(&mut self, path: &Path) -> Result<()> {
        match load_file(path).with_context(|| format!("loading {}", path.display())) {
            Ok(dataset) => {
                log::info!("Loaded {} customers from {}", dataset.len(), path.display());
                self.set_dataset(dataset);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
                Err(e)
            }
        }
    }

    /// Replace the filters after a widget changed, keeping them in bounds.
    pub fn update_filters(&mut self, mut filters: FilterState) {
        filters.clamp_to(&self.bounds);
        if filters != self.filters {
            log::debug!("filters changed: {filters:?}");
            self.filters = filters;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::LoadError;
    use crate::data::model::fixtures::{date, four_customers};

    #[test]
    fn set_dataset_selects_everything() {
        let state = AppState::with_dataset(four_customers());
        assert_eq!(state.filters, FilterState::for_table(&four_customers()));
        assert_eq!(state.bounds.ages, Some((30, 40)));
        assert_ne!(state.sex_colors.color_for("F"), state.sex_colors.color_for("M"));
    }

    #[test]
    fn empty_dataset_is_flagged_in_the_status_line() {
        let state = AppState::with_dataset(CustomerTable::default());
        assert_eq!(state.status_message.as_deref(), Some("Dataset has no customers"));
        assert!(AppState::with_dataset(four_customers()).status_message.is_none());
    }

    #[test]
    fn failed_load_keeps_previous_dataset() {
        let mut state = AppState::with_dataset(four_customers());
        let err = state
            .load_from(Path::new("/no/such/dir/customers.csv"))
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<LoadError>(), Some(LoadError::NotFound(_))));
        assert_eq!(state.dataset.as_ref().map(|d| d.len()), Some(4));
        assert!(state
            .status_message
            .as_deref()
            .is_some_and(|m| m.contains("dataset not found")));
    }

    #[test]
    fn update_filters_clamps_to_bounds() {
        let mut state = AppState::with_dataset(four_customers());
        let mut filters = state.filters.clone();
        filters.end_date = date(2099, 1, 1);
        filters.max_age = 200;
        state.update_filters(filters);
        assert_eq!(state.filters.end_date, date(2021, 2, 1));
        assert_eq!(state.filters.max_age, 40);
    }
}
