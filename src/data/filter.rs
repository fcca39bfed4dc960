use chrono::NaiveDate;

use super::model::CustomerTable;
use super::query::{age_bounds, UnlistedPolicy};

// ---------------------------------------------------------------------------
// Filter state: what the user currently selected in the side panel
// ---------------------------------------------------------------------------

/// Explicit value object holding every user-controlled filter.
///
/// Inverted ranges (`start_date > end_date`, `min_age > max_age`) are legal
/// and simply select nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub min_age: u32,
    pub max_age: u32,
    /// Show every raw row instead of the first few.
    pub expand_raw_table: bool,
    /// How category charts treat values missing from their canonical order.
    pub unlisted_policy: UnlistedPolicy,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::MIN,
            end_date: NaiveDate::MAX,
            min_age: 0,
            max_age: u32::MAX,
            expand_raw_table: false,
            unlisted_policy: UnlistedPolicy::default(),
        }
    }
}

/// Widget bounds derived from a loaded table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterBounds {
    pub dates: Option<(NaiveDate, NaiveDate)>,
    pub ages: Option<(u32, u32)>,
}

impl FilterBounds {
    pub fn of(table: &CustomerTable) -> Self {
        Self {
            dates: table.date_range(),
            ages: age_bounds(table),
        }
    }
}

impl FilterState {
    /// Select everything: the full date range and the full grouped-age range.
    pub fn for_table(table: &CustomerTable) -> Self {
        let mut state = Self::default();
        let bounds = FilterBounds::of(table);
        if let Some((min, max)) = bounds.dates {
            state.start_date = min;
            state.end_date = max;
        }
        if let Some((min, max)) = bounds.ages {
            state.min_age = min;
            state.max_age = max;
        }
        state
    }

    /// Pull every value back inside `bounds`; an inverted selection stays inverted.
    pub fn clamp_to(&mut self, bounds: &FilterBounds) {
        if let Some((min, max)) = bounds.dates {
            self.start_date = self.start_date.clamp(min, max);
            self.end_date = self.end_date.clamp(min, max);
        }
        if let Some((min, max)) = bounds.ages {
            self.min_age = self.min_age.clamp(min, max);
            self.max_age = self.max_age.clamp(min, max);
        }
    }

    pub fn dates_inverted(&self) -> bool {
        self.start_date > self.end_date
    }

    pub fn ages_inverted(&self) -> bool {
        self.min_age > self.max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::{date, four_customers};

    #[test]
    fn for_table_selects_everything() {
        let state = FilterState::for_table(&four_customers());
        assert_eq!(state.start_date, date(2021, 1, 1));
        assert_eq!(state.end_date, date(2021, 2, 1));
        assert_eq!((state.min_age, state.max_age), (30, 40));
        assert!(!state.expand_raw_table);
        assert_eq!(state.unlisted_policy, UnlistedPolicy::Drop);
    }

    #[test]
    fn for_empty_table_falls_back_to_open_ranges() {
        let state = FilterState::for_table(&CustomerTable::default());
        assert_eq!(state, FilterState::default());
    }

    #[test]
    fn clamp_keeps_values_inside_bounds() {
        let table = four_customers();
        let bounds = FilterBounds::of(&table);
        let mut state = FilterState {
            start_date: date(2020, 1, 1),
            end_date: date(2030, 1, 1),
            min_age: 1,
            max_age: 120,
            ..FilterState::default()
        };
        state.clamp_to(&bounds);
        assert_eq!(state, FilterState::for_table(&table));
    }

    #[test]
    fn clamp_preserves_inversion() {
        let bounds = FilterBounds::of(&four_customers());
        let mut state = FilterState {
            start_date: date(2021, 2, 1),
            end_date: date(2021, 1, 1),
            min_age: 40,
            max_age: 30,
            ..FilterState::default()
        };
        state.clamp_to(&bounds);
        assert!(state.dates_inverted());
        assert!(state.ages_inverted());
    }
}
