use chrono::NaiveDate;

use crate::data::filter::FilterState;
use crate::data::model::{CategoryColumn, CategoryValue, CustomerTable};
use crate::data::query::{
    self, canonical, CategoryCount, CategoryOrder, MeanIncome, OrderedMeans, QueryError,
    SummaryTable, UnlistedPolicy,
};

// ---------------------------------------------------------------------------
// One recomputation pass: filter state → every chart's summary table
// ---------------------------------------------------------------------------

/// Columns shown as a "mean income by category" line next to a donut.
pub const ORDERED_CATEGORIES: [CategoryColumn; 4] = [
    CategoryColumn::MaritalStatus,
    CategoryColumn::ResidenceType,
    CategoryColumn::IncomeType,
    CategoryColumn::Education,
];

/// Line + donut pair for one ordered category column.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryPanel {
    pub column: CategoryColumn,
    pub order: CategoryOrder,
    pub means: Result<OrderedMeans, QueryError>,
    pub distribution: SummaryTable<CategoryCount>,
}

/// Everything the central panel draws for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub by_date: SummaryTable<MeanIncome<NaiveDate>>,
    pub by_age: SummaryTable<MeanIncome<u32>>,
    pub categories: Vec<CategoryPanel>,
    pub by_vehicle: SummaryTable<MeanIncome<CategoryValue>>,
    pub by_property: SummaryTable<MeanIncome<CategoryValue>>,
}

impl Dashboard {
    /// Recompute every summary from the full raw table. Nothing is cached.
    pub fn compute(table: &CustomerTable, filters: &FilterState) -> Self {
        let categories = ORDERED_CATEGORIES
            .into_iter()
            .filter_map(|column| {
                let order = canonical::for_column(column)?.with_policy(filters.unlisted_policy);
                Some(CategoryPanel {
                    column,
                    means: query::mean_income_by_category_and_sex(table, column, &order),
                    distribution: query::distribution(table, column),
                    order,
                })
            })
            .collect();

        Dashboard {
            by_date: query::mean_income_by_date_and_sex(
                table,
                filters.start_date,
                filters.end_date,
            ),
            by_age: query::mean_income_by_age_and_sex(table, filters.min_age, filters.max_age),
            categories,
            by_vehicle: query::mean_income_by_column_and_sex(table, CategoryColumn::OwnsVehicle),
            by_property: query::mean_income_by_column_and_sex(table, CategoryColumn::OwnsProperty),
        }
    }
}

/// Observed values each ordered column would hide from its chart.
/// Columns with nothing to hide are left out.
pub fn unlisted_values(table: &CustomerTable) -> Vec<(CategoryColumn, Vec<CategoryValue>)> {
    ORDERED_CATEGORIES
        .into_iter()
        .filter_map(|column| {
            let order = canonical::for_column(column)?.with_policy(UnlistedPolicy::Drop);
            let dropped = query::mean_income_by_category_and_sex(table, column, &order)
                .ok()?
                .dropped;
            (!dropped.is_empty()).then_some((column, dropped))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::{customer, date, four_customers};

    #[test]
    fn full_selection_covers_every_group() {
        let table = four_customers();
        let dashboard = Dashboard::compute(&table, &FilterState::for_table(&table));

        assert_eq!(dashboard.by_date.len(), 4);
        assert_eq!(dashboard.by_age.len(), 2);
        assert_eq!(dashboard.categories.len(), ORDERED_CATEGORIES.len());
        for panel in &dashboard.categories {
            let total: usize = panel.distribution.iter().map(|c| c.count).sum();
            assert_eq!(total, table.len());
            assert!(panel.means.is_ok());
        }
        assert_eq!(dashboard.by_vehicle.len(), 2);
        assert_eq!(dashboard.by_property.len(), 2);
    }

    #[test]
    fn filters_only_touch_the_date_and_age_charts() {
        let table = four_customers();
        let everything = Dashboard::compute(&table, &FilterState::for_table(&table));

        let narrowed = FilterState {
            start_date: date(2021, 2, 1),
            min_age: 40,
            ..FilterState::for_table(&table)
        };
        let dashboard = Dashboard::compute(&table, &narrowed);

        assert_eq!(dashboard.by_date.len(), 2);
        assert!(dashboard.by_date.iter().all(|m| m.key == date(2021, 2, 1)));
        assert_eq!(dashboard.by_age.len(), 1);
        assert_eq!(dashboard.categories, everything.categories);
        assert_eq!(dashboard.by_vehicle, everything.by_vehicle);
    }

    #[test]
    fn reject_policy_reports_the_error_per_panel() {
        let mut odd = customer(9, date(2021, 1, 1), "F", 50, 10.0);
        odd.residence_type = "Barco".to_string();
        let mut records = four_customers().records().to_vec();
        records.push(odd);
        let table = CustomerTable::from_records(records);

        let filters = FilterState {
            unlisted_policy: UnlistedPolicy::Reject,
            ..FilterState::for_table(&table)
        };
        let dashboard = Dashboard::compute(&table, &filters);

        for panel in &dashboard.categories {
            let failed = panel.means.is_err();
            assert_eq!(failed, panel.column == CategoryColumn::ResidenceType);
        }
    }

    #[test]
    fn drop_policy_keeps_the_hidden_values_next_to_the_chart() {
        let mut odd = customer(9, date(2021, 1, 1), "F", 50, 10.0);
        odd.residence_type = "Barco".to_string();
        let mut records = four_customers().records().to_vec();
        records.push(odd);
        let table = CustomerTable::from_records(records);

        let dashboard = Dashboard::compute(&table, &FilterState::for_table(&table));
        let residence = dashboard
            .categories
            .iter()
            .find(|p| p.column == CategoryColumn::ResidenceType)
            .and_then(|p| p.means.as_ref().ok())
            .expect("residence panel computed");
        assert_eq!(residence.dropped, vec![CategoryValue::from("Barco")]);

        assert_eq!(
            unlisted_values(&table),
            vec![(CategoryColumn::ResidenceType, vec![CategoryValue::from("Barco")])]
        );
        assert!(unlisted_values(&four_customers()).is_empty());
    }
}
