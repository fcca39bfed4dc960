use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use thiserror::Error;

use super::model::{CategoryColumn, CategoryValue, CustomerTable};

// ---------------------------------------------------------------------------
// Summary tables – the chart-ready results
// ---------------------------------------------------------------------------

/// A small derived table handed to a chart. Rows are kept in chart order.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable<R> {
    rows: Vec<R>,
}

impl<R> SummaryTable<R> {
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }
}

impl<R> Default for SummaryTable<R> {
    fn default() -> Self {
        SummaryTable { rows: Vec::new() }
    }
}

impl<R> FromIterator<R> for SummaryTable<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        SummaryTable {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'a, R> IntoIterator for &'a SummaryTable<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Mean income of one (key, sex) group. Only non-empty groups exist.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanIncome<K> {
    pub key: K,
    pub sex: String,
    pub mean_income: f64,
    /// Number of customers averaged.
    pub customers: usize,
}

/// Category means in canonical order, plus the observed values the order
/// left out.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMeans {
    pub table: SummaryTable<MeanIncome<CategoryValue>>,
    /// Values present in the data but not in the order, sorted. Always
    /// empty under [`UnlistedPolicy::Reject`].
    pub dropped: Vec<CategoryValue>,
}

/// Occurrences of one category value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub value: CategoryValue,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("{column}: values not in the canonical order: {}", join_values(.values))]
    UnknownCategory {
        column: CategoryColumn,
        values: Vec<CategoryValue>,
    },
}

pub(crate) fn join_values(values: &[CategoryValue]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Canonical ordering of category values
// ---------------------------------------------------------------------------

/// What to do with a data value that the canonical order does not list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnlistedPolicy {
    /// Restrict the result to the listed values; unlisted values are
    /// returned in [`OrderedMeans::dropped`].
    #[default]
    Drop,
    /// Fail with [`QueryError::UnknownCategory`].
    Reject,
}

/// A fixed sequence of category values that orders a chart axis.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryOrder {
    values: Vec<CategoryValue>,
    policy: UnlistedPolicy,
}

impl CategoryOrder {
    pub fn new<V: Into<CategoryValue>>(values: impl IntoIterator<Item = V>) -> Self {
        CategoryOrder {
            values: values.into_iter().map(Into::into).collect(),
            policy: UnlistedPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: UnlistedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> UnlistedPolicy {
        self.policy
    }

    pub fn values(&self) -> &[CategoryValue] {
        &self.values
    }

    pub fn position(&self, value: &CategoryValue) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }
}

/// Canonical axis orders used by the dashboard.
pub mod canonical {
    use super::CategoryOrder;
    use crate::data::model::CategoryColumn;

    pub fn marital_status() -> CategoryOrder {
        CategoryOrder::new(["Casado", "Solteiro", "União", "Separado", "Viúvo"])
    }

    pub fn residence_type() -> CategoryOrder {
        CategoryOrder::new([
            "Casa",
            "Com os pais",
            "Governamental",
            "Aluguel",
            "Estúdio",
            "Comunitário",
        ])
    }

    pub fn income_type() -> CategoryOrder {
        CategoryOrder::new([
            "Assalariado",
            "Empresário",
            "Pensionista",
            "Servidor público",
            "Bolsista",
        ])
    }

    pub fn education() -> CategoryOrder {
        CategoryOrder::new([
            "Primário",
            "Secundário",
            "Superior incompleto",
            "Superior completo",
            "Pós graduação",
        ])
    }

    /// The canonical order of `column`, if it has one.
    pub fn for_column(column: CategoryColumn) -> Option<CategoryOrder> {
        match column {
            CategoryColumn::MaritalStatus => Some(marital_status()),
            CategoryColumn::ResidenceType => Some(residence_type()),
            CategoryColumn::IncomeType => Some(income_type()),
            CategoryColumn::Education => Some(education()),
            CategoryColumn::Sex | CategoryColumn::OwnsVehicle | CategoryColumn::OwnsProperty => {
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Group `(key, sex, income)` triples and average the income of each group.
///
/// Output is sorted by `(key, sex)`. NaN incomes are skipped, so a group
/// whose incomes are all NaN has no mean and is left out.
fn group_means<'a, K, I>(rows: I) -> Vec<MeanIncome<K>>
where
    K: Ord,
    I: IntoIterator<Item = (K, &'a str, f64)>,
{
    let mut groups: BTreeMap<(K, &'a str), (f64, usize)> = BTreeMap::new();
    for (key, sex, income) in rows {
        if income.is_nan() {
            continue;
        }
        let (sum, n) = groups.entry((key, sex)).or_insert((0.0, 0));
        *sum += income;
        *n += 1;
    }

    groups
        .into_iter()
        .map(|((key, sex), (sum, n))| MeanIncome {
            key,
            sex: sex.to_string(),
            mean_income: sum / n as f64,
            customers: n,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Mean income per (reference date, sex) for dates in `[start, end]`.
///
/// An inverted range selects nothing and yields an empty table.
pub fn mean_income_by_date_and_sex(
    table: &CustomerTable,
    start: NaiveDate,
    end: NaiveDate,
) -> SummaryTable<MeanIncome<NaiveDate>> {
    let rows = table
        .records()
        .iter()
        .filter(|r| start <= r.reference_date && r.reference_date <= end)
        .map(|r| (r.reference_date, r.sex.as_str(), r.income));
    group_means(rows).into_iter().collect()
}

/// Mean income per (age, sex), restricted to ages in `[min_age, max_age]`.
///
/// The whole table is grouped first and the age range is applied to the
/// grouped rows, so the selectable ages are exactly those with a mean.
pub fn mean_income_by_age_and_sex(
    table: &CustomerTable,
    min_age: u32,
    max_age: u32,
) -> SummaryTable<MeanIncome<u32>> {
    grouped_by_age(table)
        .into_iter()
        .filter(|m| min_age <= m.key && m.key <= max_age)
        .collect()
}

/// Smallest and largest age of the (age, sex) grouped table.
pub fn age_bounds(table: &CustomerTable) -> Option<(u32, u32)> {
    let grouped = grouped_by_age(table);
    let min = grouped.iter().map(|m| m.key).min()?;
    let max = grouped.iter().map(|m| m.key).max()?;
    Some((min, max))
}

fn grouped_by_age(table: &CustomerTable) -> Vec<MeanIncome<u32>> {
    group_means(
        table
            .records()
            .iter()
            .map(|r| (r.age, r.sex.as_str(), r.income)),
    )
}

/// Mean income per (`column` value, sex) in the column's natural order.
pub fn mean_income_by_column_and_sex(
    table: &CustomerTable,
    column: CategoryColumn,
) -> SummaryTable<MeanIncome<CategoryValue>> {
    group_means(
        table
            .records()
            .iter()
            .map(|r| (column.value_of(r), r.sex.as_str(), r.income)),
    )
    .into_iter()
    .collect()
}

/// Mean income per (`column` value, sex), rows ordered by `order`.
///
/// Values listed in `order` but absent from the data produce no rows.
/// Values present in the data but not listed are handled per the order's
/// [`UnlistedPolicy`].
pub fn mean_income_by_category_and_sex(
    table: &CustomerTable,
    column: CategoryColumn,
    order: &CategoryOrder,
) -> Result<OrderedMeans, QueryError> {
    let grouped = mean_income_by_column_and_sex(table, column).rows;

    let unlisted: BTreeSet<&CategoryValue> = grouped
        .iter()
        .map(|m| &m.key)
        .filter(|v| order.position(v).is_none())
        .collect();

    let dropped: Vec<CategoryValue> = unlisted.into_iter().cloned().collect();
    if !dropped.is_empty() && order.policy() == UnlistedPolicy::Reject {
        return Err(QueryError::UnknownCategory {
            column,
            values: dropped,
        });
    }

    let mut ordered: Vec<(usize, MeanIncome<CategoryValue>)> = grouped
        .into_iter()
        .filter_map(|m| order.position(&m.key).map(|pos| (pos, m)))
        .collect();
    // Stable: rows sharing a category keep their sex order.
    ordered.sort_by_key(|(pos, _)| *pos);

    Ok(OrderedMeans {
        table: ordered.into_iter().map(|(_, m)| m).collect(),
        dropped,
    })
}

/// Count of each distinct value of `column`, most frequent first.
pub fn distribution(table: &CustomerTable, column: CategoryColumn) -> SummaryTable<CategoryCount> {
    let mut counts: BTreeMap<CategoryValue, usize> = BTreeMap::new();
    for record in table.records() {
        *counts.entry(column.value_of(record)).or_default() += 1;
    }

    let mut rows: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(value, count)| CategoryCount { value, count })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    SummaryTable { rows }
}
