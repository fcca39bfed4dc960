use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CustomerRecord – one row of the raw table
// ---------------------------------------------------------------------------

/// A single customer (one row of the source dataset).
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    /// Internal row id (the pandas index column). Never displayed.
    pub id: u64,
    /// Reference date the row was collected on (`data_ref`).
    pub reference_date: NaiveDate,
    pub sex: String,
    pub age: u32,
    pub marital_status: String,
    pub residence_type: String,
    pub income_type: String,
    pub education: String,
    pub owns_vehicle: bool,
    pub owns_property: bool,
    /// Monthly income (`renda`).
    pub income: f64,
}

// ---------------------------------------------------------------------------
// CategoryValue – a single cell of a categorical column
// ---------------------------------------------------------------------------

/// Value of a categorical column. Flags keep their boolean type so charts
/// order them `false, true` rather than alphabetically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CategoryValue {
    Flag(bool),
    Text(String),
}

impl fmt::Display for CategoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryValue::Flag(b) => write!(f, "{b}"),
            CategoryValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for CategoryValue {
    fn from(s: &str) -> Self {
        CategoryValue::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// CategoryColumn – the categorical dimensions income is broken down by
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryColumn {
    Sex,
    MaritalStatus,
    ResidenceType,
    IncomeType,
    Education,
    OwnsVehicle,
    OwnsProperty,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category column '{0}'")]
pub struct UnknownColumn(pub String);

impl CategoryColumn {
    pub const ALL: [CategoryColumn; 7] = [
        CategoryColumn::Sex,
        CategoryColumn::MaritalStatus,
        CategoryColumn::ResidenceType,
        CategoryColumn::IncomeType,
        CategoryColumn::Education,
        CategoryColumn::OwnsVehicle,
        CategoryColumn::OwnsProperty,
    ];

    /// Column name in the source file.
    pub fn name(self) -> &'static str {
        match self {
            CategoryColumn::Sex => "sexo",
            CategoryColumn::MaritalStatus => "estado_civil",
            CategoryColumn::ResidenceType => "tipo_residencia",
            CategoryColumn::IncomeType => "tipo_renda",
            CategoryColumn::Education => "educacao",
            CategoryColumn::OwnsVehicle => "posse_de_veiculo",
            CategoryColumn::OwnsProperty => "posse_de_imovel",
        }
    }

    /// Human-readable label for axes and legends.
    pub fn label(self) -> &'static str {
        match self {
            CategoryColumn::Sex => "Sex",
            CategoryColumn::MaritalStatus => "Marital status",
            CategoryColumn::ResidenceType => "Residence type",
            CategoryColumn::IncomeType => "Income type",
            CategoryColumn::Education => "Education level",
            CategoryColumn::OwnsVehicle => "Vehicle ownership",
            CategoryColumn::OwnsProperty => "Property ownership",
        }
    }

    pub fn value_of(self, record: &CustomerRecord) -> CategoryValue {
        match self {
            CategoryColumn::Sex => CategoryValue::Text(record.sex.clone()),
            CategoryColumn::MaritalStatus => CategoryValue::Text(record.marital_status.clone()),
            CategoryColumn::ResidenceType => CategoryValue::Text(record.residence_type.clone()),
            CategoryColumn::IncomeType => CategoryValue::Text(record.income_type.clone()),
            CategoryColumn::Education => CategoryValue::Text(record.education.clone()),
            CategoryColumn::OwnsVehicle => CategoryValue::Flag(record.owns_vehicle),
            CategoryColumn::OwnsProperty => CategoryValue::Flag(record.owns_property),
        }
    }
}

impl FromStr for CategoryColumn {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryColumn::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownColumn(s.to_string()))
    }
}

impl fmt::Display for CategoryColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// CustomerTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// Column headers of the raw-table view, in display order (id excluded).
pub const DISPLAY_COLUMNS: [&str; 10] = [
    "data_ref",
    "sexo",
    "idade",
    "estado_civil",
    "tipo_residencia",
    "tipo_renda",
    "educacao",
    "posse_de_veiculo",
    "posse_de_imovel",
    "renda",
];

/// The immutable raw table. Built once by the loader and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct CustomerTable {
    records: Vec<CustomerRecord>,
}

impl CustomerTable {
    pub fn from_records(records: Vec<CustomerRecord>) -> Self {
        CustomerTable { records }
    }

    pub fn records(&self) -> &[CustomerRecord] {
        &self.records
    }

    /// Number of customers.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The first `n` rows (all rows if there are fewer).
    pub fn head(&self, n: usize) -> &[CustomerRecord] {
        &self.records[..n.min(self.records.len())]
    }

    /// Earliest and latest reference date, `None` for an empty table.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.reference_date).min()?;
        let max = self.records.iter().map(|r| r.reference_date).max()?;
        Some((min, max))
    }

    /// Sorted set of distinct values observed in `column`.
    pub fn observed_values(&self, column: CategoryColumn) -> BTreeSet<CategoryValue> {
        self.records.iter().map(|r| column.value_of(r)).collect()
    }
}

impl CustomerRecord {
    /// Cell texts in [`DISPLAY_COLUMNS`] order.
    pub fn display_cells(&self) -> [String; 10] {
        [
            self.reference_date.to_string(),
            self.sex.clone(),
            self.age.to_string(),
            self.marital_status.clone(),
            self.residence_type.clone(),
            self.income_type.clone(),
            self.education.clone(),
            self.owns_vehicle.to_string(),
            self.owns_property.to_string(),
            format!("{:.2}", self.income),
        ]
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn column_names_round_trip_through_from_str() {
        for column in CategoryColumn::ALL {
            assert_eq!(column.name().parse::<CategoryColumn>(), Ok(column));
        }
        assert_eq!(
            "renda".parse::<CategoryColumn>(),
            Err(UnknownColumn("renda".to_string()))
        );
    }

    #[test]
    fn date_range_and_observed_values() {
        let table = four_customers();
        assert_eq!(
            table.date_range(),
            Some((date(2021, 1, 1), date(2021, 2, 1)))
        );
        let sexes: Vec<_> = table.observed_values(CategoryColumn::Sex).into_iter().collect();
        assert_eq!(sexes, vec![CategoryValue::from("F"), CategoryValue::from("M")]);
        assert_eq!(CustomerTable::default().date_range(), None);
    }

    #[test]
    fn flags_sort_before_text_and_false_first() {
        assert!(CategoryValue::Flag(false) < CategoryValue::Flag(true));
        assert!(CategoryValue::Flag(true) < CategoryValue::from("A"));
    }

    #[test]
    fn head_is_bounded_by_len() {
        let table = four_customers();
        assert_eq!(table.head(2).len(), 2);
        assert_eq!(table.head(10).len(), 4);
    }
}
