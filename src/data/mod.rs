/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → CustomerTable (dates parsed once)
///   └──────────┘
///        │
///        ▼
///   ┌───────────────┐
///   │ CustomerTable  │  immutable Vec<CustomerRecord>
///   └───────────────┘
///        │        ┌──────────┐
///        │ ◄──────│  filter   │  FilterState: date range, age range
///        ▼        └──────────┘
///   ┌──────────┐
///   │  query    │  group + average / count → SummaryTable per chart
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod query;
