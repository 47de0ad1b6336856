/// Data layer: core types, loading, cascading selection and resolution.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  decode, normalise headers, drop incomplete rows
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ VehicleTable  │  Vec<VehicleRecord>, read-only after load
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  field order + selections → candidate sets
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ resolve   │  complete selection → one record
///   └──────────┘
/// ```

pub mod columns;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod resolve;
