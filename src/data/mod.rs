/// Data layer: worksheet model, ASCII import, column ranges and PRF conversion.
///
/// Architecture:
/// ```text
///  .dat / .txt / .csv          .prf
///        │                      │
///        │                ┌──────────┐
///        │                │   prf     │  FullProf profile → XY table
///        │                └──────────┘
///        ▼                      │
///   ┌──────────┐ ◄──────────────┘
///   │  loader   │  sniff layout → ImportSpec → Table
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ Worksheet  │  ordered, typed columns
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  range    │  (column, role) bindings → DataRange
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod prf;
pub mod range;
