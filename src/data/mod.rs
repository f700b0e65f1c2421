/// Data layer: discovery, loading, aggregation and export.
///
/// Architecture:
/// ```text
///  data/ directory
///        │
///        ▼
///   ┌──────────┐
///   │ locator  │  normalized keyword match → file paths
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  CSV / Parquet / XLSX → per-site tables
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cache   │  Arc<Datasets> for the session
///   └──────────┘
///        │
///        ├──────────────┬──────────────┐
///        ▼              ▼              ▼
///   ┌──────────┐   ┌──────────┐   ┌──────────┐
///   │aggregate │   │  filter  │   │  export  │
///   └──────────┘   └──────────┘   └──────────┘
/// ```

pub mod aggregate;
pub mod cache;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod locator;
pub mod model;
pub mod normalize;
