/// Data layer: data-file descriptors, backing stores, and loading.
///
/// Architecture:
/// ```text
///   DataFile { path, label, color }
///        │  first call to variables() / labels()
///        ▼
///   ┌──────────┐
///   │ datafile  │  classify final path segment → Kind
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  samples/  → ImportanceSamples
///   └──────────┘  pred-*/   → Prediction
///        │
///        ▼
///   ┌──────────────┐
///   │  SampleTable  │  lookup table, columns, weights
///   └──────────────┘
/// ```

pub mod datafile;
pub mod loader;
pub mod model;
