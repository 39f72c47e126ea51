/// Data layer: annotation types, UEM/MDTM parsing, and preprocessing.
///
/// Architecture:
/// ```text
///  <stem>-<subset>-en.uem   <stem>-<subset>-en.mdtm
///        │                         │
///        ▼                         ▼
///   ┌───────────┐            ┌────────────┐
///   │ UemParser │            │ MdtmParser │   parse file → uri lookup
///   └───────────┘            └────────────┘
///        │ Timeline                │ Annotation
///        └───────────┬─────────────┘
///                    ▼
///             ┌──────────────┐
///             │ ProtocolFile │  {database, uri, annotated, annotation}
///             └──────────────┘
///                    │
///                    ▼
///             ┌──────────────┐
///             │  preprocess  │  template / function → extra values
///             └──────────────┘
///                    │
///                    ▼
///             ┌──────────────┐
///             │    export    │  JSON lines / CSV turn table
///             └──────────────┘
/// ```

pub mod export;
pub mod loader;
pub mod model;
pub mod preprocess;
