//! RT04F broadcast news speaker diarization database.
//!
//! ```no_run
//! use rt04f::{registry, Config, Preprocessors, SpeakerDiarizationProtocol, Subset};
//!
//! let registry = registry(Config::from_env());
//! let protocol = registry
//!     .get_protocol_by_name("RT04F.SpeakerDiarization.TV", Preprocessors::new())
//!     .unwrap();
//! for file in protocol.subset(Subset::Development).unwrap() {
//!     let file = file.unwrap();
//!     println!("{} {} turns", file.uri, file.annotation.len());
//! }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod rt04f;

pub use config::Config;
pub use data::model::{Annotation, ProtocolFile, Segment, Timeline, Turn};
pub use data::preprocess::{Preprocessor, Preprocessors};
pub use error::{DatabaseError, Result};
pub use protocol::{Records, SpeakerDiarizationProtocol, Subset, SubsetStats};
pub use registry::{Database, ProtocolRegistry};
pub use rt04f::{Rt04f, TvProtocol};

/// Registry holding every database shipped with this crate.
pub fn registry(config: Config) -> ProtocolRegistry {
    let mut registry = ProtocolRegistry::new(config);
    registry.register_database(&Rt04f);
    registry
}
