//! Speaker diarization protocol capability.
//!
//! A protocol exposes three raw split iterators (`trn_iter`, `dev_iter`,
//! `tst_iter`). Callers normally go through the provided `train`,
//! `development` and `test` methods, which also run the protocol's
//! preprocessors on every file.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::data::model::ProtocolFile;
use crate::data::preprocess::Preprocessors;
use crate::error::{DatabaseError, Result};

/// Lazily produced protocol files. Each item fails independently; items
/// yielded before a failure stay valid.
pub type Records<'a> = Box<dyn Iterator<Item = Result<ProtocolFile>> + 'a>;

/// Task name under which diarization protocols are registered.
pub const SPEAKER_DIARIZATION: &str = "SpeakerDiarization";

/// Protocol partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subset {
    Train,
    Development,
    Test,
}

impl Subset {
    pub const ALL: [Subset; 3] = [Subset::Train, Subset::Development, Subset::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subset::Train => "train",
            Subset::Development => "development",
            Subset::Test => "test",
        }
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subset {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "train" | "trn" => Ok(Subset::Train),
            "development" | "dev" => Ok(Subset::Development),
            "test" | "tst" => Ok(Subset::Test),
            _ => Err(DatabaseError::Config(format!("unknown subset: {s}"))),
        }
    }
}

/// Summary of one subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubsetStats {
    /// Number of files.
    pub files: usize,
    /// Total annotated duration in seconds.
    pub annotated: f64,
    /// Total speech duration within the annotated regions.
    pub annotation: f64,
    /// Speech duration per label.
    pub labels: BTreeMap<String, f64>,
}

/// Speaker diarization protocol with train/development/test subsets.
pub trait SpeakerDiarizationProtocol {
    /// Preprocessors applied by `train`, `development` and `test`.
    fn preprocessors(&self) -> &Preprocessors;

    /// Raw training files.
    fn trn_iter(&self) -> Result<Records<'_>>;
    /// Raw development files.
    fn dev_iter(&self) -> Result<Records<'_>>;
    /// Raw test files.
    fn tst_iter(&self) -> Result<Records<'_>>;

    /// Files of `subset` with preprocessors applied.
    fn subset(&self, subset: Subset) -> Result<Records<'_>> {
        let raw = match subset {
            Subset::Train => self.trn_iter()?,
            Subset::Development => self.dev_iter()?,
            Subset::Test => self.tst_iter()?,
        };
        let preprocessors = self.preprocessors();
        if preprocessors.is_empty() {
            return Ok(raw);
        }
        Ok(Box::new(
            raw.map(move |file| file.map(|f| preprocessors.apply(f))),
        ))
    }

    fn train(&self) -> Result<Records<'_>> {
        self.subset(Subset::Train)
    }

    fn development(&self) -> Result<Records<'_>> {
        self.subset(Subset::Development)
    }

    fn test(&self) -> Result<Records<'_>> {
        self.subset(Subset::Test)
    }

    /// Walk `subset` once and summarise it. Speech outside the annotated
    /// regions is not counted.
    fn stats(&self, subset: Subset) -> Result<SubsetStats> {
        let mut stats = SubsetStats::default();
        for file in self.subset(subset)? {
            let file = file?;
            let annotation = file.annotation.crop(&file.annotated);
            stats.files += 1;
            stats.annotated += file.annotated.duration();
            stats.annotation += annotation.get_timeline().duration();
            for (label, duration) in annotation.chart() {
                *stats.labels.entry(label).or_default() += duration;
            }
        }
        Ok(stats)
    }
}
