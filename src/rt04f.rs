//! RT04F broadcast news: the `TV` speaker diarization protocol.
//!
//! Every subset is backed by a pair of files in the data directory,
//! `<stem>-<subset>-en.uem` (annotated extents) and
//! `<stem>-<subset>-en.mdtm` (speaker turns):
//!
//! | split       | pairs                                |
//! |-------------|--------------------------------------|
//! | train       | `hub4e96`/`trn`, then `hub4e97`/`trn` |
//! | development | `rt04f`/`dev`                        |
//! | test        | `rt04f`/`tst`                        |

use std::collections::BTreeMap;
use std::iter;

use log::{debug, info};

use crate::config::Config;
use crate::data::loader::{MdtmFile, MdtmParser, UemFile, UemParser};
use crate::data::model::ProtocolFile;
use crate::data::preprocess::Preprocessors;
use crate::error::Result;
use crate::protocol::{Records, SpeakerDiarizationProtocol, SPEAKER_DIARIZATION};
use crate::registry::{Database, ProtocolRegistry};

pub const DATABASE: &str = "RT04F";
pub const TV: &str = "TV";

/// `(stem, subset)` file pairs, in the order they are read.
pub static TRAIN_PAIRS: [(&str, &str); 2] = [("hub4e96", "trn"), ("hub4e97", "trn")];
pub const DEV_PAIR: (&str, &str) = ("rt04f", "dev");
pub const TEST_PAIR: (&str, &str) = ("rt04f", "tst");

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

/// The RT04F database. Registers `RT04F.SpeakerDiarization.TV`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rt04f;

impl Database for Rt04f {
    fn name(&self) -> &str {
        DATABASE
    }

    fn register(&self, registry: &mut ProtocolRegistry) {
        registry.register_protocol(DATABASE, SPEAKER_DIARIZATION, TV, TvProtocol::factory);
    }
}

// ---------------------------------------------------------------------------
// TV protocol
// ---------------------------------------------------------------------------

/// Speaker diarization protocol over the RT04F file pairs.
#[derive(Debug, Clone)]
pub struct TvProtocol {
    config: Config,
    preprocessors: Preprocessors,
    uem_parser: UemParser,
    mdtm_parser: MdtmParser,
}

impl TvProtocol {
    pub fn new(config: Config, preprocessors: Preprocessors) -> Self {
        info!(
            "{DATABASE}.{SPEAKER_DIARIZATION}.{TV} reading from {}",
            config.data_dir.display()
        );
        Self {
            config,
            preprocessors,
            uem_parser: UemParser::new(),
            mdtm_parser: MdtmParser::new(),
        }
    }

    fn factory(
        config: &Config,
        preprocessors: Preprocessors,
    ) -> Result<Box<dyn SpeakerDiarizationProtocol>> {
        Ok(Box::new(Self::new(config.clone(), preprocessors)))
    }

    /// Parse both files of `(stem, subset)` and iterate its recordings.
    ///
    /// Both files are read before returning, so a missing or malformed
    /// file fails here rather than mid-iteration.
    pub fn load_subset(&self, stem: &str, subset: &str) -> Result<SubsetIter> {
        let uem = self
            .uem_parser
            .read(&self.config.file_path(stem, subset, "uem"))?;
        let mdtm = self
            .mdtm_parser
            .read(&self.config.file_path(stem, subset, "mdtm"))?;
        debug!("{stem}/{subset}: {} recordings", mdtm.uris().count());
        Ok(SubsetIter::new(uem, mdtm))
    }
}

/// Opens a pair only when first polled, turning a load failure into a
/// single error item.
fn deferred<'a>(
    protocol: &'a TvProtocol,
    (stem, subset): (&'static str, &'static str),
) -> Records<'a> {
    Box::new(
        iter::once_with(move || protocol.load_subset(stem, subset)).flat_map(
            |loaded| -> Records<'static> {
                match loaded {
                    Ok(files) => Box::new(files),
                    Err(e) => Box::new(iter::once(Err(e))),
                }
            },
        ),
    )
}

impl SpeakerDiarizationProtocol for TvProtocol {
    fn preprocessors(&self) -> &Preprocessors {
        &self.preprocessors
    }

    /// `hub4e96` then `hub4e97`; the second pair is not opened until the
    /// first is exhausted.
    fn trn_iter(&self) -> Result<Records<'_>> {
        let (stem, subset) = TRAIN_PAIRS[0];
        let head = self.load_subset(stem, subset)?;
        let tail = TRAIN_PAIRS[1..]
            .iter()
            .flat_map(move |&pair| deferred(self, pair));
        Ok(Box::new(head.chain(tail)))
    }

    fn dev_iter(&self) -> Result<Records<'_>> {
        let (stem, subset) = DEV_PAIR;
        Ok(Box::new(self.load_subset(stem, subset)?))
    }

    fn tst_iter(&self) -> Result<Records<'_>> {
        let (stem, subset) = TEST_PAIR;
        Ok(Box::new(self.load_subset(stem, subset)?))
    }
}

// ---------------------------------------------------------------------------
// SubsetIter – one protocol file per MDTM uri
// ---------------------------------------------------------------------------

/// Yields one file per uri of the MDTM file, in sorted uri order.
#[derive(Debug)]
pub struct SubsetIter {
    uem: UemFile,
    mdtm: MdtmFile,
    uris: std::vec::IntoIter<String>,
}

impl SubsetIter {
    fn new(uem: UemFile, mdtm: MdtmFile) -> Self {
        let uris: Vec<String> = mdtm.uris().map(str::to_string).collect();
        Self {
            uem,
            mdtm,
            uris: uris.into_iter(),
        }
    }

    fn file(&self, uri: String) -> Result<ProtocolFile> {
        let annotated = self.uem.lookup(&uri)?;
        let annotation = self.mdtm.lookup(&uri)?;
        Ok(ProtocolFile {
            database: DATABASE.to_string(),
            uri,
            annotated,
            annotation,
            extra: BTreeMap::new(),
        })
    }
}

impl Iterator for SubsetIter {
    type Item = Result<ProtocolFile>;

    fn next(&mut self) -> Option<Self::Item> {
        let uri = self.uris.next()?;
        Some(self.file(uri))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.uris.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::data::model::Segment;
    use crate::data::preprocess::Preprocessor;
    use crate::error::DatabaseError;
    use crate::protocol::Subset;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    /// Full corpus: hub4e97 uris sort before hub4e96 ones on purpose.
    fn corpus() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path();
        write(d, "hub4e96-trn-en.uem", "h96_b 1 0 100\nh96_a 1 0 50\n");
        write(
            d,
            "hub4e96-trn-en.mdtm",
            "h96_b 1 1.0 2.0 speaker NA adult_male bob\n\
             h96_a 1 0.0 10.0 speaker NA adult_female alice\n",
        );
        write(d, "hub4e97-trn-en.uem", "a97 1 0 30\n");
        write(d, "hub4e97-trn-en.mdtm", "a97 1 5.0 5.0 speaker NA adult_male carl\n");
        write(d, "rt04f-dev-en.uem", "show_002 1 0 60\nshow_001 1 0 60\n");
        write(
            d,
            "rt04f-dev-en.mdtm",
            "show_002 1 0.0 30.0 speaker NA adult_male dan\n\
             show_001 1 0.0 20.0 speaker NA adult_female eve\n\
             show_001 1 20.0 20.0 speaker NA adult_male dan\n",
        );
        write(d, "rt04f-tst-en.uem", "tst_1 1 10 70\n");
        write(d, "rt04f-tst-en.mdtm", "tst_1 1 0.0 20.0 speaker NA adult_male fred\n");
        dir
    }

    fn protocol(dir: &Path) -> TvProtocol {
        TvProtocol::new(Config::with_data_dir(dir), Preprocessors::new())
    }

    fn uris(records: Records<'_>) -> Vec<String> {
        records.map(|r| r.unwrap().uri).collect()
    }

    #[test]
    fn dev_yields_sorted_uris_with_fixed_keys() {
        let dir = corpus();
        let tv = protocol(dir.path());
        let files: Vec<ProtocolFile> = tv.dev_iter().unwrap().map(|r| r.unwrap()).collect();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].uri, "show_001");
        assert_eq!(files[1].uri, "show_002");
        for file in &files {
            assert_eq!(file.database, "RT04F");
            assert_eq!(file.annotated.uri, file.uri);
            assert_eq!(file.annotation.uri, file.uri);
            assert!(file.extra.is_empty());
        }
        assert_eq!(files[0].annotation.len(), 2);
        assert_eq!(files[0].annotated.segments(), &[Segment::new(0.0, 60.0)]);
    }

    #[test]
    fn records_match_parser_lookups() {
        let dir = corpus();
        let tv = protocol(dir.path());
        let uem = UemParser::new()
            .read(&dir.path().join("rt04f-dev-en.uem"))
            .unwrap();
        let mdtm = MdtmParser::new()
            .read(&dir.path().join("rt04f-dev-en.mdtm"))
            .unwrap();

        for file in tv.dev_iter().unwrap() {
            let file = file.unwrap();
            assert_eq!(file.annotated, uem.lookup(&file.uri).unwrap());
            assert_eq!(file.annotation, mdtm.lookup(&file.uri).unwrap());
        }
    }

    #[test]
    fn train_concatenates_pairs_without_interleaving() {
        let dir = corpus();
        let tv = protocol(dir.path());
        assert_eq!(uris(tv.trn_iter().unwrap()), vec!["h96_a", "h96_b", "a97"]);
    }

    #[test]
    fn splits_are_repeatable() {
        let dir = corpus();
        let tv = protocol(dir.path());
        for subset in Subset::ALL {
            let first: Vec<ProtocolFile> = tv.subset(subset).unwrap().map(|r| r.unwrap()).collect();
            let second: Vec<ProtocolFile> = tv.subset(subset).unwrap().map(|r| r.unwrap()).collect();
            assert!(!first.is_empty());
            assert_eq!(first, second);
        }
    }

    #[test]
    fn missing_test_mdtm_fails_before_any_record() {
        let dir = corpus();
        fs::remove_file(dir.path().join("rt04f-tst-en.mdtm")).unwrap();
        let tv = protocol(dir.path());

        let err = tv.tst_iter().err().unwrap();
        assert!(err.is_file_access());
        assert!(err.to_string().contains("rt04f-tst-en.mdtm"));
    }

    #[test]
    fn missing_first_train_pair_fails_up_front() {
        let dir = corpus();
        fs::remove_file(dir.path().join("hub4e96-trn-en.mdtm")).unwrap();
        let tv = protocol(dir.path());

        let err = tv.trn_iter().err().unwrap();
        assert!(err.is_file_access());
        assert!(err.to_string().contains("hub4e96-trn-en.mdtm"));
    }

    #[test]
    fn malformed_dev_uem_reaches_caller() {
        let dir = corpus();
        write(dir.path(), "rt04f-dev-en.uem", "show_001 1 0 60\nshow_002 1 zero 60\n");
        let tv = protocol(dir.path());

        let err = tv.dev_iter().err().unwrap();
        assert!(matches!(err, DatabaseError::Malformed { line: 2, .. }));
        assert!(!err.is_file_access());
    }

    #[test]
    fn second_train_pair_is_opened_lazily() {
        let dir = corpus();
        fs::remove_file(dir.path().join("hub4e97-trn-en.uem")).unwrap();
        let tv = protocol(dir.path());

        let mut records = tv.trn_iter().unwrap();
        assert_eq!(records.next().unwrap().unwrap().uri, "h96_a");
        assert_eq!(records.next().unwrap().unwrap().uri, "h96_b");
        let err = records.next().unwrap().unwrap_err();
        assert!(err.is_file_access());
        assert!(records.next().is_none());
    }

    #[test]
    fn uri_missing_from_uem_fails_at_that_record() {
        let dir = corpus();
        write(dir.path(), "rt04f-dev-en.uem", "show_001 1 0 60\n");
        let tv = protocol(dir.path());

        let results: Vec<Result<ProtocolFile>> = tv.dev_iter().unwrap().collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().uri, "show_001");
        assert!(matches!(
            &results[1],
            Err(DatabaseError::UnknownUri { uri, .. }) if uri == "show_002"
        ));
    }

    #[test]
    fn registering_twice_keeps_protocol_retrievable() {
        let dir = corpus();
        let mut registry = ProtocolRegistry::new(Config::with_data_dir(dir.path()));
        registry.register_database(&Rt04f);
        registry.register_database(&Rt04f);

        assert_eq!(registry.config().data_dir, dir.path());

        assert!(registry.contains("RT04F", "SpeakerDiarization", "TV"));
        let tv = registry
            .get_protocol_by_name("RT04F.SpeakerDiarization.TV", Preprocessors::new())
            .unwrap();
        assert_eq!(uris(tv.test().unwrap()), vec!["tst_1"]);
    }

    #[test]
    fn preprocessors_apply_through_public_splits_only() {
        let dir = corpus();
        let preprocessors =
            Preprocessors::from_entries([("audio", Preprocessor::template("/wav/{uri}.wav"))])
                .unwrap();
        let tv = TvProtocol::new(Config::with_data_dir(dir.path()), preprocessors);

        let file = tv.development().unwrap().next().unwrap().unwrap();
        assert_eq!(file.extra["audio"], "/wav/show_001.wav");
        let raw = tv.dev_iter().unwrap().next().unwrap().unwrap();
        assert!(raw.extra.is_empty());
    }

    #[test]
    fn stats_count_speech_inside_annotated_regions() {
        let dir = corpus();
        let tv = protocol(dir.path());

        let stats = tv.stats(Subset::Test).unwrap();
        assert_eq!(stats.files, 1);
        assert!((stats.annotated - 60.0).abs() < 1e-9);
        // fred speaks 0-20 but only 10-20 is annotated
        assert!((stats.annotation - 10.0).abs() < 1e-9);
        assert!((stats.labels["fred"] - 10.0).abs() < 1e-9);

        let dev = tv.stats(Subset::Development).unwrap();
        assert_eq!(dev.files, 2);
        assert!((dev.labels["dan"] - 50.0).abs() < 1e-9);
    }
}
