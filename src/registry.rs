//! Explicit protocol registry.
//!
//! Databases register their protocols through [`Database::register`] when
//! the process sets up its registry; nothing is discovered implicitly.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, warn};

use crate::config::Config;
use crate::data::preprocess::Preprocessors;
use crate::error::{DatabaseError, Result};
use crate::protocol::SpeakerDiarizationProtocol;

/// Builds a protocol from the registry's config and caller preprocessors.
pub type ProtocolFactory =
    fn(&Config, Preprocessors) -> Result<Box<dyn SpeakerDiarizationProtocol>>;

/// `(database, task, protocol)`
type Key = (String, String, String);

/// A database contributing protocols to a registry.
pub trait Database {
    /// Database name, e.g. `RT04F`.
    fn name(&self) -> &str;

    /// Register every protocol of this database.
    fn register(&self, registry: &mut ProtocolRegistry);
}

/// Maps `(database, task, protocol)` to protocol factories.
#[derive(Clone, Default)]
pub struct ProtocolRegistry {
    config: Config,
    factories: BTreeMap<Key, ProtocolFactory>,
}

impl fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolRegistry")
            .field("config", &self.config)
            .field("protocols", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProtocolRegistry {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            factories: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register every protocol of `database`.
    pub fn register_database(&mut self, database: &dyn Database) {
        debug!("registering database {}", database.name());
        database.register(self);
    }

    /// Register `factory` as `database.task.protocol`. A second registration
    /// under the same name replaces the first.
    pub fn register_protocol(
        &mut self,
        database: &str,
        task: &str,
        protocol: &str,
        factory: ProtocolFactory,
    ) {
        let key = (database.to_string(), task.to_string(), protocol.to_string());
        if self.factories.insert(key, factory).is_some() {
            warn!("protocol {database}.{task}.{protocol} registered twice; keeping the latest");
        } else {
            debug!("registered protocol {database}.{task}.{protocol}");
        }
    }

    /// Instantiate `database.task.protocol`.
    pub fn get_protocol(
        &self,
        database: &str,
        task: &str,
        protocol: &str,
        preprocessors: Preprocessors,
    ) -> Result<Box<dyn SpeakerDiarizationProtocol>> {
        let key = (database.to_string(), task.to_string(), protocol.to_string());
        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| DatabaseError::UnknownProtocol(format!("{database}.{task}.{protocol}")))?;
        factory(&self.config, preprocessors)
    }

    /// Instantiate a protocol from its dotted name, e.g.
    /// `RT04F.SpeakerDiarization.TV`.
    pub fn get_protocol_by_name(
        &self,
        name: &str,
        preprocessors: Preprocessors,
    ) -> Result<Box<dyn SpeakerDiarizationProtocol>> {
        let parts: Vec<&str> = name.split('.').collect();
        match parts.as_slice() {
            [database, task, protocol] => self.get_protocol(database, task, protocol, preprocessors),
            _ => Err(DatabaseError::UnknownProtocol(name.to_string())),
        }
    }

    pub fn contains(&self, database: &str, task: &str, protocol: &str) -> bool {
        self.factories.contains_key(&(
            database.to_string(),
            task.to_string(),
            protocol.to_string(),
        ))
    }

    /// Registered database names, sorted.
    pub fn databases(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|(db, _, _)| db.as_str()).collect();
        names.dedup();
        names
    }

    /// `(task, protocol)` pairs registered for `database`, sorted.
    pub fn protocols(&self, database: &str) -> Vec<(&str, &str)> {
        self.factories
            .keys()
            .filter(|(db, _, _)| db == database)
            .map(|(_, task, protocol)| (task.as_str(), protocol.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Records;

    struct Empty(Preprocessors);

    impl SpeakerDiarizationProtocol for Empty {
        fn preprocessors(&self) -> &Preprocessors {
            &self.0
        }
        fn trn_iter(&self) -> Result<Records<'_>> {
            Ok(Box::new(std::iter::empty()))
        }
        fn dev_iter(&self) -> Result<Records<'_>> {
            Ok(Box::new(std::iter::empty()))
        }
        fn tst_iter(&self) -> Result<Records<'_>> {
            Ok(Box::new(std::iter::empty()))
        }
    }

    fn empty_factory(
        _: &Config,
        preprocessors: Preprocessors,
    ) -> Result<Box<dyn SpeakerDiarizationProtocol>> {
        Ok(Box::new(Empty(preprocessors)))
    }

    #[test]
    fn lookup_by_parts_and_by_name() {
        let mut registry = ProtocolRegistry::default();
        registry.register_protocol("DB", "SpeakerDiarization", "P", empty_factory);

        assert!(registry.contains("DB", "SpeakerDiarization", "P"));
        assert!(registry
            .get_protocol("DB", "SpeakerDiarization", "P", Preprocessors::new())
            .is_ok());
        let protocol = registry
            .get_protocol_by_name("DB.SpeakerDiarization.P", Preprocessors::new())
            .unwrap();
        assert_eq!(protocol.train().unwrap().count(), 0);
        assert_eq!(registry.databases(), vec!["DB"]);
        assert_eq!(registry.protocols("DB"), vec![("SpeakerDiarization", "P")]);
    }

    #[test]
    fn unknown_names_fail() {
        let registry = ProtocolRegistry::default();
        let err = registry
            .get_protocol_by_name("DB.SpeakerDiarization.P", Preprocessors::new())
            .err()
            .unwrap();
        assert!(matches!(err, DatabaseError::UnknownProtocol(_)));
        assert!(registry
            .get_protocol_by_name("not-dotted", Preprocessors::new())
            .is_err());
    }
}
