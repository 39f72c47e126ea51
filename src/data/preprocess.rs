use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::model::ProtocolFile;
use crate::error::{DatabaseError, Result};

/// Keys every protocol file already carries; preprocessors may not shadow them.
pub const RESERVED_KEYS: [&str; 4] = ["database", "uri", "annotated", "annotation"];

const PLACEHOLDERS: [&str; 2] = ["uri", "database"];

// ---------------------------------------------------------------------------
// Preprocessor – derives one extra value per protocol file
// ---------------------------------------------------------------------------

/// Derives an extra value for a protocol file, e.g. the path of its audio.
#[derive(Clone)]
pub enum Preprocessor {
    /// Template with `{uri}` / `{database}` placeholders,
    /// e.g. `/corpus/wav/{uri}.wav`.
    Template(String),
    /// Arbitrary function of the file.
    Function(Arc<dyn Fn(&ProtocolFile) -> String + Send + Sync>),
}

impl fmt::Debug for Preprocessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preprocessor::Template(t) => f.debug_tuple("Template").field(t).finish(),
            Preprocessor::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl Preprocessor {
    pub fn template(template: impl Into<String>) -> Self {
        Preprocessor::Template(template.into())
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&ProtocolFile) -> String + Send + Sync + 'static,
    {
        Preprocessor::Function(Arc::new(f))
    }

    fn apply(&self, file: &ProtocolFile) -> String {
        match self {
            Preprocessor::Template(t) => render(t, file),
            Preprocessor::Function(f) => f(file),
        }
    }
}

/// A piece of a template: literal text or a `{name}` placeholder.
enum Piece<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

/// Split a template into pieces. `Err` carries the text of an unclosed `{`.
fn pieces(template: &str) -> std::result::Result<Vec<Piece<'_>>, &str> {
    let mut out = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push(Piece::Text(&rest[..open]));
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or(&rest[open..])?;
        out.push(Piece::Placeholder(&after[..close]));
        rest = &after[close + 1..];
    }
    out.push(Piece::Text(rest));
    Ok(out)
}

/// Reject templates referring to anything but the known placeholders.
fn check_template(key: &str, template: &str) -> Result<()> {
    let pieces = pieces(template).map_err(|_| {
        DatabaseError::Config(format!("preprocessor '{key}': unclosed '{{' in '{template}'"))
    })?;
    for piece in pieces {
        if let Piece::Placeholder(name) = piece {
            if !PLACEHOLDERS.contains(&name) {
                return Err(DatabaseError::Config(format!(
                    "preprocessor '{key}': unknown placeholder '{{{name}}}'"
                )));
            }
        }
    }
    Ok(())
}

/// Substitute placeholders in a single pass; substituted values are never
/// scanned again.
fn render(template: &str, file: &ProtocolFile) -> String {
    let Ok(pieces) = pieces(template) else {
        return template.to_string();
    };
    let mut out = String::with_capacity(template.len() + file.uri.len());
    for piece in pieces {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Placeholder("uri") => out.push_str(&file.uri),
            Piece::Placeholder("database") => out.push_str(&file.database),
            Piece::Placeholder(other) => {
                out.push('{');
                out.push_str(other);
                out.push('}');
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Preprocessors – the full key → preprocessor set of a protocol
// ---------------------------------------------------------------------------

/// Ordered set of preprocessors applied to every yielded file.
#[derive(Debug, Clone, Default)]
pub struct Preprocessors {
    entries: BTreeMap<String, Preprocessor>,
}

impl Preprocessors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, preprocessor)` pairs, validating each one.
    pub fn from_entries<I, K>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Preprocessor)>,
        K: Into<String>,
    {
        let mut out = Preprocessors::new();
        for (key, pre) in entries {
            out.insert(key, pre)?;
        }
        Ok(out)
    }

    pub fn insert(&mut self, key: impl Into<String>, preprocessor: Preprocessor) -> Result<()> {
        let key = key.into();
        if RESERVED_KEYS.contains(&key.as_str()) {
            return Err(DatabaseError::Config(format!(
                "preprocessor key '{key}' is reserved"
            )));
        }
        if let Preprocessor::Template(t) = &preprocessor {
            check_template(&key, t)?;
        }
        self.entries.insert(key, preprocessor);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fill `file.extra` with every preprocessor's output.
    pub fn apply(&self, mut file: ProtocolFile) -> ProtocolFile {
        for (key, pre) in &self.entries {
            let value = pre.apply(&file);
            file.extra.insert(key.clone(), value);
        }
        file
    }
}
