use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;

use super::model::{Annotation, Segment, Timeline};
use crate::error::{DatabaseError, Result};

// ---------------------------------------------------------------------------
// Shared line reader
// ---------------------------------------------------------------------------

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| DatabaseError::io(path, e))
}

/// Yield `(line_number, fields)` for every non-blank, non-comment line.
/// Line numbers are 1-based. `;;` starts a comment line.
fn data_lines(text: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    text.lines().enumerate().filter_map(|(i, line)| {
        let line = line.trim();
        if line.is_empty() || line.starts_with(";;") {
            return None;
        }
        Some((i + 1, line.split_whitespace().collect()))
    })
}

fn parse_time(tok: &str, path: &Path, line: usize, what: &str) -> Result<f64> {
    match tok.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(DatabaseError::malformed(
            path,
            line,
            format!("{what} '{tok}' is not a number"),
        )),
    }
}

// ---------------------------------------------------------------------------
// UEM parser
// ---------------------------------------------------------------------------

/// Parser for UEM files: `uri channel start end` per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct UemParser;

/// Parsed UEM file: one annotated timeline per uri.
#[derive(Debug, Clone)]
pub struct UemFile {
    path: PathBuf,
    timelines: BTreeMap<String, Timeline>,
}

impl UemParser {
    pub fn new() -> Self {
        UemParser
    }

    pub fn read(&self, path: &Path) -> Result<UemFile> {
        let text = read_text(path)?;
        let uem = self.parse(&text, path)?;
        debug!("parsed {} uris from {}", uem.timelines.len(), path.display());
        Ok(uem)
    }

    /// Parse UEM content. `path` is only used in error messages.
    pub fn parse(&self, text: &str, path: &Path) -> Result<UemFile> {
        let mut timelines: BTreeMap<String, Timeline> = BTreeMap::new();
        for (line, fields) in data_lines(text) {
            if fields.len() < 4 {
                return Err(DatabaseError::malformed(
                    path,
                    line,
                    format!("expected 4 fields, got {}", fields.len()),
                ));
            }
            let uri = fields[0];
            let start = parse_time(fields[2], path, line, "start")?;
            let end = parse_time(fields[3], path, line, "end")?;
            if end < start {
                return Err(DatabaseError::malformed(
                    path,
                    line,
                    format!("end {end} precedes start {start}"),
                ));
            }
            timelines
                .entry(uri.to_string())
                .or_insert_with(|| Timeline::new(uri))
                .add(Segment::new(start, end));
        }
        Ok(UemFile {
            path: path.to_path_buf(),
            timelines,
        })
    }
}

impl UemFile {
    /// Annotated timeline of `uri`.
    pub fn lookup(&self, uri: &str) -> Result<Timeline> {
        self.timelines
            .get(uri)
            .cloned()
            .ok_or_else(|| DatabaseError::UnknownUri {
                uri: uri.to_string(),
                path: self.path.clone(),
            })
    }

    /// Uris in sorted order.
    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.timelines.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// MDTM parser
// ---------------------------------------------------------------------------

/// Parser for MDTM files:
/// `uri channel start duration modality confidence subtype label` per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct MdtmParser;

/// Parsed MDTM file: one annotation per uri.
#[derive(Debug, Clone)]
pub struct MdtmFile {
    path: PathBuf,
    annotations: BTreeMap<String, Annotation>,
}

impl MdtmParser {
    pub fn new() -> Self {
        MdtmParser
    }

    pub fn read(&self, path: &Path) -> Result<MdtmFile> {
        let text = read_text(path)?;
        let mdtm = self.parse(&text, path)?;
        debug!("parsed {} uris from {}", mdtm.annotations.len(), path.display());
        Ok(mdtm)
    }

    /// Parse MDTM content. `path` is only used in error messages.
    pub fn parse(&self, text: &str, path: &Path) -> Result<MdtmFile> {
        let mut annotations: BTreeMap<String, Annotation> = BTreeMap::new();
        for (line, fields) in data_lines(text) {
            if fields.len() < 8 {
                return Err(DatabaseError::malformed(
                    path,
                    line,
                    format!("expected 8 fields, got {}", fields.len()),
                ));
            }
            let uri = fields[0];
            let start = parse_time(fields[2], path, line, "start")?;
            let duration = parse_time(fields[3], path, line, "duration")?;
            if duration < 0.0 {
                return Err(DatabaseError::malformed(
                    path,
                    line,
                    format!("negative duration {duration}"),
                ));
            }
            annotations
                .entry(uri.to_string())
                .or_insert_with(|| Annotation::new(uri))
                .insert(Segment::new(start, start + duration), fields[7]);
        }
        Ok(MdtmFile {
            path: path.to_path_buf(),
            annotations,
        })
    }
}

impl MdtmFile {
    /// Annotation of `uri`.
    pub fn lookup(&self, uri: &str) -> Result<Annotation> {
        self.annotations
            .get(uri)
            .cloned()
            .ok_or_else(|| DatabaseError::UnknownUri {
                uri: uri.to_string(),
                path: self.path.clone(),
            })
    }

    /// Uris in sorted order.
    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.annotations.keys().map(String::as_str)
    }
}
