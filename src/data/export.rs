use std::io::Write;

use serde::Serialize;

use super::model::ProtocolFile;
use crate::error::{DatabaseError, Result};

// ---------------------------------------------------------------------------
// JSON lines: one protocol file per line
// ---------------------------------------------------------------------------

/// Write each file as a single JSON object followed by a newline.
pub fn write_json_lines<W, I>(mut out: W, files: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = Result<ProtocolFile>>,
{
    let mut count = 0;
    for file in files {
        serde_json::to_writer(&mut out, &file?)?;
        out.write_all(b"\n")
            .map_err(|e| DatabaseError::io("<output>", e))?;
        count += 1;
    }
    Ok(count)
}

// ---------------------------------------------------------------------------
// CSV: one speaker turn per row
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct TurnRow<'a> {
    uri: &'a str,
    start: f64,
    end: f64,
    track: &'a str,
    label: &'a str,
}

/// Write every speaker turn as `uri,start,end,track,label`.
pub fn write_turns_csv<W, I>(out: W, files: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = Result<ProtocolFile>>,
{
    let mut writer = csv::Writer::from_writer(out);
    let mut rows = 0;
    for file in files {
        let file = file?;
        for turn in file.annotation.turns() {
            writer.serialize(TurnRow {
                uri: &file.uri,
                start: turn.segment.start,
                end: turn.segment.end,
                track: &turn.track,
                label: &turn.label,
            })?;
            rows += 1;
        }
    }
    writer
        .flush()
        .map_err(|e| DatabaseError::io("<output>", e))?;
    Ok(rows)
}
