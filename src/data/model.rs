use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Segment – a time interval in seconds
// ---------------------------------------------------------------------------

/// Half-open time interval `[start, end)` in seconds.
///
/// Ordered by `(start, end)` using `total_cmp` so segments can live in
/// sorted collections.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
}

impl Segment {
    pub fn new(start: f64, end: f64) -> Self {
        Segment { start, end }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Intersection of two segments, `None` when they do not overlap.
    pub fn intersection(&self, other: &Segment) -> Option<Segment> {
        let seg = Segment::new(self.start.max(other.start), self.end.min(other.end));
        (!seg.is_empty()).then_some(seg)
    }
}

// -- Manual Eq/Ord so segments sort deterministically --

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Segment {}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .total_cmp(&other.start)
            .then_with(|| self.end.total_cmp(&other.end))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.3} --> {:.3}]", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Timeline – annotated extent of one recording
// ---------------------------------------------------------------------------

/// Sorted, duplicate-free set of segments belonging to one recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub uri: String,
    segments: Vec<Segment>,
}

impl Timeline {
    pub fn new(uri: impl Into<String>) -> Self {
        Timeline {
            uri: uri.into(),
            segments: Vec::new(),
        }
    }

    pub fn from_segments(uri: impl Into<String>, segments: impl IntoIterator<Item = Segment>) -> Self {
        let mut timeline = Timeline::new(uri);
        for segment in segments {
            timeline.add(segment);
        }
        timeline
    }

    /// Insert a segment, keeping the timeline sorted. Duplicates are ignored.
    pub fn add(&mut self, segment: Segment) {
        if let Err(pos) = self.segments.binary_search(&segment) {
            self.segments.insert(pos, segment);
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Smallest segment covering every segment of the timeline.
    pub fn extent(&self) -> Option<Segment> {
        let start = self.segments.first()?.start;
        let end = self
            .segments
            .iter()
            .map(|s| s.end)
            .fold(f64::NEG_INFINITY, f64::max);
        Some(Segment::new(start, end))
    }

    /// Merge overlapping or adjacent segments.
    pub fn support(&self) -> Timeline {
        let mut merged: Vec<Segment> = Vec::with_capacity(self.segments.len());
        for seg in &self.segments {
            match merged.last_mut() {
                Some(last) if seg.start <= last.end => last.end = last.end.max(seg.end),
                _ => merged.push(*seg),
            }
        }
        Timeline {
            uri: self.uri.clone(),
            segments: merged,
        }
    }

    /// Total covered duration (overlaps counted once).
    pub fn duration(&self) -> f64 {
        self.support().segments.iter().map(Segment::duration).sum()
    }
}

// ---------------------------------------------------------------------------
// Annotation – labelled segmentation of one recording
// ---------------------------------------------------------------------------

/// One labelled turn: a segment, a track name disambiguating identical
/// segments, and the speaker/segment label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Turn {
    pub segment: Segment,
    pub track: String,
    pub label: String,
}

/// Labelled segmentation, kept sorted by segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub uri: String,
    turns: Vec<Turn>,
}

impl Annotation {
    pub fn new(uri: impl Into<String>) -> Self {
        Annotation {
            uri: uri.into(),
            turns: Vec::new(),
        }
    }

    /// Add a labelled segment on a fresh track.
    ///
    /// Tracks are numbered per segment ("0", "1", ...) so that two speakers
    /// talking over the exact same interval are both kept. Turns sharing a
    /// segment stay in insertion order.
    pub fn insert(&mut self, segment: Segment, label: impl Into<String>) {
        let first = self.turns.partition_point(|t| t.segment < segment);
        let end = self.turns.partition_point(|t| t.segment <= segment);
        self.turns.insert(
            end,
            Turn {
                segment,
                track: (end - first).to_string(),
                label: label.into(),
            },
        );
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn labels(&self) -> BTreeSet<String> {
        self.turns.iter().map(|t| t.label.clone()).collect()
    }

    /// Timeline of every labelled segment.
    pub fn get_timeline(&self) -> Timeline {
        Timeline::from_segments(self.uri.clone(), self.turns.iter().map(|t| t.segment))
    }

    /// Speech duration of `label` (its own overlaps counted once).
    pub fn label_duration(&self, label: &str) -> f64 {
        Timeline::from_segments(
            self.uri.clone(),
            self.turns
                .iter()
                .filter(|t| t.label == label)
                .map(|t| t.segment),
        )
        .duration()
    }

    /// Per-label durations.
    pub fn chart(&self) -> BTreeMap<String, f64> {
        self.labels()
            .into_iter()
            .map(|label| {
                let duration = self.label_duration(&label);
                (label, duration)
            })
            .collect()
    }

    /// Restrict the annotation to the regions covered by `timeline`.
    /// Turns straddling a boundary are trimmed.
    pub fn crop(&self, timeline: &Timeline) -> Annotation {
        let support = timeline.support();
        let mut cropped = Annotation::new(self.uri.clone());
        for turn in &self.turns {
            for region in support.segments() {
                if let Some(segment) = turn.segment.intersection(region) {
                    cropped.insert(segment, turn.label.clone());
                }
            }
        }
        cropped
    }
}

// ---------------------------------------------------------------------------
// ProtocolFile – one recording yielded by a protocol
// ---------------------------------------------------------------------------

/// A single recording of a protocol subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolFile {
    /// Database name, constant per database.
    pub database: String,
    /// Recording identifier.
    pub uri: String,
    /// Extent that was actually annotated (from the UEM file).
    pub annotated: Timeline,
    /// Speaker turns (from the MDTM file).
    pub annotation: Annotation,
    /// Values produced by preprocessors: key → value.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_order_by_start_then_end() {
        let mut segs = vec![
            Segment::new(2.0, 3.0),
            Segment::new(1.0, 5.0),
            Segment::new(1.0, 2.0),
        ];
        segs.sort();
        assert_eq!(
            segs,
            vec![
                Segment::new(1.0, 2.0),
                Segment::new(1.0, 5.0),
                Segment::new(2.0, 3.0)
            ]
        );
    }

    #[test]
    fn timeline_support_merges_overlaps() {
        let timeline = Timeline::from_segments(
            "show",
            [
                Segment::new(0.0, 10.0),
                Segment::new(5.0, 12.0),
                Segment::new(20.0, 30.0),
                Segment::new(0.0, 10.0),
            ],
        );
        assert_eq!(timeline.len(), 3);
        let support = timeline.support();
        assert_eq!(
            support.segments(),
            &[Segment::new(0.0, 12.0), Segment::new(20.0, 30.0)]
        );
        assert!((timeline.duration() - 22.0).abs() < 1e-9);
        assert_eq!(timeline.extent(), Some(Segment::new(0.0, 30.0)));
    }

    #[test]
    fn annotation_keeps_overlapping_speakers_on_separate_tracks() {
        let mut ann = Annotation::new("show");
        ann.insert(Segment::new(0.0, 4.0), "alice");
        ann.insert(Segment::new(0.0, 4.0), "bob");
        ann.insert(Segment::new(4.0, 6.0), "alice");

        assert_eq!(ann.len(), 3);
        assert_eq!(ann.turns()[0].track, "0");
        assert_eq!(ann.turns()[1].track, "1");
        assert_eq!(ann.labels().len(), 2);
        assert!((ann.label_duration("alice") - 6.0).abs() < 1e-9);
        assert!((ann.chart()["bob"] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn track_numbers_follow_insertion_order_within_a_segment() {
        let mut ann = Annotation::new("show");
        let shared = Segment::new(1.0, 2.0);
        for i in 0..12 {
            ann.insert(shared, format!("spk{i}"));
            ann.insert(Segment::new(i as f64 * 10.0, i as f64 * 10.0 + 5.0), "other");
        }

        let tracks: Vec<(&str, &str)> = ann
            .turns()
            .iter()
            .filter(|t| t.segment == shared)
            .map(|t| (t.track.as_str(), t.label.as_str()))
            .collect();
        assert_eq!(tracks.len(), 12);
        assert_eq!(tracks[0], ("0", "spk0"));
        assert_eq!(tracks[11], ("11", "spk11"));
        assert!(ann
            .turns()
            .windows(2)
            .all(|w| w[0].segment <= w[1].segment));
    }

    #[test]
    fn crop_trims_turns_to_annotated_regions() {
        let mut ann = Annotation::new("show");
        ann.insert(Segment::new(0.0, 10.0), "alice");
        ann.insert(Segment::new(15.0, 18.0), "bob");
        let annotated = Timeline::from_segments("show", [Segment::new(5.0, 16.0)]);

        let cropped = ann.crop(&annotated);
        assert_eq!(cropped.len(), 2);
        assert_eq!(cropped.turns()[0].segment, Segment::new(5.0, 10.0));
        assert_eq!(cropped.turns()[1].segment, Segment::new(15.0, 16.0));
    }
}
