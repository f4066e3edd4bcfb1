use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::parser::{classify_line, Field, LineKind};
use super::Sample;

pub const DEFAULT_BUFFER_CAPACITY: usize = 100;
/// The legacy device prints one field per line; this many lines make a group.
pub const FREE_TEXT_GROUP_LINES: usize = 10;
/// Upper bound accepted from settings.
pub const MAX_BUFFER_CAPACITY: usize = 1_000_000;

/// Counters describing what the reader has seen on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderStats {
    pub lines_read: u64,
    pub samples_parsed: u64,
    pub headers_seen: u64,
    pub unrecognized_lines: u64,
    pub partial_buffer_trims: u64,
}

#[derive(Debug, Default)]
struct FreeTextGroup {
    sample: Sample,
    seen: [bool; 5],
    lines: usize,
}

impl FreeTextGroup {
    fn has(&self, field: Field) -> bool {
        self.seen[field.index()]
    }

    fn set(&mut self, field: Field, value: f64) {
        self.sample.set_field(field, value);
        self.seen[field.index()] = true;
    }
}

/// Fixed-capacity ring of the most recent samples plus the state needed to
/// assemble legacy free-text groups.
#[derive(Debug)]
pub struct SampleBuffer {
    ring: VecDeque<Sample>,
    capacity: usize,
    header_seen: bool,
    pending: Option<FreeTextGroup>,
    fresh: bool,
    stats: ReaderStats,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ring: VecDeque::with_capacity(capacity.min(DEFAULT_BUFFER_CAPACITY)),
            capacity,
            header_seen: false,
            pending: None,
            fresh: false,
            stats: ReaderStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn header_seen(&self) -> bool {
        self.header_seen
    }

    pub fn stats(&self) -> &ReaderStats {
        &self.stats
    }

    pub(crate) fn note_partial_trim(&mut self) {
        self.stats.partial_buffer_trims += 1;
    }

    /// Most recent completed sample, whether or not it was already taken.
    pub fn latest(&self) -> Option<&Sample> {
        self.ring.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.ring.iter()
    }

    /// Feed one raw line. `stamp` is the wall-clock time attached to any
    /// sample this line completes.
    pub fn ingest_line(&mut self, line: &str, stamp: &str) {
        if line.trim().is_empty() {
            return;
        }
        self.stats.lines_read += 1;

        match classify_line(line) {
            LineKind::Header => {
                self.header_seen = true;
                self.stats.headers_seen += 1;
            }
            LineKind::Sample(mut sample) => {
                self.flush_pending(stamp);
                sample.wall_clock_timestamp = stamp.to_string();
                self.push(sample);
            }
            LineKind::Field(field, value) => {
                if self.pending.as_ref().is_some_and(|group| group.has(field)) {
                    self.flush_pending(stamp);
                }
                self.pending.get_or_insert_with(FreeTextGroup::default).set(field, value);
                self.count_group_line(stamp);
            }
            LineKind::Unrecognized => {
                self.stats.unrecognized_lines += 1;
                log::debug!("Discarding unrecognized line: {:?}", line);
                self.count_group_line(stamp);
            }
        }
    }

    // A free-text group spans at most FREE_TEXT_GROUP_LINES consecutive lines,
    // noise included.
    fn count_group_line(&mut self, stamp: &str) {
        let Some(group) = self.pending.as_mut() else {
            return;
        };
        group.lines += 1;
        if group.lines >= FREE_TEXT_GROUP_LINES {
            self.flush_pending(stamp);
        }
    }

    /// Close out a partially assembled free-text group, if any.
    pub fn flush_pending(&mut self, stamp: &str) {
        if let Some(group) = self.pending.take() {
            let mut sample = group.sample;
            sample.wall_clock_timestamp = stamp.to_string();
            self.push(sample);
        }
    }

    /// The newest sample if one completed since the previous call.
    pub fn take_latest(&mut self) -> Option<Sample> {
        if !self.fresh {
            return None;
        }
        self.fresh = false;
        self.ring.back().cloned()
    }

    fn push(&mut self, sample: Sample) {
        if self.ring.len() == self.capacity {
            self.ring.pop_front();
        }
        self.ring.push_back(sample);
        self.fresh = true;
        self.stats.samples_parsed += 1;
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}
