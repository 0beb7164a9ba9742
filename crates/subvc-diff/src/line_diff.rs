//! Line-level diff: longest-common-subsequence hunks between two texts.
//!
//! Uses the `similar` crate with its LCS algorithm. Consecutive non-equal
//! operations are folded into one [`Hunk`]; a hunk that both removes and
//! adds lines is a [`HunkKind::Change`].

use std::time::Duration;

use serde::Serialize;
use similar::{Algorithm, DiffTag, TextDiff};

/// Split text into lines the way the engine counts them.
///
/// A trailing newline does not produce an empty final line, empty text has
/// zero lines, and `\r\n` counts as a single break.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HunkKind {
    /// Lines only added.
    Insert,
    /// Lines only removed.
    Delete,
    /// Lines removed and replaced by other lines.
    Change,
}

/// A contiguous block of line changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Hunk {
    pub kind: HunkKind,
    /// 0-based index of the first affected source line.
    pub source_pos: usize,
    pub source_lines: Vec<String>,
    /// 0-based index of the first affected target line.
    pub target_pos: usize,
    pub target_lines: Vec<String>,
}

impl Hunk {
    pub fn source_len(&self) -> usize {
        self.source_lines.len()
    }

    pub fn target_len(&self) -> usize {
        self.target_lines.len()
    }

    fn new(source_pos: usize, target_pos: usize) -> Self {
        Self {
            kind: HunkKind::Change,
            source_pos,
            source_lines: Vec::new(),
            target_pos,
            target_lines: Vec::new(),
        }
    }

    fn seal(mut self) -> Self {
        self.kind = match (self.source_lines.is_empty(), self.target_lines.is_empty()) {
            (true, _) => HunkKind::Insert,
            (_, true) => HunkKind::Delete,
            _ => HunkKind::Change,
        };
        self
    }
}

/// Line tallies for one file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LineCounts {
    pub added: usize,
    pub deleted: usize,
    pub modified: usize,
}

impl LineCounts {
    /// Tally a hunk list.
    ///
    /// Every inserted line counts as added and every removed line as
    /// deleted. A change hunk additionally contributes
    /// `max(removed, inserted)` to `modified`.
    pub fn from_hunks(hunks: &[Hunk]) -> Self {
        hunks.iter().fold(Self::default(), |mut counts, hunk| {
            counts.added += hunk.target_len();
            counts.deleted += hunk.source_len();
            if hunk.kind == HunkKind::Change {
                counts.modified += hunk.source_len().max(hunk.target_len());
            }
            counts
        })
    }
}

/// Compute the hunks that turn `source` into `target`.
///
/// With a `timeout` the LCS search may give up early and return a valid but
/// less minimal hunk list.
pub fn compute_hunks(source: &[&str], target: &[&str], timeout: Option<Duration>) -> Vec<Hunk> {
    let mut config = TextDiff::configure();
    config.algorithm(Algorithm::Lcs);
    if let Some(timeout) = timeout {
        config.timeout(timeout);
    }
    let diff = config.diff_slices(source, target);

    let mut hunks = Vec::new();
    let mut current: Option<Hunk> = None;

    for op in diff.ops() {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        if tag == DiffTag::Equal {
            if let Some(hunk) = current.take() {
                hunks.push(hunk.seal());
            }
            continue;
        }

        let hunk = current.get_or_insert_with(|| Hunk::new(old_range.start, new_range.start));
        hunk.source_lines
            .extend(source[old_range].iter().map(|line| line.to_string()));
        hunk.target_lines
            .extend(target[new_range].iter().map(|line| line.to_string()));
    }
    if let Some(hunk) = current {
        hunks.push(hunk.seal());
    }

    hunks
}
