//! Diff engine for subvc.
//!
//! Computes per-file differences between two versions, producing a
//! structured change list, per-file line accounting, and a unified-diff
//! rendering for humans.
//!
//! # Key Types
//!
//! - [`Hunk`] / [`HunkKind`] -- contiguous line change (insert, delete, or change)
//! - [`ManifestChange`] -- path-level classification (added/modified/deleted)
//! - [`FileDiff`] / [`DiffLine`] -- per-file result, degraded in place on error
//! - [`VersionDiff`] / [`DiffSummary`] -- full result of [`DiffEngine::diff`]

pub mod engine;
pub mod error;
pub mod line_diff;
pub mod manifest;
pub mod model;
pub mod unified;

pub use engine::{DiffConfig, DiffEngine};
pub use error::{DiffError, DiffResult, FileDiffError};
pub use line_diff::{compute_hunks, split_lines, Hunk, HunkKind, LineCounts};
pub use manifest::{diff_manifests, ManifestChange};
pub use model::{ChangeType, DiffLine, DiffSummary, FileDiff, LineKind, VersionDiff};
pub use unified::{render_hunks, BINARY_MARKER};
