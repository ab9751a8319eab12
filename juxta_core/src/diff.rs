//! Diff rendering for a resolved commit range.

use juxta_api::{Diff, DiffFile, IncompleteReason, RevisionRange, WhitespaceMode};
use tracing::debug;

use crate::backend::GitHandle;
use crate::config::DiffSection;
use crate::Result;

/// Size limits applied to a rendered diff. Zero disables a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffLimits {
    /// Lines kept per file.
    pub max_lines: usize,
    /// Longest line, in characters, before a file's hunks are withheld.
    pub max_line_chars: usize,
    /// Files kept per diff.
    pub max_files: usize,
}

impl DiffLimits {
    /// No limits at all.
    pub const UNLIMITED: Self = Self {
        max_lines: 0,
        max_line_chars: 0,
        max_files: 0,
    };

    /// Limits from the `[diff]` section.
    #[must_use]
    pub const fn from_config(section: &DiffSection) -> Self {
        Self {
            max_lines: section.max_lines,
            max_line_chars: section.max_line_chars,
            max_files: section.max_files,
        }
    }
}

impl Default for DiffLimits {
    fn default() -> Self {
        Self::from_config(&DiffSection::default())
    }
}

/// Per-request diff options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Whitespace handling.
    pub whitespace: WhitespaceMode,
    /// Drop files whose path sorts before this one.
    pub skip_to: Option<String>,
}

/// Entry point for diff generation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffEngine {
    limits: DiffLimits,
}

impl DiffEngine {
    /// Construct a diff engine enforcing `limits`.
    #[must_use]
    pub const fn new(limits: DiffLimits) -> Self {
        Self { limits }
    }

    /// Limits in effect.
    #[must_use]
    pub const fn limits(&self) -> DiffLimits {
        self.limits
    }

    /// Diff `before..after` in `handle`, with renames and copies detected.
    ///
    /// # Errors
    ///
    /// Propagates backend errors when either commit cannot be read.
    pub fn diff(
        &self,
        handle: &dyn GitHandle,
        before: &str,
        after: &str,
        options: &DiffOptions,
    ) -> Result<Diff> {
        let range = RevisionRange {
            base: Some(handle.commit(before)?),
            head: handle.commit(after)?,
        };
        let files = handle.diff_files(before, after, options.whitespace)?;
        let diff = self.apply_limits(range, files, options.skip_to.as_deref());
        debug!(
            before,
            after,
            files = diff.files.len(),
            incomplete = diff.is_incomplete,
            "rendered diff"
        );
        Ok(diff)
    }

    /// Apply `skip_to` and the size limits to an unbounded file list.
    #[must_use]
    pub fn apply_limits(
        &self,
        range: RevisionRange,
        mut files: Vec<DiffFile>,
        skip_to: Option<&str>,
    ) -> Diff {
        if let Some(skip_to) = skip_to.filter(|path| !path.is_empty()) {
            files.retain(|file| file.path.as_str() >= skip_to);
        }

        let mut is_incomplete = false;
        if self.limits.max_files > 0 && files.len() > self.limits.max_files {
            files.truncate(self.limits.max_files);
            is_incomplete = true;
        }

        for file in &mut files {
            self.limit_file(file);
        }

        Diff {
            range,
            files,
            is_incomplete,
        }
    }

    fn limit_file(&self, file: &mut DiffFile) {
        let max_chars = self.limits.max_line_chars;
        if max_chars > 0
            && file
                .hunks
                .iter()
                .flat_map(|hunk| &hunk.lines)
                .any(|line| line.text.chars().count() > max_chars)
        {
            file.hunks.clear();
            file.is_incomplete = true;
            file.incomplete_reason = Some(IncompleteReason::LineTooLong);
            return;
        }

        let max_lines = self.limits.max_lines;
        if max_lines == 0 || file.line_count() <= max_lines {
            return;
        }

        let mut budget = max_lines;
        let mut kept = 0;
        for hunk in &mut file.hunks {
            if budget == 0 {
                break;
            }
            hunk.lines.truncate(budget);
            budget -= hunk.lines.len();
            kept += 1;
        }
        file.hunks.truncate(kept);
        file.is_incomplete = true;
        file.incomplete_reason = Some(IncompleteReason::TooManyLines);
    }
}
