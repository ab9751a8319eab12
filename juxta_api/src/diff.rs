use serde::{Deserialize, Serialize};

use crate::excerpt::SectionInfo;
use crate::repository::RevisionRange;

/// A full diff produced for a given revision range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    /// The revisions that were compared to produce this diff.
    pub range: RevisionRange,
    /// File-level diffs contained in this diff.
    #[serde(default)]
    pub files: Vec<DiffFile>,
    /// Set when files were dropped because the diff exceeded the file limit.
    #[serde(default)]
    pub is_incomplete: bool,
}

/// Representation of the diff for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffFile {
    /// Path of the file relative to the repository root.
    pub path: String,
    /// Previous path when the file was renamed or copied.
    #[serde(default)]
    pub old_path: Option<String>,
    /// Status of the file change in the diff.
    pub status: FileStatus,
    /// High-level summary of insertions/deletions.
    #[serde(default)]
    pub stats: DiffStats,
    /// Indicates whether the diff content is binary.
    #[serde(default)]
    pub is_binary: bool,
    /// Set when some of the file's lines were withheld.
    #[serde(default)]
    pub is_incomplete: bool,
    /// Why the file is incomplete, when it is.
    #[serde(default)]
    pub incomplete_reason: Option<IncompleteReason>,
    /// The hunks that make up this file diff.
    #[serde(default)]
    pub hunks: Vec<DiffHunk>,
}

impl DiffFile {
    /// Total number of lines across every hunk.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.hunks.iter().map(|hunk| hunk.lines.len()).sum()
    }
}

/// Reason a file diff was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompleteReason {
    /// The file has more lines than the configured per-file limit.
    TooManyLines,
    /// A single line is longer than the configured character limit.
    LineTooLong,
}

/// Summary information about the changes within a file diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DiffStats {
    /// Number of added lines.
    pub additions: u32,
    /// Number of removed lines.
    pub deletions: u32,
}

impl DiffStats {
    /// A stats instance with zero additions and deletions.
    pub const ZERO: Self = Self {
        additions: 0,
        deletions: 0,
    };

    /// Convenience constructor for explicit values.
    #[must_use]
    pub const fn new(additions: u32, deletions: u32) -> Self {
        Self {
            additions,
            deletions,
        }
    }

    /// Combine two stats structs.
    #[must_use]
    pub const fn add(self, other: Self) -> Self {
        Self {
            additions: self.additions + other.additions,
            deletions: self.deletions + other.deletions,
        }
    }
}

/// A diff hunk containing a contiguous set of changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    /// The range header describing the hunk offsets.
    pub header: DiffRange,
    /// Optional section header (e.g., function signature) extracted from the diff.
    #[serde(default)]
    pub section: Option<String>,
    /// Line-level changes inside the hunk.
    #[serde(default)]
    pub lines: Vec<DiffLine>,
}

/// The line number ranges referenced by a hunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRange {
    /// Starting line number for the base side.
    pub base_start: u32,
    /// Number of lines covered on the base side.
    pub base_lines: u32,
    /// Starting line number for the head side.
    pub head_start: u32,
    /// Number of lines covered on the head side.
    pub head_lines: u32,
}

impl DiffRange {
    /// Render the range the way unified diffs do, e.g. `@@ -3,4 +3,6 @@`.
    #[must_use]
    pub fn unified_header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.base_start, self.base_lines, self.head_start, self.head_lines
        )
    }
}

/// A single line within a diff hunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    /// The role the line plays in the diff.
    pub kind: DiffLineKind,
    /// Raw text of the line, without the unified-diff prefix column.
    pub text: String,
    /// 1-based line number on the base side if applicable.
    #[serde(default)]
    pub base_line: Option<u32>,
    /// 1-based line number on the head side if applicable.
    #[serde(default)]
    pub head_line: Option<u32>,
    /// Expansion state carried by [`DiffLineKind::Section`] rows.
    #[serde(default)]
    pub section: Option<SectionInfo>,
}

impl DiffLine {
    /// An unchanged line present on both sides.
    #[must_use]
    pub fn context(text: impl Into<String>, base_line: u32, head_line: u32) -> Self {
        Self {
            kind: DiffLineKind::Context,
            text: text.into(),
            base_line: Some(base_line),
            head_line: Some(head_line),
            section: None,
        }
    }

    /// A synthetic expander row describing a still-collapsed region.
    #[must_use]
    pub fn section(text: impl Into<String>, info: SectionInfo) -> Self {
        Self {
            kind: DiffLineKind::Section,
            text: text.into(),
            base_line: None,
            head_line: None,
            section: Some(info),
        }
    }
}

/// Type of a line contained in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffLineKind {
    /// Unchanged context line.
    Context,
    /// A newly added line.
    Addition,
    /// A deleted line.
    Deletion,
    /// Synthetic hunk header marking a collapsed region.
    Section,
}

/// File status from the diff's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// File only exists in the head side.
    Added,
    /// File only exists in the base side.
    Deleted,
    /// File exists on both sides with modifications.
    Modified,
    /// File path changed between base and head.
    Renamed,
    /// File content copied from another location.
    Copied,
    /// File type changed (e.g., text -> symlink).
    TypeChange,
}

/// How whitespace differences are treated when computing a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WhitespaceMode {
    /// Every whitespace change is shown.
    #[default]
    ShowAll,
    /// Ignore whitespace entirely (`-w`).
    IgnoreAll,
    /// Ignore changes in the amount of whitespace (`-b`).
    IgnoreChange,
    /// Ignore whitespace at end of line.
    IgnoreEol,
}

impl WhitespaceMode {
    /// Parse the query-string flag used by compare URLs.
    ///
    /// Unknown values fall back to [`WhitespaceMode::ShowAll`].
    #[must_use]
    pub fn from_flag(flag: &str) -> Self {
        match flag {
            "ignore-all" => Self::IgnoreAll,
            "ignore-change" => Self::IgnoreChange,
            "ignore-eol" => Self::IgnoreEol,
            _ => Self::ShowAll,
        }
    }
}
