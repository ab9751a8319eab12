use serde::{Deserialize, Serialize};

use crate::diff::DiffLine;

/// Direction in which a collapsed region is expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpandDirection {
    /// Reveal lines above the hunk that follows the collapsed region.
    Up,
    /// Reveal lines below the hunk that precedes the collapsed region.
    Down,
}

/// Position of a collapsed region between two rendered hunks.
///
/// `last_*` is the last line shown before the region, `left`/`right` the first
/// line of the hunk after it. All numbers are 1-based; left is the base side,
/// right the head side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExcerptWindow {
    /// Last base-side line already shown above the region.
    pub last_left: u32,
    /// Last head-side line already shown above the region.
    pub last_right: u32,
    /// First base-side line of the hunk below the region.
    pub left: u32,
    /// First head-side line of the hunk below the region.
    pub right: u32,
    /// Base-side line count of the hunk below the region.
    #[serde(default)]
    pub left_hunk_size: u32,
    /// Head-side line count of the hunk below the region.
    #[serde(default)]
    pub right_hunk_size: u32,
}

impl ExcerptWindow {
    /// Number of collapsed rows between the last shown line and the next hunk.
    #[must_use]
    pub const fn gap(&self) -> u32 {
        self.left.saturating_sub(self.last_left)
    }

    /// Whether the region still hides lines.
    #[must_use]
    pub const fn is_collapsed(&self) -> bool {
        self.right > self.last_right
    }
}

/// State attached to a synthetic section row so a client can expand further.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionInfo {
    /// Repository-relative path of the file.
    pub path: String,
    /// Window describing the region that is still collapsed.
    pub window: ExcerptWindow,
}

/// Result of expanding a collapsed region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Excerpt {
    /// Revealed rows, including a synthetic section row when lines remain hidden.
    pub lines: Vec<DiffLine>,
    /// Window after the expansion.
    pub window: ExcerptWindow,
}

impl Excerpt {
    /// Rows that carry file content, skipping synthetic section rows.
    pub fn content_lines(&self) -> impl Iterator<Item = &DiffLine> + '_ {
        self.lines.iter().filter(|line| line.section.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_and_collapsed_state() {
        let window = ExcerptWindow {
            last_left: 10,
            last_right: 12,
            left: 40,
            right: 42,
            left_hunk_size: 3,
            right_hunk_size: 4,
        };
        assert_eq!(window.gap(), 30);
        assert!(window.is_collapsed());

        let merged = ExcerptWindow {
            left: 10,
            right: 12,
            ..window
        };
        assert_eq!(merged.gap(), 0);
        assert!(!merged.is_collapsed());
    }

    #[test]
    fn hunk_sizes_default_to_zero() {
        let json = r#"{"last_left": 1, "last_right": 1, "left": 30, "right": 30}"#;
        let window: ExcerptWindow = serde_json::from_str(json).expect("deserialize window");
        assert_eq!(window.left_hunk_size, 0);
        assert_eq!(window.right_hunk_size, 0);
    }

    #[test]
    fn direction_is_snake_case() {
        let json = serde_json::to_string(&ExpandDirection::Down).expect("serialize direction");
        assert_eq!(json, "\"down\"");
    }
}
