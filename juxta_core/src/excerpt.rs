//! Expansion of collapsed regions between diff hunks.
//!
//! A rendered diff hides unchanged lines between hunks. Each expansion step
//! reveals up to `chunk_size` of them, reading straight from the blob, and
//! returns a section row describing what is still hidden.

use std::io::{self, BufRead};

use camino::Utf8Path;
use juxta_api::{DiffLine, DiffRange, Excerpt, ExcerptWindow, ExpandDirection, SectionInfo};
use tracing::debug;

use crate::backend::GitHandle;
use crate::config::ExcerptSection;
use crate::repository::trim_line_ending;
use crate::{Error, Result};

/// Lines revealed per step unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: u32 = 20;

/// Reveals collapsed lines in fixed-size steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkPaginator {
    chunk_size: u32,
}

impl Default for HunkPaginator {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl HunkPaginator {
    /// Paginator revealing `chunk_size` lines per step (at least one).
    #[must_use]
    pub const fn new(chunk_size: u32) -> Self {
        Self {
            chunk_size: if chunk_size == 0 { 1 } else { chunk_size },
        }
    }

    /// Paginator configured from the `[excerpt]` section.
    #[must_use]
    pub const fn from_config(section: &ExcerptSection) -> Self {
        Self::new(section.chunk_size)
    }

    /// Lines revealed per step.
    #[must_use]
    pub const fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Expand `path` as of `commit`, reading the blob through `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlobNotFound`] when the path does not name a file at
    /// `commit` and [`Error::Read`] when streaming the blob fails.
    pub fn expand_blob(
        &self,
        handle: &dyn GitHandle,
        commit: &str,
        path: &Utf8Path,
        window: ExcerptWindow,
        direction: ExpandDirection,
    ) -> Result<Excerpt> {
        let reader = handle.blob_reader(commit, path)?;
        self.expand(reader, path.as_str(), window, direction)
    }

    /// Expand the collapsed region described by `window` with lines from `reader`.
    ///
    /// A file shorter than the window yields fewer lines; that is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] when reading fails.
    pub fn expand<R: BufRead>(
        &self,
        mut reader: R,
        path: &str,
        window: ExcerptWindow,
        direction: ExpandDirection,
    ) -> Result<Excerpt> {
        let chunk = self.chunk_size;
        let mut window = window;
        let partial = window.gap() > chunk;

        let read = |reader: &mut R, left: u32, right: u32, count: u32| {
            read_lines(reader, left, right, count).map_err(|source| Error::Read {
                path: path.to_owned(),
                source,
            })
        };

        let mut lines = match direction {
            ExpandDirection::Up if partial => {
                window.left = window.left.saturating_sub(chunk);
                window.right = window.right.saturating_sub(chunk);
                window.left_hunk_size = window.left_hunk_size.saturating_add(chunk);
                window.right_hunk_size = window.right_hunk_size.saturating_add(chunk);
                read(
                    &mut reader,
                    window.left.saturating_sub(1),
                    window.right.saturating_sub(1),
                    chunk,
                )?
            }
            ExpandDirection::Down if partial => {
                let lines = read(&mut reader, window.last_left, window.last_right, chunk)?;
                window.last_left = window.last_left.saturating_add(chunk);
                window.last_right = window.last_right.saturating_add(chunk);
                lines
            }
            _ => {
                let remaining = window.right.saturating_sub(window.last_right);
                let count = match direction {
                    // the first line of the hunk below is already shown
                    ExpandDirection::Up => remaining.saturating_sub(1),
                    ExpandDirection::Down => remaining,
                };
                let lines = read(&mut reader, window.last_left, window.last_right, count)?;
                window.left_hunk_size = 0;
                window.right_hunk_size = 0;
                window.left = window.last_left;
                window.right = window.last_right;
                lines
            }
        };

        if window.is_collapsed() {
            let text = if window.left_hunk_size > 0 || window.right_hunk_size > 0 {
                DiffRange {
                    base_start: window.left,
                    base_lines: window.left_hunk_size,
                    head_start: window.right,
                    head_lines: window.right_hunk_size,
                }
                .unified_header()
            } else {
                String::new()
            };
            let row = DiffLine::section(
                text,
                SectionInfo {
                    path: path.to_owned(),
                    window,
                },
            );
            match direction {
                ExpandDirection::Up => lines.insert(0, row),
                ExpandDirection::Down => lines.push(row),
            }
        }

        debug!(
            path,
            ?direction,
            revealed = lines.iter().filter(|line| line.section.is_none()).count(),
            collapsed = window.is_collapsed(),
            "expanded collapsed region"
        );
        Ok(Excerpt { lines, window })
    }
}

/// Read `count` lines starting at 0-based head line `start_right`.
///
/// Base-side numbers are projected from `start_left` by the same offset.
fn read_lines<R: BufRead>(
    reader: &mut R,
    start_left: u32,
    start_right: u32,
    count: u32,
) -> io::Result<Vec<DiffLine>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    for _ in 0..start_right {
        if !skip_line(reader)? {
            return Ok(Vec::new());
        }
    }

    // `count` comes from the caller's window and may far exceed the file
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    for offset in 0..count {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&buf);
        lines.push(DiffLine::context(
            trim_line_ending(&text),
            start_left.saturating_add(offset).saturating_add(1),
            start_right.saturating_add(offset).saturating_add(1),
        ));
    }
    Ok(lines)
}

/// Consume one line without keeping it; `false` at end of input.
fn skip_line<R: BufRead>(reader: &mut R) -> io::Result<bool> {
    let mut consumed = false;
    loop {
        let (found, used) = {
            let available = match reader.fill_buf() {
                Ok(available) => available,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            if available.is_empty() {
                return Ok(consumed);
            }
            match available.iter().position(|&byte| byte == b'\n') {
                Some(index) => (true, index + 1),
                None => (false, available.len()),
            }
        };
        reader.consume(used);
        consumed = true;
        if found {
            return Ok(true);
        }
    }
}
