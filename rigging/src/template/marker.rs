//! Marker-based fragment insertion
//!
//! A marker is any line containing `rigging:marker <id>`, whatever comment
//! syntax surrounds it:
//!
//! ```text
//! // rigging:marker models
//! {# rigging:marker nav #}
//! -- rigging:marker seeds
//! ```
//!
//! Fragments are inserted directly above the marker line so later runs can
//! keep appending. Re-inserting a fragment that is already present is a no-op.

use crate::error::{Error, Result};

/// Tag that introduces a marker id
pub const MARKER_TAG: &str = "rigging:marker";

/// Result of a merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Fragment was inserted; carries the new content
    Inserted(String),
    /// Fragment was already present
    Unchanged,
}

impl MergeOutcome {
    /// Content after the merge
    #[must_use]
    pub fn content<'a>(&'a self, existing: &'a str) -> &'a str {
        match self {
            Self::Inserted(content) => content,
            Self::Unchanged => existing,
        }
    }

    /// Whether the merge changed anything
    #[must_use]
    pub const fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Build a marker line with the given comment prefix
///
/// ```
/// use rigging::template::marker_line;
///
/// assert_eq!(marker_line("//", "routes"), "// rigging:marker routes");
/// ```
#[must_use]
pub fn marker_line(comment_prefix: &str, id: &str) -> String {
    format!("{comment_prefix} {MARKER_TAG} {id}")
}

fn marker_id(line: &str) -> Option<&str> {
    let (_, rest) = line.split_once(MARKER_TAG)?;
    rest.split_whitespace().next()
}

/// Insert `fragment` before the marker named `marker_id`
///
/// The fragment is newline terminated before insertion. The merge is a no-op
/// only when the fragment already sits directly above the marker and starts on
/// a line boundary. A copy further up the file does not count.
///
/// # Errors
///
/// [`Error::MarkerNotFound`] if no line carries the marker and
/// [`Error::DuplicateMarker`] if more than one does.
pub fn merge_at_marker(existing: &str, marker: &str, fragment: &str) -> Result<MergeOutcome> {
    let mut offset = 0;
    let mut found = None;
    for line in existing.split_inclusive('\n') {
        if marker_id(line) == Some(marker) {
            if found.is_some() {
                return Err(Error::DuplicateMarker(marker.to_string()));
            }
            found = Some(offset);
        }
        offset += line.len();
    }
    let Some(position) = found else {
        return Err(Error::MarkerNotFound(marker.to_string()));
    };

    if fragment.trim().is_empty() {
        return Ok(MergeOutcome::Unchanged);
    }
    let mut fragment = fragment.to_string();
    if !fragment.ends_with('\n') {
        fragment.push('\n');
    }

    let (before, after) = existing.split_at(position);
    if ends_with_lines(before, &fragment) {
        return Ok(MergeOutcome::Unchanged);
    }

    Ok(MergeOutcome::Inserted(format!("{before}{fragment}{after}")))
}

/// Whether `text` ends with `lines` and `lines` starts a line of `text`
fn ends_with_lines(text: &str, lines: &str) -> bool {
    text.strip_suffix(lines)
        .is_some_and(|head| head.is_empty() || head.ends_with('\n'))
}
