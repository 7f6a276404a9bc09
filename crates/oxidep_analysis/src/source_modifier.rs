//! Byte-range replacements applied to source files by autofixes.

use anyhow::{Context, Result};
use log::{debug, trace};
use serde::Serialize;
use std::{collections::HashMap, fs};

use oxidep_core::to_os_path;

/// Replace `[start, end)` of the original content with `text`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Change {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Change {
    pub fn removal(start: usize, end: usize) -> Self {
        Change { start, end, text: String::new() }
    }

    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Change { start, end, text: text.into() }
    }

    fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    fn overlaps(&self, other: &Change) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Apply `changes` to `content`. Of overlapping changes only the longest survives;
/// ranges outside the content are skipped.
pub fn apply_changes_to_bytes(content: &[u8], mut changes: Vec<Change>) -> Vec<u8> {
    if changes.is_empty() {
        return content.to_vec();
    }

    changes.sort_by(|a, b| b.len().cmp(&a.len()).then(a.start.cmp(&b.start)));

    let mut picked: Vec<Change> = Vec::with_capacity(changes.len());
    for change in changes {
        if picked.iter().any(|p| p.overlaps(&change)) {
            trace!("Dropping overlapping change {}..{}", change.start, change.end);
            continue;
        }
        picked.push(change);
    }
    picked.sort_by_key(|c| c.start);

    let mut out = Vec::with_capacity(content.len());
    let mut last = 0;
    for change in &picked {
        if change.end < change.start || change.end > content.len() || change.start < last {
            continue;
        }
        out.extend_from_slice(&content[last..change.start]);
        out.extend_from_slice(change.text.as_bytes());
        last = change.end;
    }
    out.extend_from_slice(&content[last..]);
    out
}

pub fn apply_changes_to_content(content: &str, changes: Vec<Change>) -> String {
    let bytes = apply_changes_to_bytes(content.as_bytes(), changes);
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Rewrite every file in `changes_by_file` in place.
pub fn apply_file_changes(changes_by_file: HashMap<String, Vec<Change>>) -> Result<()> {
    for (file, changes) in changes_by_file {
        let path = to_os_path(&file);
        let content = fs::read(&path).with_context(|| format!("Failed to read {}", file))?;
        debug!("Applying {} changes to {}", changes.len(), file);
        let updated = apply_changes_to_bytes(&content, changes);
        fs::write(&path, updated).with_context(|| format!("Failed to write {}", file))?;
    }
    Ok(())
}
