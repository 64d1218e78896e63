//! Incremental log line assembly from raw worker output
//!
//! Build workers stream raw stdout/stderr in arbitrary chunks, so a chunk
//! boundary can fall anywhere, including mid-line. [`LineAssembler`] keeps a
//! small cursor per build (last assigned line number plus the unterminated
//! tail of the most recent chunk) and turns each incoming chunk into numbered
//! [`LogLine`]s.
//!
//! A line that is still growing is emitted on every chunk under its reserved
//! number, each time with the text assembled so far. Consumers treat a
//! re-emitted number as superseding the earlier text, which is also why the
//! log store upserts by `(build_id, number)`.

use std::collections::HashMap;

use gantry_domain::{BuildId, LogLine};

/// Per-build reconstruction cursor.
#[derive(Debug, Default)]
struct BuildCursor {
    /// Highest line number assigned so far, including the number reserved
    /// for a pending partial line.
    last_number: u64,
    /// Unterminated tail of the most recent chunk, raw (carriage returns
    /// are stripped at emission, not here).
    partial: String,
}

/// Converts arbitrarily-chunked build output into numbered log lines.
///
/// Guarantees, per build id:
/// - line numbers are gapless and 1-based, independent of chunking
/// - concatenating the final text of every number, with `\n` restored
///   between them, reproduces the raw input modulo carriage returns
/// - state for different builds never interferes
#[derive(Debug, Default)]
pub struct LineAssembler {
    states: HashMap<BuildId, BuildCursor>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw chunk for a build, returning the lines it produced.
    ///
    /// Always returns at least one line: the first fragment of the chunk
    /// opens a new line or extends the pending partial, and is emitted
    /// either way. Fragments strictly between the first and last newline
    /// each become their own line. A non-empty fragment after the last
    /// newline becomes the new pending partial and reserves the next line
    /// number without being emitted yet.
    pub fn feed(&mut self, build_id: BuildId, chunk: &str) -> Vec<LogLine> {
        let cursor = self.states.entry(build_id).or_default();
        let fragments: Vec<&str> = chunk.split('\n').collect();

        if cursor.partial.is_empty() {
            cursor.last_number += 1;
        }
        cursor.partial.push_str(fragments[0]);

        let mut lines = Vec::with_capacity(fragments.len());
        lines.push(LogLine::new(
            build_id,
            cursor.last_number,
            strip_cr(&cursor.partial),
        ));

        if fragments.len() > 1 {
            for fragment in &fragments[1..fragments.len() - 1] {
                cursor.last_number += 1;
                lines.push(LogLine::new(build_id, cursor.last_number, strip_cr(fragment)));
            }

            // The first newline closed the line assembled above, so the
            // accumulated partial is done either way.
            let tail = fragments[fragments.len() - 1];
            if tail.is_empty() {
                cursor.partial.clear();
            } else {
                cursor.last_number += 1;
                cursor.partial = tail.to_string();
            }
        }

        lines
    }

    /// Close out a build, returning its pending partial as a final line.
    ///
    /// Drops the build's cursor. Returns `None` when no chunk was ever fed
    /// or the last chunk ended on a newline boundary.
    pub fn finish(&mut self, build_id: BuildId) -> Option<LogLine> {
        let cursor = self.states.remove(&build_id)?;
        if cursor.partial.is_empty() {
            return None;
        }
        Some(LogLine::new(
            build_id,
            cursor.last_number,
            strip_cr(&cursor.partial),
        ))
    }

    /// Current pending partial for a build.
    ///
    /// `Some("")` means the build is tracked but its last chunk ended on a
    /// newline; `None` means the build is not tracked at all.
    pub fn pending(&self, build_id: BuildId) -> Option<&str> {
        self.states.get(&build_id).map(|c| c.partial.as_str())
    }

    /// Number of builds with live reconstruction state.
    pub fn tracked_builds(&self) -> usize {
        self.states.len()
    }
}

fn strip_cr(text: &str) -> String {
    text.replace('\r', "")
}
