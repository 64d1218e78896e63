//! Reconstructed build-output lines.

use serde::{Deserialize, Serialize};

use crate::build::BuildId;

/// A single reconstructed line of build output.
///
/// Numbers are 1-based and gapless per build. The text never contains a
/// trailing newline or carriage returns. The same number may be emitted
/// more than once while its line is still accumulating across chunk
/// boundaries; later emissions supersede earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub build_id: BuildId,
    pub number: u64,
    pub text: String,
}

impl LogLine {
    pub fn new(build_id: BuildId, number: u64, text: impl Into<String>) -> Self {
        Self {
            build_id,
            number,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_flat_fields() {
        let line = LogLine::new(BuildId(7), 3, "cargo test");
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["build_id"], 7);
        assert_eq!(json["number"], 3);
        assert_eq!(json["text"], "cargo test");
    }
}
