//! Progress message wire type and parser.
//!
//! The control plane publishes one JSON record per removal step with the
//! shape `{"text": "...", "terminal": false, "error": false}`. The last
//! record of a job carries `terminal: true`.

use serde::{Deserialize, Serialize};

/// One step record of a running job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressMessage {
    /// Human-readable step description.
    pub text: String,
    /// Marks the end of the stream for this job.
    #[serde(default)]
    pub terminal: bool,
    /// The step reports a failure on the backend side.
    #[serde(default)]
    pub error: bool,
}

impl ProgressMessage {
    pub fn step(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            terminal: false,
            error: false,
        }
    }

    pub fn last(text: impl Into<String>) -> Self {
        Self {
            terminal: true,
            ..Self::step(text)
        }
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            terminal: true,
            error: true,
            ..Self::step(text)
        }
    }

    /// Encode for publishing. Used by test publishers and fake backends.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Parse a raw progress payload.
///
/// Returns `Err` for malformed JSON or a missing `text` field. Callers
/// should log and skip the record.
pub fn parse_progress(payload: &[u8]) -> Result<ProgressMessage, serde_json::Error> {
    serde_json::from_slice(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_intermediate_step() {
        let msg = parse_progress(br#"{"text":"removing fluxcd","terminal":false,"error":false}"#)
            .unwrap();
        assert_eq!(msg, ProgressMessage::step("removing fluxcd"));
    }

    #[test]
    fn parse_terminal_failure() {
        let msg =
            parse_progress(br#"{"text":"license server busy","terminal":true,"error":true}"#)
                .unwrap();
        assert!(msg.terminal);
        assert!(msg.error);
    }

    #[test]
    fn missing_flags_default_to_false() {
        let msg = parse_progress(br#"{"text":"starting"}"#).unwrap();
        assert!(!msg.terminal);
        assert!(!msg.error);
    }

    #[test]
    fn missing_text_is_an_error() {
        assert!(parse_progress(br#"{"terminal":true}"#).is_err());
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_progress(b"not json at all").is_err());
    }

    #[test]
    fn encoded_message_parses_back() {
        let msg = ProgressMessage::last("done");
        assert_eq!(parse_progress(&msg.to_bytes()).unwrap(), msg);
    }
}
