//! Progress subject naming.
//!
//! The CLI and the control plane's progress publisher derive the same
//! subject from the correlation token, so no negotiation is needed.

use crate::types::CorrelationToken;

/// Namespace prefix for all job progress subjects.
pub const PROGRESS_SUBJECT_PREFIX: &str = "ace.progress";

/// Connection name the CLI announces to the progress transport.
pub const DEFAULT_CONNECTION_NAME: &str = "ace-cli";

/// Subject on which progress for the job tagged with `token` is published.
pub fn progress_subject(token: &CorrelationToken) -> String {
    format!("{PROGRESS_SUBJECT_PREFIX}.{token}")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn subject_is_prefix_plus_token() {
        let token = CorrelationToken::from_raw("T1").unwrap();
        assert_eq!(progress_subject(&token), "ace.progress.T1");
    }

    #[test]
    fn distinct_tokens_give_distinct_subjects() {
        let subjects: HashSet<_> = (0..500)
            .map(|_| progress_subject(&CorrelationToken::generate()))
            .collect();
        assert_eq!(subjects.len(), 500);
    }
}
