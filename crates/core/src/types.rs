use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Client-generated identifier that binds a dispatched job to its
/// progress stream.
///
/// Sent to the control plane as the job's response id and used as the
/// routing key of the progress subject. A fresh token is generated for
/// every operation and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct CorrelationToken(String);

impl CorrelationToken {
    /// Generate a new random token (UUID v4, 122 bits of entropy).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Wrap a caller-chosen token value.
    ///
    /// The value becomes a single subject token, so it must be non-empty
    /// and free of whitespace, `.`, `*` and `>`.
    pub fn from_raw(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        if value.is_empty() {
            return Err(CoreError::Validation(
                "correlation token must not be empty".into(),
            ));
        }
        if let Some(c) = value
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '.' | '*' | '>'))
        {
            return Err(CoreError::Validation(format!(
                "correlation token must not contain {c:?}"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CorrelationToken {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_raw(value)
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
