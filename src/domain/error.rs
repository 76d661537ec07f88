use serde_json::Value;

use crate::vendor::VendorError;

/// Errors a controller can hit while evaluating or fixing one setting.
///
/// None of these cross the controller boundary: `get`, `set`,
/// `check_compliance` and `remediate` turn them into envelope data.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("{0}")]
    RetrievalFailed(String),
    #[error("{0}")]
    NotApplicable(String),
    #[error("{0}")]
    RemediationUnsupported(String),
    /// Some writes landed before others failed. `changes` holds the
    /// `(old, new)` of what was actually applied.
    #[error("{}", errors.join("; "))]
    PartialFailure {
        errors: Vec<String>,
        changes: Option<(Value, Value)>,
    },
    #[error("invalid desired state: {0}")]
    InvalidDesiredState(String),
    #[error(transparent)]
    Vendor(#[from] VendorError),
}

impl ControlError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidDesiredState(msg.into())
    }
}
