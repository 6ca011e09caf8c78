//! Result of a model install attempt.

use serde::{Deserialize, Serialize};

/// Terminal outcome of `install(model)` that did not fail outright.
///
/// `success` and `cancelled` are never both true. Failures are reported
/// through `InstallError` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallOutcome {
    pub model: String,
    pub success: bool,
    pub cancelled: bool,
}

impl InstallOutcome {
    pub fn installed(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            success: true,
            cancelled: false,
        }
    }

    pub fn cancelled(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            success: false,
            cancelled: true,
        }
    }
}
