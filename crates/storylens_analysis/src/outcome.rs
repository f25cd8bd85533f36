//! Tagged stage results for provider-backed stages.

use storylens_core::ProviderDiagnostic;

/// Result of a stage that degrades instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    /// Every provider call succeeded
    Ok(T),
    /// The stage completed with reduced fidelity
    Degraded {
        /// Best-effort stage output
        data: T,
        /// Why fidelity was reduced
        diagnostics: Vec<ProviderDiagnostic>,
    },
}

impl<T> StageOutcome<T> {
    /// Wrap `data`, degrading when any diagnostic was raised.
    pub fn from_parts(data: T, diagnostics: Vec<ProviderDiagnostic>) -> Self {
        if diagnostics.is_empty() {
            StageOutcome::Ok(data)
        } else {
            StageOutcome::Degraded { data, diagnostics }
        }
    }

    /// Whether the stage fell back anywhere.
    pub fn is_degraded(&self) -> bool {
        matches!(self, StageOutcome::Degraded { .. })
    }

    /// Stage output regardless of fidelity.
    pub fn data(&self) -> &T {
        match self {
            StageOutcome::Ok(data) | StageOutcome::Degraded { data, .. } => data,
        }
    }

    /// Split into output and diagnostics.
    pub fn into_parts(self) -> (T, Vec<ProviderDiagnostic>) {
        match self {
            StageOutcome::Ok(data) => (data, Vec::new()),
            StageOutcome::Degraded { data, diagnostics } => (data, diagnostics),
        }
    }
}
