use thiserror::Error;

/// User-facing failure classes for plan processing.
///
/// `Validation` covers structural faults (duplicate ids, bad references,
/// cycles, malformed schema); `Scheduling` covers temporal faults
/// (non-positive durations, unresolvable predecessors, precedence
/// violations). `Internal` marks invariant breakage that no plan input
/// should be able to trigger.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("scheduling error: {0}")]
    Scheduling(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl PlanError {
    /// Process exit code for the CLI: 2 means "your plan is wrong",
    /// 1 means "the tool broke".
    pub fn exit_code(&self) -> i32 {
        match self {
            PlanError::Validation(_) | PlanError::Scheduling(_) => 2,
            PlanError::Internal(_) => 1,
        }
    }
}
