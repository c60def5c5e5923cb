use crate::lp::LpStatus;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OcCostError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error("solver failure ({status}): {reason}")]
    SolverFailure { status: LpStatus, reason: String },
}
