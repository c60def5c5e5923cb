pub mod cost;
pub mod error;
pub mod geometry;
pub mod hull;
pub mod lp;
pub mod mask;
pub mod matching;
pub mod oc_cost;
pub mod params;

pub use cost::{CostModel, LocalizationMode};
pub use error::OcCostError;
pub use lp::{LinearProgram, LpSolution, LpSolver, LpStatus, SimplexSolver};
pub use mask::{GroundTruth, MaskRecord, Predictions};
pub use matching::{PartialMatcher, TransportPlan, augment_cost_matrix};
pub use oc_cost::{OcCost3d, SceneEvaluation};
pub use params::OcCostParams;
