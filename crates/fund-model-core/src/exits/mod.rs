pub mod planner;
pub mod projector;

pub use planner::plan_exits;
pub use projector::{ArrProjector, DecayingGrowthProjector};
