pub mod aggregator;
pub mod error;
pub mod planner;
pub mod session;
pub mod source;

pub use aggregator::aggregate;
pub use error::PlannerError;
pub use planner::PlannerService;
pub use session::{PlanningSession, SessionStore};
pub use source::{ExperimentSource, PgExperimentSource};
