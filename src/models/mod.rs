pub mod decimal;
pub mod experiment;
pub mod overrides;
pub mod result;

pub use experiment::{Experiment, ExperimentItemRow, ExperimentRow, ItemCategory, LineItem};
pub use overrides::{
    CustomQuantityMap, OverrideError, PlanOverrides, QuantityAdjustment, UsageOverrideMap,
    UsageType,
};
pub use result::{AggregationResult, ExperimentUsage, ItemGroup, PlanSummary, ProcurementStatus};
