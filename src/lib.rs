//! Meters infrastructure resource consumption, groups it into billing
//! pools with a strict OPEN → PROCESSING → CLOSED lifecycle, and rates
//! each consumption event against configurable rate plans:
//!
//! ```text
//! cost = Σ fixed + variable × measure   over every matching rate
//! ```
//!
//! Heterogeneous measurement units are normalized through the exact
//! prefix arithmetic in [`units`]; all monetary arithmetic is exact
//! decimal. Inventory, persistence and plan resolution are collaborator
//! seams ([`resource::ResourceView`], [`ledger::Ledger`],
//! [`plan::PlanResolver`]).

pub mod charge;
pub mod error;
pub mod event;
pub mod ledger;
pub mod metrics;
pub mod plan;
pub mod pool;
pub mod resource;
pub mod units;

pub use charge::Charge;
pub use error::{Error, Result};
pub use event::{AggregationKind, ConsumptionEvent, Measure, MetricCategory};
pub use ledger::Ledger;
pub use plan::{FirstPlanResolver, PlanResolver, Rate, RatePlan};
pub use pool::{ChargeRef, Pool, PoolState};
pub use resource::{PerfState, ResourceKind, ResourceRef, ResourceView};
pub use units::PrefixFamily;
