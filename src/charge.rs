//! The monetary result of rating one event inside one pool.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One charge, 1:1 with an attached event.
///
/// Costs are exact decimals; charge arithmetic never touches floating
/// point. A charge is mutable while its pool is OPEN or PROCESSING and
/// frozen once the pool is CLOSED.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub id: Uuid,
    pub event_id: Uuid,
    pub pool_id: Uuid,
    pub cost: Decimal,
}

impl Charge {
    /// A fresh charge starts at zero cost.
    pub fn new(event_id: Uuid, pool_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            pool_id,
            cost: Decimal::ZERO,
        }
    }
}
