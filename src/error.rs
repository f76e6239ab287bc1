//! Error taxonomy for the rating engine.
//!
//! Lifecycle violations (illegal state transitions, frozen pools) are hard
//! errors; data-quality misses on the silent paths (`update_charge`,
//! `get_charge`) are reported through `Option`/zero sentinels instead and
//! never reach this enum.

use thiserror::Error;
use uuid::Uuid;

use crate::pool::PoolState;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A required field is missing or an interval is inverted.
    /// Records carrying this error must not be persisted.
    #[error("{field} {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },

    /// A state string outside OPEN/PROCESSING/CLOSED at the parse boundary.
    #[error("{0} is not a valid pool state")]
    InvalidState(String),

    /// A disallowed state change. Never swallowed.
    #[error("can't change state to {to} from {from}")]
    IllegalTransition { from: PoolState, to: PoolState },

    /// Any transition attempted on a CLOSED pool.
    #[error("can't change state when it's CLOSED")]
    TransitionFromClosed,

    /// The event is already attached to the pool.
    #[error("duplicate event {0}")]
    DuplicateEvent(Uuid),

    #[error("event {0} not found")]
    EventNotFound(Uuid),

    #[error("charge {0} not found")]
    ChargeNotFound(Uuid),

    #[error("pool {0} not found")]
    PoolNotFound(Uuid),

    /// The plan catalog resolved to nothing.
    #[error("no price plan configured")]
    PlanNotFound,

    /// The `(resource, OPEN)` unique constraint was hit. The caller retries
    /// by re-reading the existing OPEN pool.
    #[error("an open pool already exists for this resource: {0}")]
    OpenPoolExists(Uuid),

    /// Charges are frozen once their pool is CLOSED.
    #[error("pool {0} is closed, charges are frozen")]
    PoolClosed(Uuid),

    /// A unit string that resolves to no known prefix. Conversion fails
    /// rather than silently substituting a factor of 1.
    #[error("unknown unit {0:?}")]
    UnknownUnit(String),
}
