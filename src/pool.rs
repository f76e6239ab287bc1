//! Billing pools: the aggregation root for consumption events and their
//! charges, with a strict OPEN → PROCESSING → CLOSED lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::charge::Charge;
use crate::error::{Error, Result};
use crate::event::{AggregationKind, ConsumptionEvent, MetricCategory};
use crate::plan::RatePlan;
use crate::resource::{ResourceRef, ResourceView};

/// Lifecycle state of a pool.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PoolState {
    Open,
    Processing,
    Closed,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PoolState::Open => write!(f, "OPEN"),
            PoolState::Processing => write!(f, "PROCESSING"),
            PoolState::Closed => write!(f, "CLOSED"),
        }
    }
}

impl FromStr for PoolState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OPEN" => Ok(PoolState::Open),
            "PROCESSING" => Ok(PoolState::Processing),
            "CLOSED" => Ok(PoolState::Closed),
            other => Err(Error::InvalidState(other.to_string())),
        }
    }
}

/// What a charge lookup starts from: an event resolves through its 1:1
/// charge.
#[derive(Clone, Copy, Debug)]
pub enum ChargeRef {
    Event(Uuid),
    Charge(Uuid),
}

/// A pool holds the events of one resource over a lifecycle window and one
/// charge per event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pool {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub resource: ResourceRef,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    state: PoolState,
    events: Vec<ConsumptionEvent>,
    charges: Vec<Charge>,
}

impl Pool {
    /// Pools are born OPEN.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        resource: ResourceRef,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            resource,
            start_time,
            end_time,
            state: PoolState::Open,
            events: Vec::new(),
            charges: Vec::new(),
        }
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    pub fn events(&self) -> &[ConsumptionEvent] {
        &self.events
    }

    pub fn charges(&self) -> &[Charge] {
        &self.charges
    }

    pub fn charge_for_event(&self, event_id: Uuid) -> Option<&Charge> {
        self.charges.iter().find(|c| c.event_id == event_id)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation {
                field: "name",
                message: "can't be blank",
            });
        }
        if self.description.trim().is_empty() {
            return Err(Error::Validation {
                field: "description",
                message: "can't be blank",
            });
        }
        if self.end_time <= self.start_time {
            return Err(Error::Validation {
                field: "end_time",
                message: "should happen after start_time",
            });
        }
        Ok(())
    }

    /// Applies a state change, enforcing the transition matrix.
    ///
    /// Writing the current state back is a no-op; every disallowed change
    /// is a hard error.
    pub fn change_state(&mut self, next: PoolState) -> Result<()> {
        if self.state == next {
            return Ok(());
        }
        match (self.state, next) {
            (PoolState::Open, PoolState::Processing)
            | (PoolState::Processing, PoolState::Closed) => {
                debug!(pool = %self.id, from = %self.state, to = %next, "pool state change");
                self.state = next;
                Ok(())
            }
            (PoolState::Closed, _) => Err(Error::TransitionFromClosed),
            (from, to) => Err(Error::IllegalTransition { from, to }),
        }
    }

    /// Attaches an event and creates its zero-cost charge. Both happen or
    /// neither does.
    pub fn add_event(&mut self, event: ConsumptionEvent) -> Result<Uuid> {
        if self.events.iter().any(|e| e.id == event.id) {
            return Err(Error::DuplicateEvent(event.id));
        }
        let charge = Charge::new(event.id, self.id);
        let charge_id = charge.id;
        self.events.push(event);
        self.charges.push(charge);
        Ok(charge_id)
    }

    /// Detaches an event, destroying its charge, and hands the event back
    /// so it cannot be silently orphaned.
    pub fn remove_event(&mut self, event_id: Uuid) -> Result<ConsumptionEvent> {
        let index = self
            .events
            .iter()
            .position(|e| e.id == event_id)
            .ok_or(Error::EventNotFound(event_id))?;
        self.charges.retain(|c| c.event_id != event_id);
        Ok(self.events.remove(index))
    }

    /// Feeds a raw sample into an attached event's extractor. Events are
    /// only mutable while the pool is OPEN or PROCESSING.
    pub fn record_measure(
        &mut self,
        event_id: Uuid,
        category: MetricCategory,
        kind: AggregationKind,
        value: Decimal,
        resource: &dyn ResourceView,
    ) -> Result<Decimal> {
        if self.state == PoolState::Closed {
            return Err(Error::PoolClosed(self.id));
        }
        let event = self
            .events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or(Error::EventNotFound(event_id))?;
        Ok(event.record_measure(category, kind, value, resource))
    }

    /// Cost of a charge; `None` and unknown references yield zero.
    pub fn get_charge(&self, target: Option<ChargeRef>) -> Decimal {
        match target {
            None => Decimal::ZERO,
            Some(ChargeRef::Charge(id)) => self
                .charges
                .iter()
                .find(|c| c.id == id)
                .map(|c| c.cost)
                .unwrap_or(Decimal::ZERO),
            Some(ChargeRef::Event(id)) => self
                .charge_for_event(id)
                .map(|c| c.cost)
                .unwrap_or(Decimal::ZERO),
        }
    }

    /// Rates one charge against a plan and writes the new cost.
    ///
    /// Every rate whose `(category, aggregation)` key the event measures is
    /// accumulated as `fixed + variable * measure`; a plan with no matching
    /// rate charges zero rather than aborting. A charge outside this pool
    /// is an error (callers treat it as zero), unlike the deliberately
    /// silent [`Pool::update_charge`].
    pub fn calculate_charge(&mut self, charge_id: Uuid, plan: &RatePlan) -> Result<Decimal> {
        if self.state == PoolState::Closed {
            return Err(Error::PoolClosed(self.id));
        }
        let charge = self
            .charges
            .iter()
            .find(|c| c.id == charge_id)
            .ok_or(Error::ChargeNotFound(charge_id))?;
        let event = self
            .events
            .iter()
            .find(|e| e.id == charge.event_id)
            .ok_or(Error::EventNotFound(charge.event_id))?;

        let mut cost = Decimal::ZERO;
        for rate in &plan.rates {
            if let Some(measure) = event.get_measure(rate.category, rate.aggregation) {
                cost += rate.apply(measure);
            }
        }
        debug!(pool = %self.id, charge = %charge_id, %cost, "charge calculated");
        if let Some(charge) = self.charges.iter_mut().find(|c| c.id == charge_id) {
            charge.cost = cost;
        }
        Ok(cost)
    }

    /// Rates every charge in the pool. Rates are additive and independent
    /// per event, so iteration order cannot change the outcome.
    pub fn calculate_all_charges(&mut self, plan: &RatePlan) -> Result<()> {
        if self.state == PoolState::Closed {
            return Err(Error::PoolClosed(self.id));
        }
        let charge_ids: Vec<Uuid> = self.charges.iter().map(|c| c.id).collect();
        for charge_id in charge_ids {
            self.calculate_charge(charge_id, plan)?;
        }
        Ok(())
    }

    /// Administrative adjustment: attaches the event when it is not yet in
    /// the pool, then sets its charge's cost directly, bypassing rates.
    pub fn add_charge_for_event(
        &mut self,
        event: ConsumptionEvent,
        amount: Decimal,
    ) -> Result<Uuid> {
        if self.state == PoolState::Closed {
            return Err(Error::PoolClosed(self.id));
        }
        let charge_id = match self.charge_for_event(event.id) {
            Some(charge) => charge.id,
            None => self.add_event(event)?,
        };
        self.set_cost(charge_id, amount);
        Ok(charge_id)
    }

    /// Sets a charge's cost if the charge belongs to this pool; `None`
    /// otherwise, with no error raised. The silent counterpart to
    /// [`Pool::calculate_charge`].
    pub fn update_charge(&mut self, charge_id: Uuid, amount: Decimal) -> Option<Decimal> {
        if self.state == PoolState::Closed {
            return None;
        }
        if !self.charges.iter().any(|c| c.id == charge_id) {
            return None;
        }
        self.set_cost(charge_id, amount);
        Some(amount)
    }

    /// Alias kept for callers adjusting an existing charge by id; same
    /// silent semantics as [`Pool::update_charge`].
    pub fn add_charge(&mut self, charge_id: Uuid, amount: Decimal) -> Option<Decimal> {
        self.update_charge(charge_id, amount)
    }

    /// Resets one charge to zero.
    pub fn clear_charge(&mut self, charge_id: Uuid) -> Option<Decimal> {
        self.update_charge(charge_id, Decimal::ZERO)
    }

    /// Resets every charge in the pool to zero.
    pub fn clean_all_charges(&mut self) -> Result<()> {
        if self.state == PoolState::Closed {
            return Err(Error::PoolClosed(self.id));
        }
        for charge in &mut self.charges {
            charge.cost = Decimal::ZERO;
        }
        Ok(())
    }

    /// Exact sum of all charge costs currently in the pool.
    pub fn sum_of_charges(&self) -> Decimal {
        self.charges.iter().map(|c| c.cost).sum()
    }

    /// The accumulated cost is a projection of [`Pool::sum_of_charges`],
    /// recomputed on every read, never maintained independently.
    pub fn accumulated_cost(&self) -> Decimal {
        self.sum_of_charges()
    }

    fn set_cost(&mut self, charge_id: Uuid, amount: Decimal) {
        if let Some(charge) = self.charges.iter_mut().find(|c| c.id == charge_id) {
            charge.cost = amount;
        }
    }
}
