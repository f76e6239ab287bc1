//! In-memory realization of the persistence collaborator.
//!
//! The ledger owns the pools and the ordered rate-plan catalog, enforces
//! the `(resource, OPEN)` unique constraint, and drives the side effect of
//! the OPEN → PROCESSING transition: spawning a fresh OPEN pool so new
//! consumption can keep accumulating.
//!
//! The engine is single-threaded, synchronous business logic; this is the
//! serialization point for the one-OPEN-pool decision. A caller whose save
//! hits [`Error::OpenPoolExists`] retries by re-reading the existing pool
//! through [`Ledger::open_pool_for`].

use std::collections::HashMap;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::event::ConsumptionEvent;
use crate::plan::{FirstPlanResolver, PlanResolver, RatePlan};
use crate::pool::{Pool, PoolState};

pub struct Ledger<'a> {
    pools: HashMap<Uuid, Pool>,
    plans: Vec<RatePlan>,
    resolver: Box<dyn PlanResolver + 'a>,
}

impl Default for Ledger<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Ledger<'a> {
    pub fn new() -> Ledger<'a> {
        Ledger::with_resolver(Box::new(FirstPlanResolver))
    }

    /// Leaves the plan-resolution policy to the client. The default picks
    /// the first plan in the catalog for every resource.
    pub fn with_resolver(resolver: Box<dyn PlanResolver + 'a>) -> Ledger<'a> {
        Ledger {
            pools: HashMap::new(),
            plans: Vec::new(),
            resolver,
        }
    }

    /// Appends a plan to the ordered catalog.
    pub fn add_plan(&mut self, plan: RatePlan) -> Uuid {
        let id = plan.id;
        self.plans.push(plan);
        id
    }

    pub fn plans(&self) -> &[RatePlan] {
        &self.plans
    }

    /// Resolves the price plan applicable to a pool's resource.
    pub fn find_price_plan(&self, pool_id: Uuid) -> Result<&RatePlan> {
        let pool = self.pool(pool_id)?;
        self.resolver
            .resolve(&pool.resource, &self.plans)
            .ok_or(Error::PlanNotFound)
    }

    /// Validates and stores a pool.
    ///
    /// An invalid pool is never persisted, and a second OPEN pool for a
    /// resource that already has one hits the unique constraint.
    pub fn save_pool(&mut self, pool: Pool) -> Result<Uuid> {
        pool.validate()?;
        if pool.state() == PoolState::Open {
            if let Some(existing) = self.open_pool_for(pool.resource.id) {
                if existing.id != pool.id {
                    return Err(Error::OpenPoolExists(existing.id));
                }
            }
        }
        let id = pool.id;
        self.pools.insert(id, pool);
        Ok(id)
    }

    pub fn pool(&self, id: Uuid) -> Result<&Pool> {
        self.pools.get(&id).ok_or(Error::PoolNotFound(id))
    }

    pub fn pool_mut(&mut self, id: Uuid) -> Result<&mut Pool> {
        self.pools.get_mut(&id).ok_or(Error::PoolNotFound(id))
    }

    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    /// The OPEN pool currently accumulating consumption for a resource, if
    /// any. This is the re-read half of the retry-on-conflict contract.
    pub fn open_pool_for(&self, resource_id: Uuid) -> Option<&Pool> {
        self.pools
            .values()
            .find(|p| p.state() == PoolState::Open && p.resource.id == resource_id)
    }

    /// Applies a state change to a stored pool.
    ///
    /// Moving OPEN → PROCESSING spawns exactly one fresh OPEN pool for the
    /// resource when none exists, covering the window that starts where the
    /// processed pool ended; the spawned id is returned. The side effect is
    /// idempotent: a resource that already has an OPEN pool gets no second
    /// one.
    pub fn transition(&mut self, pool_id: Uuid, next: PoolState) -> Result<Option<Uuid>> {
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(Error::PoolNotFound(pool_id))?;
        let previous = pool.state();
        pool.change_state(next)?;

        if previous == PoolState::Open && next == PoolState::Processing {
            let name = pool.name.clone();
            let description = pool.description.clone();
            let resource = pool.resource;
            let start_time = pool.end_time;
            let end_time = pool.end_time + (pool.end_time - pool.start_time);
            if self.open_pool_for(resource.id).is_none() {
                let fresh = Pool::new(name, description, resource, start_time, end_time);
                let fresh_id = fresh.id;
                debug!(resource = %resource.id, pool = %fresh_id, "spawned fresh open pool");
                self.pools.insert(fresh_id, fresh);
                return Ok(Some(fresh_id));
            }
        }
        Ok(None)
    }

    /// Deletes a pool, cascading to its charges.
    ///
    /// The detached events are handed back to the caller: an event without
    /// a pool is a modeling error to surface, never to allow silently.
    pub fn destroy_pool(&mut self, pool_id: Uuid) -> Result<Vec<ConsumptionEvent>> {
        let mut pool = self
            .pools
            .remove(&pool_id)
            .ok_or(Error::PoolNotFound(pool_id))?;
        let event_ids: Vec<Uuid> = pool.events().iter().map(|e| e.id).collect();
        let mut orphans = Vec::with_capacity(event_ids.len());
        for event_id in event_ids {
            let event = pool.remove_event(event_id)?;
            warn!(pool = %pool_id, event = %event.id, "event detached by pool deletion");
            orphans.push(event);
        }
        Ok(orphans)
    }

    /// Deletes an event wherever it is attached, cascading to its charge.
    pub fn destroy_event(&mut self, event_id: Uuid) -> Result<()> {
        let pool = self
            .pools
            .values_mut()
            .find(|p| p.events().iter().any(|e| e.id == event_id))
            .ok_or(Error::EventNotFound(event_id))?;
        pool.remove_event(event_id)?;
        Ok(())
    }

    /// Resolves the pool's plan and rates every charge in it.
    pub fn calculate_all_charges(&mut self, pool_id: Uuid) -> Result<()> {
        let plan = self.find_price_plan(pool_id)?.clone();
        self.pool_mut(pool_id)?.calculate_all_charges(&plan)
    }
}
