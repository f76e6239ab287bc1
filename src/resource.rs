//! The boundary to the resource/inventory collaborator.
//!
//! The engine never owns resources. Events and pools carry a [`ResourceRef`]
//! whose kind is resolved once at ingestion, and metric extraction reads raw
//! samples through the [`ResourceView`] trait so client code can plug in
//! whatever inventory backend it has.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Capability class of a metered resource.
///
/// Container-class resources report through performance-state snapshots;
/// everything else exposes plain capacity attributes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ResourceKind {
    Container,
    Generic,
}

/// Opaque reference to an externally-owned resource.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: Uuid,
    pub kind: ResourceKind,
}

impl ResourceRef {
    pub fn new(id: Uuid, kind: ResourceKind) -> Self {
        Self { id, kind }
    }

    pub fn container(id: Uuid) -> Self {
        Self::new(id, ResourceKind::Container)
    }

    pub fn generic(id: Uuid) -> Self {
        Self::new(id, ResourceKind::Generic)
    }
}

/// One performance-state snapshot of a container-class resource.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PerfState {
    pub numvcpus: u32,
    pub total_mem: u64,
}

/// Read-only view of a resource instance, supplied by the inventory
/// collaborator at extraction time.
///
/// An absent capability (`None`) means the resource does not have it;
/// extraction treats that as 0, not as an error.
pub trait ResourceView {
    /// Time-ordered performance-state snapshots, oldest first.
    fn perf_states(&self) -> &[PerfState];

    fn cpu_total_cores(&self) -> Option<u32>;

    fn ram_size(&self) -> Option<u64>;
}

/// Fixed-data resource view for tests.
#[cfg(test)]
pub(crate) struct StubResource {
    pub states: Vec<PerfState>,
    pub cores: Option<u32>,
    pub ram: Option<u64>,
}

#[cfg(test)]
impl ResourceView for StubResource {
    fn perf_states(&self) -> &[PerfState] {
        &self.states
    }

    fn cpu_total_cores(&self) -> Option<u32> {
        self.cores
    }

    fn ram_size(&self) -> Option<u64> {
        self.ram
    }
}
