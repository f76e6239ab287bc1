//! Consumption events: one resource's measured consumption over a bounded
//! interval, together with the derived measures the metric extractors
//! produce.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::metrics;
use crate::resource::{ResourceRef, ResourceView};

/// Metric family a measure belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricCategory {
    Cpu,
    Mem,
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MetricCategory::Cpu => write!(f, "CPU"),
            MetricCategory::Mem => write!(f, "MEM"),
        }
    }
}

/// How raw samples are folded into the measure.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKind {
    Average,
    Number,
    MaxNumberOfCpu,
    MaxMem,
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            AggregationKind::Average => "average",
            AggregationKind::Number => "number",
            AggregationKind::MaxNumberOfCpu => "max_number_of_cpu",
            AggregationKind::MaxMem => "max_mem",
        };
        write!(f, "{s}")
    }
}

/// One derived measure on an event. The `(category, kind)` pair is unique
/// within an event; insertion order carries no meaning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub category: MetricCategory,
    pub kind: AggregationKind,
    pub value: Decimal,
}

/// The record of one resource's consumption over an interval.
///
/// Events are mutable only through the pool that owns them, and only while
/// that pool is OPEN or PROCESSING; a CLOSED pool freezes its events.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsumptionEvent {
    pub id: Uuid,
    pub resource: ResourceRef,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    measures: Vec<Measure>,
}

impl ConsumptionEvent {
    pub fn new(resource: ResourceRef, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            resource,
            start_time,
            end_time,
            measures: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.end_time <= self.start_time {
            return Err(Error::Validation {
                field: "end_time",
                message: "should happen after start_time",
            });
        }
        Ok(())
    }

    /// Whole days covered by the interval. A sub-day interval still weighs
    /// one day in the running mean.
    pub fn duration_days(&self) -> i64 {
        (self.end_time - self.start_time).num_days().max(1)
    }

    pub fn get_measure(&self, category: MetricCategory, kind: AggregationKind) -> Option<Decimal> {
        self.measures
            .iter()
            .find(|m| m.category == category && m.kind == kind)
            .map(|m| m.value)
    }

    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    /// Feeds one raw sample through the extractor for `(category, kind)`,
    /// stores the derived measure and returns it.
    pub fn record_measure(
        &mut self,
        category: MetricCategory,
        kind: AggregationKind,
        value: Decimal,
        resource: &dyn ResourceView,
    ) -> Decimal {
        let derived = metrics::extract(self, category, kind, value, resource);
        self.set_measure(category, kind, derived);
        derived
    }

    pub(crate) fn set_measure(
        &mut self,
        category: MetricCategory,
        kind: AggregationKind,
        value: Decimal,
    ) {
        match self
            .measures
            .iter_mut()
            .find(|m| m.category == category && m.kind == kind)
        {
            Some(measure) => measure.value = value,
            None => self.measures.push(Measure {
                category,
                kind,
                value,
            }),
        }
    }
}
