//! Per-metric extraction strategies.
//!
//! Each strategy folds one raw sample into the event's current aggregate,
//! reading the resource through [`ResourceView`] where capacity data is
//! needed. Missing capabilities degrade to 0; resource heterogeneity is the
//! normal case, not an error.

use rust_decimal::Decimal;
use tracing::debug;

use crate::event::{AggregationKind, ConsumptionEvent, MetricCategory};
use crate::resource::{ResourceKind, ResourceView};

/// Dispatches to the extractor registered for `(category, kind)`.
///
/// A key without a dedicated strategy passes the raw value through
/// unchanged.
pub fn extract(
    event: &ConsumptionEvent,
    category: MetricCategory,
    kind: AggregationKind,
    value: Decimal,
    resource: &dyn ResourceView,
) -> Decimal {
    match (category, kind) {
        (MetricCategory::Cpu, AggregationKind::Average) => cpu_average(event, value),
        (MetricCategory::Cpu, AggregationKind::Number) => value,
        (MetricCategory::Cpu, AggregationKind::MaxNumberOfCpu) => {
            cpu_max_number_of_cpu(event, value, resource)
        }
        (MetricCategory::Mem, AggregationKind::MaxMem) => mem_max(event, resource),
        (category, kind) => {
            debug!(%category, %kind, "no extractor registered, passing value through");
            value
        }
    }
}

/// Running CPU average weighted by the days the prior average already
/// covers: `(new * days + old) / (days + 1)`. The first sample is taken
/// verbatim.
fn cpu_average(event: &ConsumptionEvent, value: Decimal) -> Decimal {
    match event.get_measure(MetricCategory::Cpu, AggregationKind::Average) {
        Some(old_average) => {
            let days = Decimal::from(event.duration_days());
            (value * days + old_average) / (days + Decimal::ONE)
        }
        None => value,
    }
}

/// Peak vCPU count seen so far, truncated to a whole number.
///
/// Container-class resources report through their latest performance-state
/// snapshot; everything else through the `cpu_total_cores` capability.
fn cpu_max_number_of_cpu(
    event: &ConsumptionEvent,
    value: Decimal,
    resource: &dyn ResourceView,
) -> Decimal {
    let numcpus = match event.resource.kind {
        ResourceKind::Container => resource
            .perf_states()
            .last()
            .map(|state| state.numvcpus)
            .unwrap_or(0),
        ResourceKind::Generic => resource.cpu_total_cores().unwrap_or(0),
    };
    let previous = event
        .get_measure(MetricCategory::Cpu, AggregationKind::MaxNumberOfCpu)
        .unwrap_or(value);
    value.max(previous).max(Decimal::from(numcpus)).trunc()
}

/// Memory reported by the resource right now.
///
/// TODO: unlike the vCPU metric this overwrites instead of taking
/// `max(previous, new)`; decide whether peak semantics were intended.
fn mem_max(event: &ConsumptionEvent, resource: &dyn ResourceView) -> Decimal {
    let mem = match event.resource.kind {
        ResourceKind::Container => resource
            .perf_states()
            .last()
            .map(|state| state.total_mem)
            .unwrap_or(0),
        ResourceKind::Generic => resource.ram_size().unwrap_or(0),
    };
    Decimal::from(mem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{PerfState, ResourceRef, StubResource};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn month_event(resource: ResourceRef) -> ConsumptionEvent {
        ConsumptionEvent::new(
            resource,
            Utc.with_ymd_and_hms(2023, 10, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2023, 10, 31, 0, 0, 0).unwrap(),
        )
    }

    fn bare_resource() -> StubResource {
        StubResource {
            states: Vec::new(),
            cores: None,
            ram: None,
        }
    }

    #[test]
    fn first_cpu_sample_is_taken_verbatim() {
        let mut event = month_event(ResourceRef::generic(Uuid::new_v4()));
        let derived = event.record_measure(
            MetricCategory::Cpu,
            AggregationKind::Average,
            dec!(42.5),
            &bare_resource(),
        );
        assert_eq!(derived, dec!(42.5));
    }

    #[test]
    fn cpu_average_is_a_day_weighted_running_mean() {
        let mut event = month_event(ResourceRef::generic(Uuid::new_v4()));
        event.record_measure(
            MetricCategory::Cpu,
            AggregationKind::Average,
            dec!(10),
            &bare_resource(),
        );
        let derived = event.record_measure(
            MetricCategory::Cpu,
            AggregationKind::Average,
            dec!(41),
            &bare_resource(),
        );
        // (41 * 30 + 10) / 31
        assert_eq!(derived, dec!(1240) / dec!(31));
    }

    #[test]
    fn cpu_number_counts_invocations_verbatim() {
        let mut event = month_event(ResourceRef::generic(Uuid::new_v4()));
        let derived = event.record_measure(
            MetricCategory::Cpu,
            AggregationKind::Number,
            dec!(3),
            &bare_resource(),
        );
        assert_eq!(derived, dec!(3));
    }

    #[test]
    fn container_vcpu_peak_comes_from_the_latest_perf_state() {
        let mut event = month_event(ResourceRef::container(Uuid::new_v4()));
        let resource = StubResource {
            states: vec![
                PerfState {
                    numvcpus: 2,
                    total_mem: 1024,
                },
                PerfState {
                    numvcpus: 8,
                    total_mem: 2048,
                },
            ],
            cores: None,
            ram: None,
        };
        let derived = event.record_measure(
            MetricCategory::Cpu,
            AggregationKind::MaxNumberOfCpu,
            dec!(4),
            &resource,
        );
        assert_eq!(derived, dec!(8));
    }

    #[test]
    fn vcpu_peak_keeps_the_previous_maximum() {
        let mut event = month_event(ResourceRef::generic(Uuid::new_v4()));
        let resource = StubResource {
            states: Vec::new(),
            cores: Some(2),
            ram: None,
        };
        let first = event.record_measure(
            MetricCategory::Cpu,
            AggregationKind::MaxNumberOfCpu,
            dec!(6.9),
            &resource,
        );
        assert_eq!(first, dec!(6));
        let second = event.record_measure(
            MetricCategory::Cpu,
            AggregationKind::MaxNumberOfCpu,
            dec!(0),
            &resource,
        );
        assert_eq!(second, dec!(6));
    }

    #[test]
    fn missing_cpu_capability_defaults_to_zero() {
        let mut event = month_event(ResourceRef::generic(Uuid::new_v4()));
        let derived = event.record_measure(
            MetricCategory::Cpu,
            AggregationKind::MaxNumberOfCpu,
            dec!(0),
            &bare_resource(),
        );
        assert_eq!(derived, Decimal::ZERO);
    }

    #[test]
    fn container_memory_comes_from_the_latest_perf_state() {
        let mut event = month_event(ResourceRef::container(Uuid::new_v4()));
        let resource = StubResource {
            states: vec![PerfState {
                numvcpus: 2,
                total_mem: 4096,
            }],
            cores: None,
            ram: None,
        };
        let derived = event.record_measure(
            MetricCategory::Mem,
            AggregationKind::MaxMem,
            dec!(0),
            &resource,
        );
        assert_eq!(derived, dec!(4096));
    }

    #[test]
    fn generic_memory_reads_ram_size_or_zero() {
        let mut event = month_event(ResourceRef::generic(Uuid::new_v4()));
        let resource = StubResource {
            states: Vec::new(),
            cores: None,
            ram: Some(16384),
        };
        assert_eq!(
            event.record_measure(
                MetricCategory::Mem,
                AggregationKind::MaxMem,
                dec!(0),
                &resource
            ),
            dec!(16384)
        );
        assert_eq!(
            event.record_measure(
                MetricCategory::Mem,
                AggregationKind::MaxMem,
                dec!(0),
                &bare_resource()
            ),
            Decimal::ZERO
        );
    }

    #[test]
    fn memory_overwrites_instead_of_keeping_a_peak() {
        let mut event = month_event(ResourceRef::generic(Uuid::new_v4()));
        let big = StubResource {
            states: Vec::new(),
            cores: None,
            ram: Some(32768),
        };
        let small = StubResource {
            states: Vec::new(),
            cores: None,
            ram: Some(1024),
        };
        event.record_measure(MetricCategory::Mem, AggregationKind::MaxMem, dec!(0), &big);
        let derived =
            event.record_measure(MetricCategory::Mem, AggregationKind::MaxMem, dec!(0), &small);
        assert_eq!(derived, dec!(1024));
    }
}
