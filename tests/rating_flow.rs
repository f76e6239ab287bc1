//! End-to-end rating flow: seed a plan, open a pool, attach events, feed
//! samples through the extractors, rate the pool, then walk the lifecycle
//! until everything is frozen.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use showback_rater::{
    AggregationKind, ChargeRef, ConsumptionEvent, Error, Ledger, MetricCategory, PerfState, Pool,
    PoolState, Rate, RatePlan, ResourceRef, ResourceView,
};

struct InventoryResource {
    states: Vec<PerfState>,
    cores: Option<u32>,
    ram: Option<u64>,
}

impl ResourceView for InventoryResource {
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

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[test]
fn a_full_billing_cycle() {
    init_tracing();

    let mut ledger = Ledger::new();
    ledger.add_plan(
        RatePlan::new("enterprise", "default price plan")
            .with_rate(Rate::new(
                MetricCategory::Cpu,
                AggregationKind::Average,
                dec!(67),
                dec!(12),
            ))
            .with_rate(Rate::new(
                MetricCategory::Mem,
                AggregationKind::MaxMem,
                dec!(0),
                dec!(0.001),
            )),
    );

    let resource = ResourceRef::container(Uuid::new_v4());
    let inventory = InventoryResource {
        states: vec![
            PerfState {
                numvcpus: 2,
                total_mem: 2048,
            },
            PerfState {
                numvcpus: 4,
                total_mem: 4096,
            },
        ],
        cores: None,
        ram: None,
    };

    let start = Utc.with_ymd_and_hms(2023, 10, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2023, 11, 1, 0, 0, 0).unwrap();
    let pool_id = ledger
        .save_pool(Pool::new(
            "october",
            "container consumption for october",
            resource,
            start,
            end,
        ))
        .unwrap();

    // Two events for the window, one day-weighted CPU average each.
    let mut event_ids = Vec::new();
    for cpu_sample in [dec!(10), dec!(30)] {
        let event = ConsumptionEvent::new(resource, start, end);
        let event_id = event.id;
        event_ids.push(event_id);
        let pool = ledger.pool_mut(pool_id).unwrap();
        pool.add_event(event).unwrap();
        pool.record_measure(
            event_id,
            MetricCategory::Cpu,
            AggregationKind::Average,
            cpu_sample,
            &inventory,
        )
        .unwrap();
        pool.record_measure(
            event_id,
            MetricCategory::Mem,
            AggregationKind::MaxMem,
            Decimal::ZERO,
            &inventory,
        )
        .unwrap();
    }

    // First samples are taken verbatim, memory comes from the latest
    // perf-state snapshot.
    ledger.calculate_all_charges(pool_id).unwrap();
    let pool = ledger.pool(pool_id).unwrap();
    let expected = [
        dec!(67) + dec!(12) * dec!(10) + dec!(0.001) * dec!(4096),
        dec!(67) + dec!(12) * dec!(30) + dec!(0.001) * dec!(4096),
    ];
    for (event_id, expected) in event_ids.iter().zip(expected) {
        assert_eq!(pool.get_charge(Some(ChargeRef::Event(*event_id))), expected);
    }
    assert_eq!(pool.sum_of_charges(), expected[0] + expected[1]);
    assert_eq!(pool.accumulated_cost(), pool.sum_of_charges());

    // Processing spawns the next OPEN pool so consumption keeps flowing.
    let spawned = ledger
        .transition(pool_id, PoolState::Processing)
        .unwrap()
        .expect("a fresh open pool should be spawned");
    assert_eq!(ledger.pools().count(), 2);
    assert_eq!(ledger.open_pool_for(resource.id).unwrap().id, spawned);

    // Charges stay mutable while PROCESSING.
    let charge_id = ledger.pool(pool_id).unwrap().charges()[0].id;
    ledger
        .pool_mut(pool_id)
        .unwrap()
        .update_charge(charge_id, dec!(5))
        .unwrap();

    // CLOSED freezes everything.
    ledger.transition(pool_id, PoolState::Closed).unwrap();
    let pool = ledger.pool_mut(pool_id).unwrap();
    assert_eq!(pool.update_charge(charge_id, dec!(1)), None);
    assert!(matches!(
        pool.calculate_all_charges(&RatePlan::new("any", "any")),
        Err(Error::PoolClosed(_))
    ));
    assert_eq!(pool.get_charge(Some(ChargeRef::Charge(charge_id))), dec!(5));

    // Destroying an event cascades to exactly one charge.
    ledger.destroy_event(event_ids[1]).unwrap();
    assert_eq!(ledger.pool(pool_id).unwrap().charges().len(), 1);

    // Destroying the pool cascades to its charges and surfaces the events.
    let orphans = ledger.destroy_pool(pool_id).unwrap();
    assert_eq!(orphans.len(), 1);
    assert!(ledger.pool(pool_id).is_err());
}
