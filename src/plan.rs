//! Rate plans: ordered per-metric pricing rules, and the resolver seam that
//! picks the plan applicable to a pool.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::{AggregationKind, MetricCategory};
use crate::resource::ResourceRef;

/// One rating rule: a fixed component plus a variable component per unit of
/// the bound measure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub id: Uuid,
    pub category: MetricCategory,
    pub aggregation: AggregationKind,
    pub fixed_rate: Decimal,
    pub variable_rate: Decimal,
}

impl Rate {
    pub fn new(
        category: MetricCategory,
        aggregation: AggregationKind,
        fixed_rate: Decimal,
        variable_rate: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            aggregation,
            fixed_rate,
            variable_rate,
        }
    }

    /// Monetary amount this rate contributes for a measure value.
    pub fn apply(&self, measure: Decimal) -> Decimal {
        self.fixed_rate + self.variable_rate * measure
    }
}

/// An ordered collection of rates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatePlan {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub rates: Vec<Rate>,
}

impl RatePlan {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            rates: Vec::new(),
        }
    }

    pub fn with_rate(mut self, rate: Rate) -> Self {
        self.rates.push(rate);
        self
    }
}

/// Picks the plan applicable to a pool's resource out of the ordered
/// catalog.
///
/// Resource-scoped and parent-scoped precedence are not contracted yet;
/// they slot in behind this trait without touching the Rate/Charge
/// contract.
pub trait PlanResolver {
    fn resolve<'a>(&self, resource: &ResourceRef, plans: &'a [RatePlan]) -> Option<&'a RatePlan>;
}

/// The documented default: the first plan in the catalog, for every
/// resource.
pub struct FirstPlanResolver;

impl PlanResolver for FirstPlanResolver {
    fn resolve<'a>(&self, _resource: &ResourceRef, plans: &'a [RatePlan]) -> Option<&'a RatePlan> {
        plans.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn a_rate_is_fixed_plus_variable_times_measure() {
        let rate = Rate::new(
            MetricCategory::Cpu,
            AggregationKind::Average,
            dec!(67),
            dec!(12),
        );
        assert_eq!(rate.apply(dec!(3)), dec!(103));
        assert_eq!(rate.apply(Decimal::ZERO), dec!(67));
    }

    #[test]
    fn the_default_resolver_takes_the_first_plan() {
        let plans = vec![
            RatePlan::new("enterprise", "default plan"),
            RatePlan::new("backup", "never picked"),
        ];
        let resource = ResourceRef::generic(Uuid::new_v4());
        let resolved = FirstPlanResolver.resolve(&resource, &plans).unwrap();
        assert_eq!(resolved.id, plans[0].id);
    }

    #[test]
    fn resolving_an_empty_catalog_finds_nothing() {
        let resource = ResourceRef::generic(Uuid::new_v4());
        assert!(FirstPlanResolver.resolve(&resource, &[]).is_none());
    }
}
