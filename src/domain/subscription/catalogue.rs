//! Static plan catalogue shown on the pricing page.

use serde::Serialize;

use super::{Feature, Plan};

/// One purchasable (or free) plan as presented to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOffer {
    pub id: Plan,
    pub name: &'static str,
    pub price_cents: u32,
    pub currency: &'static str,

    /// Billing interval, `None` for the free plan.
    pub interval: Option<&'static str>,

    pub features: Vec<Feature>,

    /// Marketing note, e.g. the yearly discount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub savings: Option<&'static str>,
}

impl PlanOffer {
    pub fn for_plan(plan: Plan) -> Self {
        let features = if plan.is_paid() {
            Feature::ALL.to_vec()
        } else {
            Feature::FREE.to_vec()
        };

        let (interval, savings) = match plan {
            Plan::Free => (None, None),
            Plan::Monthly => (Some("month"), None),
            Plan::Yearly => (Some("year"), Some("Save 17% compared to monthly")),
        };

        Self {
            id: plan,
            name: plan.display_name(),
            price_cents: plan.price_cents(),
            currency: "USD",
            interval,
            features,
            savings,
        }
    }
}

/// Every plan in display order.
pub fn plan_catalogue() -> Vec<PlanOffer> {
    Plan::ALL.iter().copied().map(PlanOffer::for_plan).collect()
}
