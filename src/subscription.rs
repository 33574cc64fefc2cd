//! Read-only mirror of the server-side subscription plan and usage counters.
//!
//! Carries no business logic beyond gating: the server enforces quotas, this
//! mirror only answers "may the UI offer this feature right now".

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Basic,
    Pro,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Basic => "basic",
            PlanTier::Pro => "pro",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "basic" => PlanTier::Basic,
            "pro" => PlanTier::Pro,
            _ => PlanTier::Free,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    ExportCsv,
    ExportXlsx,
    MultiCategoryFilter,
    BalanceHistory,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::ExportCsv => "CSV export",
            Feature::ExportXlsx => "XLSX export",
            Feature::MultiCategoryFilter => "multiple CAEN codes",
            Feature::BalanceHistory => "balance-sheet history",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    pub plan: PlanTier,
    #[serde(default)]
    pub renews_on: Option<chrono::NaiveDate>,
    pub monthly_export_quota: u32,
    pub exports_used: u32,
}

impl Default for SubscriptionState {
    fn default() -> Self {
        Self {
            plan: PlanTier::Free,
            renews_on: None,
            monthly_export_quota: 0,
            exports_used: 0,
        }
    }
}

impl SubscriptionState {
    pub fn allows(&self, feature: Feature) -> bool {
        match feature {
            Feature::ExportCsv => {
                self.plan >= PlanTier::Basic && self.exports_used < self.monthly_export_quota
            }
            Feature::ExportXlsx => {
                self.plan >= PlanTier::Pro && self.exports_used < self.monthly_export_quota
            }
            Feature::MultiCategoryFilter => self.plan >= PlanTier::Basic,
            Feature::BalanceHistory => self.plan >= PlanTier::Pro,
        }
    }

    pub fn exports_remaining(&self) -> u32 {
        self.monthly_export_quota.saturating_sub(self.exports_used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(plan: PlanTier, quota: u32, used: u32) -> SubscriptionState {
        SubscriptionState {
            plan,
            renews_on: None,
            monthly_export_quota: quota,
            exports_used: used,
        }
    }

    #[test]
    fn free_plan_gates_everything_paid() {
        let free = state(PlanTier::Free, 0, 0);
        assert!(!free.allows(Feature::ExportCsv));
        assert!(!free.allows(Feature::ExportXlsx));
        assert!(!free.allows(Feature::MultiCategoryFilter));
    }

    #[test]
    fn xlsx_requires_pro() {
        let basic = state(PlanTier::Basic, 10, 0);
        assert!(basic.allows(Feature::ExportCsv));
        assert!(!basic.allows(Feature::ExportXlsx));

        let pro = state(PlanTier::Pro, 10, 0);
        assert!(pro.allows(Feature::ExportXlsx));
    }

    #[test]
    fn exhausted_quota_blocks_exports() {
        let exhausted = state(PlanTier::Pro, 5, 5);
        assert!(!exhausted.allows(Feature::ExportCsv));
        assert_eq!(exhausted.exports_remaining(), 0);
    }
}
