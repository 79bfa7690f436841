use crate::core::estimator::{determine_plan_for_counts, estimate};
use crate::domain::model::{BillingCycle, BillingEstimate, PlanTier, SubscriptionSnapshot};
use crate::utils::error::Result;
use crate::utils::validation::parse_headcount;
use serde::Serialize;

/// 續約表單送出的人數
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalRequest {
    pub students: u64,
    pub teachers: u64,
    pub billing_cycle: BillingCycle,
}

impl RenewalRequest {
    pub fn from_form(students: &str, teachers: &str) -> Result<Self> {
        Ok(Self {
            students: parse_headcount("students", students)?,
            teachers: parse_headcount("teachers", teachers)?,
            billing_cycle: BillingCycle::Yearly,
        })
    }

    /// 以目前用量作為表單預設值
    pub fn prefilled(snapshot: &SubscriptionSnapshot) -> Self {
        let details = snapshot.enhanced_details.as_ref();
        let usage = snapshot.subscription.as_ref().map(|record| record.usage);

        Self {
            students: details
                .and_then(|d| d.total_student_count)
                .or_else(|| usage.and_then(|u| u.students))
                .unwrap_or(0),
            teachers: details
                .and_then(|d| d.active_teacher_count)
                .or_else(|| usage.and_then(|u| u.teachers))
                .unwrap_or(0),
            billing_cycle: BillingCycle::Yearly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenewalQuote {
    pub plan: PlanTier,
    pub students: u64,
    pub teachers: u64,
    pub estimate: BillingEstimate,
}

/// 續約建議：目前已是付費方案就沿用，否則依人數判斷。
/// 兩個人數都為 0 時不給建議。
pub fn recommend_renewal(current_plan_name: &str, students: u64, teachers: u64) -> Option<RenewalQuote> {
    if students == 0 && teachers == 0 {
        return None;
    }

    let plan = match PlanTier::from_name(current_plan_name) {
        Some(tier) if tier != PlanTier::Free => tier,
        Some(_) => determine_plan_for_counts(students, teachers),
        None => {
            tracing::warn!(
                "⚠️ Current plan '{}' is not a known tier, recommending by headcount",
                current_plan_name
            );
            determine_plan_for_counts(students, teachers)
        }
    };

    Some(RenewalQuote {
        plan,
        students,
        teachers,
        estimate: estimate(plan, BillingCycle::Yearly, students, teachers),
    })
}

impl SubscriptionSnapshot {
    pub fn renewal_quote(&self, request: &RenewalRequest) -> Option<RenewalQuote> {
        recommend_renewal(self.current_plan_name(), request.students, request.teachers)
    }
}
