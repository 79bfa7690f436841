use crate::domain::model::{BillingCycle, BillingEstimate, PlanTier};

/// 每位超額學生的月費
pub const EXTRA_STUDENT_RATE: u64 = 40;
/// 每位超額教師的月費
pub const EXTRA_TEACHER_RATE: u64 = 120;

const FREE_STUDENT_CEILING: u64 = 100;
const FREE_TEACHER_CEILING: u64 = 10;

/// 依人數判斷方案：只在 free 與 educational_institutions_premium 之間選擇，
/// 兩個付費個人方案只能由使用者明確選擇。
pub fn determine_plan_for_counts(students: u64, teachers: u64) -> PlanTier {
    if students <= FREE_STUDENT_CEILING && teachers <= FREE_TEACHER_CEILING {
        PlanTier::Free
    } else {
        PlanTier::EducationalInstitutionsPremium
    }
}

/// 以名稱計算費用估算。
///
/// 未知的方案名稱會套用 free 方案，未知的計費週期會套用 yearly；
/// 兩者都不會回傳錯誤，只留下 warn 日誌。
pub fn calculate_estimate(
    plan_name: &str,
    billing_cycle: &str,
    students: u64,
    teachers: u64,
) -> BillingEstimate {
    let tier = PlanTier::from_name(plan_name).unwrap_or_else(|| {
        tracing::warn!(
            "⚠️ Unknown plan '{}' in estimate, falling back to free plan pricing",
            plan_name
        );
        PlanTier::Free
    });

    let cycle = if billing_cycle.trim().is_empty() {
        BillingCycle::default()
    } else {
        BillingCycle::from_name(billing_cycle).unwrap_or_else(|| {
            tracing::warn!(
                "⚠️ Unknown billing cycle '{}' in estimate, falling back to yearly",
                billing_cycle
            );
            BillingCycle::default()
        })
    };

    estimate(tier, cycle, students, teachers)
}

pub fn estimate(tier: PlanTier, cycle: BillingCycle, students: u64, teachers: u64) -> BillingEstimate {
    let plan = tier.config();
    let multiplier = cycle.multiplier();

    let extra_students = students.saturating_sub(plan.limits.students);
    let extra_teachers = teachers.saturating_sub(plan.limits.teachers);

    // 人數來自使用者輸入，極端值封頂在 u64::MAX 而不是溢位
    let base_amount = plan.base_price.saturating_mul(multiplier);
    let extra_amount = extra_students
        .saturating_mul(EXTRA_STUDENT_RATE)
        .saturating_add(extra_teachers.saturating_mul(EXTRA_TEACHER_RATE))
        .saturating_mul(multiplier);

    BillingEstimate {
        amount: base_amount.saturating_add(extra_amount),
        extra_students,
        extra_teachers,
    }
}
