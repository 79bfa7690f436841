use crate::domain::model::{PlanTier, SubscriptionSnapshot};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    Students,
    Teachers,
    Classes,
    Campuses,
}

impl UsageKind {
    pub fn title(&self) -> &'static str {
        match self {
            UsageKind::Students => "Students",
            UsageKind::Teachers => "Teachers",
            UsageKind::Classes => "Classes",
            UsageKind::Campuses => "Campuses",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UsageMetric {
    pub kind: UsageKind,
    pub created: u64,
    pub limit: u64,
    pub percentage: f64,
}

/// 非有限值視為 0，結果限制在 0 到 100 之間
pub fn safe_percentage(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, 100.0),
        _ => 0.0,
    }
}

pub fn usage_metrics(snapshot: &SubscriptionSnapshot) -> [UsageMetric; 4] {
    let record = snapshot.subscription.as_ref();
    let details = snapshot.enhanced_details.as_ref();
    let usage = record.map(|r| r.usage).unwrap_or_default();
    let limits = record.map(|r| r.limits).unwrap_or_default();
    let plan_limits = PlanTier::from_name(snapshot.current_plan_name()).map(|tier| tier.limits());
    let percentages = details.map(|d| d.usage_percentages).unwrap_or_default();

    let students = UsageMetric {
        kind: UsageKind::Students,
        created: details
            .and_then(|d| d.total_student_count)
            .or(usage.students)
            .unwrap_or(0),
        limit: details
            .and_then(|d| d.allowed_student_count)
            .or(limits.max_students)
            .or(plan_limits.map(|l| l.students))
            .unwrap_or(0),
        percentage: safe_percentage(percentages.students),
    };

    let teachers = UsageMetric {
        kind: UsageKind::Teachers,
        created: details
            .and_then(|d| d.active_teacher_count)
            .or(usage.teachers)
            .unwrap_or(0),
        limit: details
            .and_then(|d| d.allowed_teacher_count)
            .or(limits.max_teachers)
            .or(plan_limits.map(|l| l.teachers))
            .unwrap_or(0),
        percentage: safe_percentage(percentages.teachers),
    };

    // 方案表沒有班級與校區上限
    let classes = UsageMetric {
        kind: UsageKind::Classes,
        created: usage.classes.unwrap_or(0),
        limit: details
            .and_then(|d| d.allowed_class_count)
            .or(limits.max_classes)
            .unwrap_or(0),
        percentage: safe_percentage(percentages.classes),
    };

    let campuses = UsageMetric {
        kind: UsageKind::Campuses,
        created: usage.campuses.unwrap_or(0),
        limit: details
            .and_then(|d| d.allowed_campus_count)
            .or(limits.max_campuses)
            .unwrap_or(0),
        percentage: safe_percentage(percentages.campuses),
    };

    [students, teachers, classes, campuses]
}
