use chrono::{Duration, Utc};
use serde_json::json;
use subscription_relay::core::estimator::{EXTRA_STUDENT_RATE, EXTRA_TEACHER_RATE};
use subscription_relay::core::renewal::RenewalRequest;
use subscription_relay::core::usage::{usage_metrics, UsageKind};
use subscription_relay::utils::format::format_inr;
use subscription_relay::{
    calculate_estimate, determine_plan_for_counts, PlanTier, RelayError, SubscriptionSnapshot,
    SubscriptionStatus,
};
use tokio_test::{assert_err, assert_ok};

#[test]
fn test_small_school_stays_free() {
    assert_eq!(determine_plan_for_counts(50, 5), PlanTier::Free);

    let estimate = calculate_estimate("free", "yearly", 50, 5);
    assert_eq!(estimate.amount, 0);
    assert_eq!(estimate.extra_students, 0);
    assert_eq!(estimate.extra_teachers, 0);
}

#[test]
fn test_large_school_moves_to_institution_plan() {
    let tier = determine_plan_for_counts(500, 50);
    assert_eq!(tier, PlanTier::EducationalInstitutionsPremium);

    let estimate = calculate_estimate(tier.name(), "yearly", 500, 50);
    assert_eq!(estimate.amount, 0);
    assert!(!estimate.has_overage());
}

#[test]
fn test_amount_never_below_base_price() {
    for tier in PlanTier::ALL {
        for (students, teachers) in [(0, 0), (99, 9), (1000, 100), (1500, 140), (12000, 1100)] {
            let estimate = calculate_estimate(tier.name(), "yearly", students, teachers);
            assert!(estimate.amount >= tier.base_price() * 12);
        }
    }
}

#[test]
fn test_estimate_is_deterministic() {
    let first = calculate_estimate("student_premium", "yearly", 1234, 150);
    let second = calculate_estimate("student_premium", "yearly", 1234, 150);
    assert_eq!(first, second);
    assert_eq!(
        first.amount,
        (4499 + 234 * EXTRA_STUDENT_RATE + 50 * EXTRA_TEACHER_RATE) * 12
    );
    assert_eq!(format_inr(first.amount), "₹2,38,308");
}

#[test]
fn test_form_input_parsing() {
    let request = assert_ok!(RenewalRequest::from_form(" 250 ", ""));
    assert_eq!(request.students, 250);
    assert_eq!(request.teachers, 0);

    let err = assert_err!(RenewalRequest::from_form("12.5", "3"));
    assert!(matches!(err, RelayError::ValidationError { .. }));
    assert!(err
        .user_friendly_message()
        .ends_with("Please provide a valid number of students."));
}

#[test]
fn test_largest_form_headcount_estimates_without_panic() {
    let request = assert_ok!(RenewalRequest::from_form("18446744073709551615", "0"));
    assert_eq!(request.students, u64::MAX);

    let estimate = calculate_estimate("free", "yearly", request.students, request.teachers);
    assert_eq!(estimate.amount, u64::MAX);
    assert!(estimate.has_overage());

    // One past u64::MAX is rejected at parse time.
    assert_err!(RenewalRequest::from_form("18446744073709551616", "0"));
}

#[test]
fn test_stale_active_record_reads_as_expired() {
    let yesterday = Utc::now() - Duration::days(1);
    let snapshot: SubscriptionSnapshot = serde_json::from_value(json!({
        "subscription": {
            "plan": {"name": "student_premium", "price": 4499},
            "status": "active",
            "endDate": yesterday.to_rfc3339(),
        },
        "enhancedDetails": {
            "status": "active",
            "daysRemaining": 0
        }
    }))
    .unwrap();

    let now = Utc::now();
    assert_eq!(snapshot.actual_status(now), SubscriptionStatus::Expired);
    assert!(snapshot.can_renew(now));
}

#[test]
fn test_dashboard_view_of_backend_document() {
    let now = Utc::now();
    let end_date = now + Duration::days(200);
    let snapshot: SubscriptionSnapshot = serde_json::from_value(json!({
        "subscription": {
            "plan": {"name": "student_parent_premium_pro"},
            "status": "active",
            "usage": {"students": 640, "teachers": 48, "classes": 22, "campuses": 2},
            "limits": {"maxClasses": 50},
            "endDate": end_date.to_rfc3339(),
            "invoices": [
                {"invoiceId": "INV-2026-001", "amount": 59988, "status": "paid"}
            ]
        },
        "enhancedDetails": {
            "status": "active",
            "daysRemaining": 200,
            "totalStudentCount": 652,
            "usagePercentages": {"students": 65.2, "teachers": 148.0, "classes": null}
        }
    }))
    .unwrap();

    assert_eq!(snapshot.actual_status(now), SubscriptionStatus::Active);
    // Outside the 60-day window while active.
    assert!(!snapshot.can_renew(now));

    let metrics = usage_metrics(&snapshot);
    let students = metrics[0];
    assert_eq!(students.kind, UsageKind::Students);
    assert_eq!(students.created, 652);
    assert_eq!(students.limit, 1000);
    assert_eq!(students.percentage, 65.2);

    let teachers = metrics[1];
    assert_eq!(teachers.created, 48);
    assert_eq!(teachers.percentage, 100.0);

    let classes = metrics[2];
    assert_eq!(classes.limit, 50);
    assert_eq!(classes.percentage, 0.0);

    let quote = snapshot
        .renewal_quote(&RenewalRequest::prefilled(&snapshot))
        .unwrap();
    assert_eq!(quote.plan, PlanTier::StudentParentPremiumPro);
    assert_eq!(quote.students, 652);
    assert_eq!(quote.estimate.amount, 4999 * 12);
}

#[test]
fn test_missing_enhanced_details_still_reads_as_expired() {
    let yesterday = Utc::now() - Duration::days(1);
    let snapshot: SubscriptionSnapshot = serde_json::from_value(json!({
        "subscription": {"status": "active", "endDate": yesterday.to_rfc3339()}
    }))
    .unwrap();

    let now = Utc::now();
    assert_eq!(snapshot.actual_status(now), SubscriptionStatus::Expired);
    assert!(!snapshot.can_renew(now));
}
