use crate::domain::model::{EnhancedDetails, SubscriptionSnapshot, SubscriptionStatus};
use chrono::{DateTime, Utc};

/// 距到期天數小於等於此值即可續約
pub const RENEWAL_WINDOW_DAYS: i64 = 60;

/// 後端狀態可能過期：仍標示 active/pending 但 end_date 已過時，改判為 expired
pub fn derive_status(
    stored: SubscriptionStatus,
    end_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> SubscriptionStatus {
    match (stored, end_date) {
        (SubscriptionStatus::Active | SubscriptionStatus::Pending, Some(end)) if end <= now => {
            SubscriptionStatus::Expired
        }
        _ => stored,
    }
}

impl SubscriptionSnapshot {
    /// 畫面上應顯示的狀態
    pub fn actual_status(&self, now: DateTime<Utc>) -> SubscriptionStatus {
        let record = self.subscription.as_ref();
        let record_status = record.map(|record| record.status).unwrap_or_default();

        let Some(details) = &self.enhanced_details else {
            return derive_status(record_status, record.and_then(|r| r.end_date), now);
        };

        let stored = match details.status {
            Some(status) if status != SubscriptionStatus::Unknown => status,
            _ => record_status,
        };
        let end_date = self
            .subscription
            .as_ref()
            .and_then(|record| record.end_date)
            .or(details.next_billing_date);

        derive_status(stored, end_date, now)
    }

    pub fn can_renew(&self, now: DateTime<Utc>) -> bool {
        can_renew(self.enhanced_details.as_ref(), self.actual_status(now))
    }
}

pub fn can_renew(details: Option<&EnhancedDetails>, actual_status: SubscriptionStatus) -> bool {
    let Some(details) = details else {
        return false;
    };

    let not_active = actual_status != SubscriptionStatus::Active;
    match details.days_remaining {
        Some(days) => days <= RENEWAL_WINDOW_DAYS || not_active,
        None => not_active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::SubscriptionRecord;
    use chrono::Duration;

    fn record(status: SubscriptionStatus, end_date: Option<DateTime<Utc>>) -> SubscriptionRecord {
        SubscriptionRecord {
            status,
            end_date,
            ..Default::default()
        }
    }

    #[test]
    fn test_active_past_end_date_is_expired() {
        let now = Utc::now();
        let yesterday = now - Duration::days(1);
        assert_eq!(
            derive_status(SubscriptionStatus::Active, Some(yesterday), now),
            SubscriptionStatus::Expired
        );
        assert_eq!(
            derive_status(SubscriptionStatus::Pending, Some(now), now),
            SubscriptionStatus::Expired
        );
    }

    #[test]
    fn test_other_statuses_are_not_overridden() {
        let now = Utc::now();
        let yesterday = now - Duration::days(1);
        assert_eq!(
            derive_status(SubscriptionStatus::Cancelled, Some(yesterday), now),
            SubscriptionStatus::Cancelled
        );
        assert_eq!(
            derive_status(SubscriptionStatus::Active, Some(now + Duration::days(3)), now),
            SubscriptionStatus::Active
        );
        assert_eq!(
            derive_status(SubscriptionStatus::Active, None, now),
            SubscriptionStatus::Active
        );
    }

    #[test]
    fn test_snapshot_prefers_enhanced_status_and_record_end_date() {
        let now = Utc::now();
        let snapshot = SubscriptionSnapshot {
            subscription: Some(record(
                SubscriptionStatus::Pending,
                Some(now - Duration::hours(2)),
            )),
            enhanced_details: Some(EnhancedDetails {
                status: Some(SubscriptionStatus::Active),
                next_billing_date: Some(now + Duration::days(30)),
                ..Default::default()
            }),
        };
        assert_eq!(snapshot.actual_status(now), SubscriptionStatus::Expired);
    }

    #[test]
    fn test_snapshot_without_details_still_derives_expiry() {
        let now = Utc::now();
        let snapshot = SubscriptionSnapshot {
            subscription: Some(record(
                SubscriptionStatus::Active,
                Some(now - Duration::days(1)),
            )),
            enhanced_details: None,
        };
        assert_eq!(snapshot.actual_status(now), SubscriptionStatus::Expired);
        // 沒有附加資訊時不提供續約
        assert!(!snapshot.can_renew(now));

        let current = SubscriptionSnapshot {
            subscription: Some(record(
                SubscriptionStatus::Active,
                Some(now + Duration::days(10)),
            )),
            enhanced_details: None,
        };
        assert_eq!(current.actual_status(now), SubscriptionStatus::Active);
    }

    #[test]
    fn test_can_renew_window() {
        let details = |days: Option<i64>| EnhancedDetails {
            days_remaining: days,
            ..Default::default()
        };

        assert!(can_renew(Some(&details(Some(60))), SubscriptionStatus::Active));
        assert!(!can_renew(Some(&details(Some(61))), SubscriptionStatus::Active));
        assert!(can_renew(Some(&details(Some(200))), SubscriptionStatus::Expired));
        assert!(!can_renew(Some(&details(None)), SubscriptionStatus::Active));
        assert!(can_renew(Some(&details(None)), SubscriptionStatus::Cancelled));
        assert!(!can_renew(None, SubscriptionStatus::Expired));
    }
}
