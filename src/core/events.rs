//! 伺服器推送的事件名稱；payload 形狀由後端決定，這裡一律當成不透明 JSON。

pub const SUBSCRIPTION_ACTIVATED: &str = "subscription:activated";
pub const SUBSCRIPTION_CANCELLED: &str = "subscription:cancelled";
pub const SCHOOL_SUBSCRIPTION_UPDATED: &str = "school:subscription:updated";
pub const SUBSCRIPTION_EXPIRATION_NOTIFICATION: &str = "subscription:expiration:notification";
pub const CONTENT_APPROVED: &str = "content:approved";
pub const CONTENT_REJECTED: &str = "content:rejected";
pub const ADMIN_UPDATE_FAMILY: &str = "admin:*:update";

/// 會讓訂閱資料過期、需要重新拉取的事件
pub const SUBSCRIPTION_REFRESH_EVENTS: [&str; 4] = [
    SCHOOL_SUBSCRIPTION_UPDATED,
    SUBSCRIPTION_EXPIRATION_NOTIFICATION,
    SUBSCRIPTION_ACTIVATED,
    SUBSCRIPTION_CANCELLED,
];

pub const KNOWN_EVENTS: [&str; 7] = [
    SUBSCRIPTION_ACTIVATED,
    SUBSCRIPTION_CANCELLED,
    SCHOOL_SUBSCRIPTION_UPDATED,
    SUBSCRIPTION_EXPIRATION_NOTIFICATION,
    CONTENT_APPROVED,
    CONTENT_REJECTED,
    ADMIN_UPDATE_FAMILY,
];
