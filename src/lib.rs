pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::RelayConfig;

pub use crate::adapters::{HttpSubscriptionSource, WebSocketTransport};
pub use crate::core::estimator::{calculate_estimate, determine_plan_for_counts};
pub use crate::core::refresh::{RefreshCoordinator, RefreshHandle, RefreshOptions};
pub use crate::core::relay::{
    NotificationRelay, ReconnectPolicy, RelayHandle, RelayOptions, SessionCredentials,
    Subscription,
};
pub use crate::domain::model::{
    BillingCycle, BillingEstimate, ConnectionState, PlanTier, SubscriptionSnapshot,
    SubscriptionStatus,
};
pub use crate::utils::error::{RelayError, Result};
