pub mod estimator;
pub mod events;
pub mod refresh;
pub mod relay;
pub mod renewal;
pub mod status;
pub mod usage;

pub use crate::domain::model::{BillingCycle, BillingEstimate, PlanTier, SubscriptionSnapshot};
pub use crate::domain::ports::{SubscriptionSource, Transport, TransportSession};
pub use crate::utils::error::Result;
