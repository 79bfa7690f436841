use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 訂閱方案等級，順序即為方案由小到大的排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    StudentPremium,
    StudentParentPremiumPro,
    EducationalInstitutionsPremium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanLimits {
    pub students: u64,
    pub teachers: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanConfig {
    pub display_label: &'static str,
    /// 基本月費（整數盧比）
    pub base_price: u64,
    pub limits: PlanLimits,
}

const FREE_PLAN: PlanConfig = PlanConfig {
    display_label: "Free Plan",
    base_price: 0,
    limits: PlanLimits {
        students: 100,
        teachers: 10,
    },
};

const STUDENT_PREMIUM_PLAN: PlanConfig = PlanConfig {
    display_label: "Student Premium Plan",
    base_price: 4499,
    limits: PlanLimits {
        students: 1000,
        teachers: 100,
    },
};

const STUDENT_PARENT_PREMIUM_PRO_PLAN: PlanConfig = PlanConfig {
    display_label: "Student + Parent Premium Pro Plan",
    base_price: 4999,
    limits: PlanLimits {
        students: 1000,
        teachers: 100,
    },
};

const EDUCATIONAL_INSTITUTIONS_PREMIUM_PLAN: PlanConfig = PlanConfig {
    display_label: "Educational Institutions Premium Plan",
    base_price: 0,
    limits: PlanLimits {
        students: 10000,
        teachers: 1000,
    },
};

impl PlanTier {
    pub const ALL: [PlanTier; 4] = [
        PlanTier::Free,
        PlanTier::StudentPremium,
        PlanTier::StudentParentPremiumPro,
        PlanTier::EducationalInstitutionsPremium,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::StudentPremium => "student_premium",
            PlanTier::StudentParentPremiumPro => "student_parent_premium_pro",
            PlanTier::EducationalInstitutionsPremium => "educational_institutions_premium",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.name() == name.trim())
    }

    pub fn config(&self) -> &'static PlanConfig {
        match self {
            PlanTier::Free => &FREE_PLAN,
            PlanTier::StudentPremium => &STUDENT_PREMIUM_PLAN,
            PlanTier::StudentParentPremiumPro => &STUDENT_PARENT_PREMIUM_PRO_PLAN,
            PlanTier::EducationalInstitutionsPremium => &EDUCATIONAL_INSTITUTIONS_PREMIUM_PLAN,
        }
    }

    pub fn display_label(&self) -> &'static str {
        self.config().display_label
    }

    pub fn base_price(&self) -> u64 {
        self.config().base_price
    }

    pub fn limits(&self) -> PlanLimits {
        self.config().limits
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    #[default]
    Yearly,
}

impl BillingCycle {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "yearly" => Some(BillingCycle::Yearly),
            _ => None,
        }
    }

    pub fn multiplier(&self) -> u64 {
        match self {
            BillingCycle::Yearly => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingEstimate {
    pub amount: u64,
    pub extra_students: u64,
    pub extra_teachers: u64,
}

impl BillingEstimate {
    pub fn has_overage(&self) -> bool {
        self.extra_students > 0 || self.extra_teachers > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Pending,
    Cancelled,
    Expired,
    #[default]
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Paid,
    Pending,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_id: String,
    #[serde(default)]
    pub amount: u64,
    pub status: InvoiceStatus,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<u64>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub students: Option<u64>,
    pub teachers: Option<u64>,
    pub classes: Option<u64>,
    pub campuses: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubscriptionLimits {
    pub max_students: Option<u64>,
    pub max_teachers: Option<u64>,
    pub max_classes: Option<u64>,
    pub max_campuses: Option<u64>,
}

/// 後端擁有的訂閱紀錄，前端只讀取
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub usage: Usage,
    pub limits: SubscriptionLimits,
    pub end_date: Option<DateTime<Utc>>,
    pub current_cycle_start_date: Option<DateTime<Utc>>,
    pub last_renewed_at: Option<DateTime<Utc>>,
    pub invoices: Vec<Invoice>,
}

impl SubscriptionRecord {
    /// 未設定方案名稱時視為 free
    pub fn plan_name(&self) -> &str {
        self.plan.name.as_deref().unwrap_or("free")
    }

    pub fn plan_tier(&self) -> Option<PlanTier> {
        PlanTier::from_name(self.plan_name())
    }

    pub fn plan_price(&self) -> u64 {
        self.plan
            .price
            .or_else(|| self.plan_tier().map(|tier| tier.base_price()))
            .unwrap_or(0)
    }

    pub fn plan_label(&self) -> &str {
        self.plan
            .display_name
            .as_deref()
            .or_else(|| self.plan_tier().map(|tier| tier.display_label()))
            .unwrap_or("Unknown Plan")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UsagePercentages {
    pub students: Option<f64>,
    pub teachers: Option<f64>,
    pub classes: Option<f64>,
    pub campuses: Option<f64>,
}

/// 後端計算好的訂閱附加資訊
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnhancedDetails {
    pub status: Option<SubscriptionStatus>,
    pub next_billing_date: Option<DateTime<Utc>>,
    pub days_remaining: Option<i64>,
    pub current_cycle_start_date: Option<DateTime<Utc>>,
    pub total_student_count: Option<u64>,
    pub active_teacher_count: Option<u64>,
    pub allowed_student_count: Option<u64>,
    pub allowed_teacher_count: Option<u64>,
    pub allowed_class_count: Option<u64>,
    pub allowed_campus_count: Option<u64>,
    pub usage_percentages: UsagePercentages,
}

/// `GET /api/school/admin/subscription/enhanced` 的回應內容
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubscriptionSnapshot {
    pub subscription: Option<SubscriptionRecord>,
    pub enhanced_details: Option<EnhancedDetails>,
}

impl SubscriptionSnapshot {
    pub fn current_plan_name(&self) -> &str {
        self.subscription
            .as_ref()
            .map(|record| record.plan_name())
            .unwrap_or("free")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(label)
    }
}

/// 斷線原因；名稱沿用 Socket.IO client 的 reason 字串
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    ClientDisconnect,
    ServerDisconnect,
    TransportClose,
    TransportError(String),
    PingTimeout,
}

impl DisconnectReason {
    /// 主動斷線不自動重連
    pub fn is_intentional(&self) -> bool {
        matches!(
            self,
            DisconnectReason::ClientDisconnect | DisconnectReason::ServerDisconnect
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            DisconnectReason::ClientDisconnect => "io client disconnect",
            DisconnectReason::ServerDisconnect => "io server disconnect",
            DisconnectReason::TransportClose => "transport close",
            DisconnectReason::TransportError(_) => "transport error",
            DisconnectReason::PingTimeout => "ping timeout",
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::TransportError(detail) => write!(f, "transport error: {}", detail),
            other => f.write_str(other.as_str()),
        }
    }
}
