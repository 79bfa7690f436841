use crate::core::events::SUBSCRIPTION_REFRESH_EVENTS;
use crate::core::refresh::RefreshOptions;
use crate::core::relay::{ReconnectPolicy, RelayOptions, SessionCredentials};
use crate::utils::error::{RelayError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_required_field,
    validate_token_shape, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_SOCKET_PATH: &str = "/socket.io/";
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub reconnection: Option<ReconnectionConfig>,
    pub refresh: Option<RefreshConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub base_url: String,
    pub socket_path: Option<String>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub token: Option<String>,
    pub user_id: Option<String>,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectionConfig {
    pub enabled: Option<bool>,
    pub attempts: Option<u32>,
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    pub poll_interval_seconds: Option<u64>,
    pub events: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub json: Option<bool>,
    pub verbose: Option<bool>,
}

impl RelayConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RelayError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RelayError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${RELAY_TOKEN})；未設定的變數保留原字串
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RelayError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_url("server.base_url", &self.server.base_url)?;

        if let Some(path) = &self.server.socket_path {
            validate_non_empty_string("server.socket_path", path)?;
        }
        if let Some(timeout) = self.server.request_timeout_seconds {
            validate_positive_number("server.request_timeout_seconds", timeout, 1)?;
        }

        if let Some(token) = &self.session.token {
            validate_token_shape("session.token", token)?;
        }
        if let Some(user_id) = &self.session.user_id {
            validate_non_empty_string("session.user_id", user_id)?;
        }

        if let Some(reconnection) = &self.reconnection {
            if let Some(attempts) = reconnection.attempts {
                validate_range("reconnection.attempts", attempts, 0, 100)?;
            }
            if let Some(delay) = reconnection.delay_ms {
                validate_range("reconnection.delay_ms", delay, 1, 60_000)?;
            }
        }

        if let Some(refresh) = &self.refresh {
            if let Some(interval) = refresh.poll_interval_seconds {
                validate_range("refresh.poll_interval_seconds", interval, 5, 86_400)?;
            }
            for event in refresh.events.iter().flatten() {
                validate_non_empty_string("refresh.events", event)?;
            }
        }

        Ok(())
    }

    pub fn socket_path(&self) -> &str {
        self.server
            .socket_path
            .as_deref()
            .unwrap_or(DEFAULT_SOCKET_PATH)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.server
                .request_timeout_seconds
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        )
    }

    /// watch / status 需要完整的登入資訊
    pub fn credentials(&self) -> Result<SessionCredentials> {
        let token = validate_required_field("session.token", &self.session.token)?;
        let user_id = validate_required_field("session.user_id", &self.session.user_id)?;

        Ok(SessionCredentials {
            user_id: user_id.clone(),
            token: token.clone(),
        })
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        let defaults = ReconnectPolicy::default();
        match &self.reconnection {
            Some(config) => ReconnectPolicy {
                enabled: config.enabled.unwrap_or(defaults.enabled),
                max_attempts: config.attempts.unwrap_or(defaults.max_attempts),
                delay: config
                    .delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.delay),
            },
            None => defaults,
        }
    }

    pub fn relay_options(&self) -> RelayOptions {
        RelayOptions {
            base_url: self.server.base_url.clone(),
            socket_path: self.socket_path().to_string(),
            reconnect: self.reconnect_policy(),
        }
    }

    pub fn refresh_options(&self) -> RefreshOptions {
        let refresh = self.refresh.as_ref();
        RefreshOptions {
            poll_interval: Duration::from_secs(
                refresh
                    .and_then(|r| r.poll_interval_seconds)
                    .unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS),
            ),
            events: refresh
                .and_then(|r| r.events.clone())
                .unwrap_or_else(|| {
                    SUBSCRIPTION_REFRESH_EVENTS
                        .iter()
                        .map(|event| event.to_string())
                        .collect()
                }),
        }
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }

    pub fn verbose(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.verbose).unwrap_or(false)
    }
}

impl Validate for RelayConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
