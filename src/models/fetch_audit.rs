use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One configuration fetch attempt by a known device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchAudit {
    pub id: String,
    pub device_id: String,
    pub success: bool,
    pub state_string: String,
    pub remark: String,
    pub created_at: DateTime<Utc>,
}

/// Canonical fetch outcome reasons
pub mod fetch_reason {
    pub const DEVICE_NOT_ENABLED: &str = "device_not_enabled";
    pub const INCORRECT_USERNAME: &str = "incorrect_username";
    pub const INCORRECT_PASSWORD: &str = "incorrect_password";
    pub const SITE_NOT_FOUND: &str = "site_not_found";
    pub const SITE_NOT_ENABLED: &str = "site_not_enabled";
    pub const MODEL_NOT_FOUND: &str = "model_not_found";
    pub const NO_CONFIGURATION: &str = "no_configuration";
    pub const AUTH_OK_CONFIG_PRESENT: &str = "auth_ok_config_present";
}
