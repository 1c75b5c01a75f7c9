use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// DeviceModel is a phone model; configuration can be bound to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceModel {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name of the vendor default config file the phone requests (e.g. `y000000000108.cfg`)
    pub default_config_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_count: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeviceModelRequest {
    /// Generated when omitted
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub default_config_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDeviceModelRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_config_name: Option<String>,
}
