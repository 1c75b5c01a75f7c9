use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// VirtualDevice holds configuration that is mirrored onto physical phones
/// of a site, e.g. shared line keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualDevice {
    pub id: String,
    pub name: String,
    pub site_id: String,
    pub model_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVirtualDeviceRequest {
    pub name: String,
    pub model_id: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// UpdateVirtualDeviceRequest renames a virtual device or toggles it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVirtualDeviceRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}
