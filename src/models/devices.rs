use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tree::DeviceTarget;

/// Device is a specific desk phone (or DECT base station) assigned to a site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub site_id: String,
    pub model_id: String,
    /// 12 upper-case hex digits, no separators
    pub mac_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub enabled: bool,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Device {
    /// The scope ids this device's configuration is merged from
    pub fn target(&self) -> DeviceTarget {
        DeviceTarget {
            device_id: self.id.clone(),
            model_id: self.model_id.clone(),
            site_id: self.site_id.clone(),
        }
    }
}

/// CreateDeviceRequest for registering a phone under a site
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeviceRequest {
    pub name: String,
    pub model_id: String,
    pub mac_address: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// UpdateDeviceRequest renames a device or moves it to another site
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDeviceRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub site_id: Option<String>,
}

/// Returned once on creation; the plain password is never stored
#[derive(Debug, Clone, Serialize)]
pub struct CreatedDevice {
    #[serde(flatten)]
    pub device: Device,
    pub password: String,
}
