use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Site is a collection of phones owned by a single tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_count: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// CreateSiteRequest for creating new sites
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSiteRequest {
    pub name: String,
    #[serde(default)]
    pub remark: Option<String>,
}

/// UpdateSiteRequest renames a site or changes its remark
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSiteRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
}
