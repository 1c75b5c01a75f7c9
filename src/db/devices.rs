use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

use crate::models::*;
use crate::utils::new_id;

use super::row_helpers::none_if_empty;

const SELECT_DEVICE: &str = r#"
    SELECT id, name, site_id, model_id, mac_address, description, enabled,
           password_hash, created_at, updated_at
    FROM devices
"#;

fn map_device_row(row: &SqliteRow) -> Device {
    let enabled: i32 = row.get("enabled");
    Device {
        id: row.get("id"),
        name: row.get("name"),
        site_id: row.get("site_id"),
        model_id: row.get("model_id"),
        mac_address: row.get("mac_address"),
        description: none_if_empty(row.get("description")),
        enabled: enabled == 1,
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Device database operations
pub struct DeviceRepo;

impl DeviceRepo {
    pub async fn list_by_site(pool: &Pool<Sqlite>, site_id: &str) -> Result<Vec<Device>> {
        let rows = sqlx::query(&format!("{} WHERE site_id = ? ORDER BY name", SELECT_DEVICE))
            .bind(site_id)
            .fetch_all(pool)
            .await?;

        Ok(rows.iter().map(map_device_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: &str) -> Result<Option<Device>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_DEVICE))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.as_ref().map(map_device_row))
    }

    /// `mac` must already be normalized
    pub async fn get_by_mac(pool: &Pool<Sqlite>, mac: &str) -> Result<Option<Device>> {
        let row = sqlx::query(&format!("{} WHERE mac_address = ?", SELECT_DEVICE))
            .bind(mac)
            .fetch_optional(pool)
            .await?;

        Ok(row.as_ref().map(map_device_row))
    }

    /// New devices start disabled
    pub async fn create(
        pool: &Pool<Sqlite>,
        site_id: &str,
        mac: &str,
        password_hash: &str,
        req: &CreateDeviceRequest,
    ) -> Result<Device> {
        let id = new_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO devices (id, name, site_id, model_id, mac_address, description, enabled,
                                 password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&req.name)
        .bind(site_id)
        .bind(&req.model_id)
        .bind(mac)
        .bind(req.description.as_deref().unwrap_or(""))
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Self::get(pool, &id)
            .await?
            .context("Device not found after creation")
    }

    pub async fn update(pool: &Pool<Sqlite>, id: &str, req: &UpdateDeviceRequest) -> Result<Device> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE devices SET name = COALESCE(?, name),
                               description = COALESCE(?, description),
                               site_id = COALESCE(?, site_id),
                               updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&req.name)
        .bind(&req.description)
        .bind(&req.site_id)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Device", id).into());
        }

        Self::get(pool, id)
            .await?
            .context("Device not found after update")
    }

    pub async fn set_enabled(pool: &Pool<Sqlite>, id: &str, enabled: bool) -> Result<Device> {
        let result = sqlx::query("UPDATE devices SET enabled = ?, updated_at = ? WHERE id = ?")
            .bind(enabled as i32)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Device", id).into());
        }

        Self::get(pool, id)
            .await?
            .context("Device not found after update")
    }

    pub async fn delete(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM devices WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Device", id).into());
        }
        Ok(())
    }
}
