use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

use crate::models::*;
use crate::utils::new_id;

use super::row_helpers::none_if_empty;

const SELECT_VIRTUAL_DEVICE: &str = r#"
    SELECT id, name, site_id, model_id, description, enabled, created_at, updated_at
    FROM virtual_devices
"#;

fn map_virtual_device_row(row: &SqliteRow) -> VirtualDevice {
    let enabled: i32 = row.get("enabled");
    VirtualDevice {
        id: row.get("id"),
        name: row.get("name"),
        site_id: row.get("site_id"),
        model_id: row.get("model_id"),
        description: none_if_empty(row.get("description")),
        enabled: enabled == 1,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Virtual device database operations. Every lookup is scoped to a site.
pub struct VirtualDeviceRepo;

impl VirtualDeviceRepo {
    pub async fn list_by_site(pool: &Pool<Sqlite>, site_id: &str) -> Result<Vec<VirtualDevice>> {
        let rows = sqlx::query(&format!("{} WHERE site_id = ? ORDER BY name", SELECT_VIRTUAL_DEVICE))
            .bind(site_id)
            .fetch_all(pool)
            .await?;

        Ok(rows.iter().map(map_virtual_device_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, site_id: &str, id: &str) -> Result<Option<VirtualDevice>> {
        let row = sqlx::query(&format!("{} WHERE site_id = ? AND id = ?", SELECT_VIRTUAL_DEVICE))
            .bind(site_id)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.as_ref().map(map_virtual_device_row))
    }

    /// New virtual devices start disabled
    pub async fn create(
        pool: &Pool<Sqlite>,
        site_id: &str,
        req: &CreateVirtualDeviceRequest,
    ) -> Result<VirtualDevice> {
        let id = new_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO virtual_devices (id, name, site_id, model_id, description, enabled,
                                         created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&req.name)
        .bind(site_id)
        .bind(&req.model_id)
        .bind(req.description.as_deref().unwrap_or(""))
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Self::get(pool, site_id, &id)
            .await?
            .context("Virtual device not found after creation")
    }

    pub async fn update(
        pool: &Pool<Sqlite>,
        site_id: &str,
        id: &str,
        req: &UpdateVirtualDeviceRequest,
    ) -> Result<VirtualDevice> {
        let result = sqlx::query(
            r#"
            UPDATE virtual_devices SET name = COALESCE(?, name),
                                       description = COALESCE(?, description),
                                       enabled = COALESCE(?, enabled),
                                       updated_at = ?
            WHERE site_id = ? AND id = ?
            "#,
        )
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.enabled.map(|e| e as i32))
        .bind(Utc::now())
        .bind(site_id)
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Virtual device", id).into());
        }

        Self::get(pool, site_id, id)
            .await?
            .context("Virtual device not found after update")
    }

    pub async fn delete(pool: &Pool<Sqlite>, site_id: &str, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM virtual_devices WHERE site_id = ? AND id = ?")
            .bind(site_id)
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Virtual device", id).into());
        }
        Ok(())
    }

    /// Number of virtual devices built on a model
    pub async fn count_by_model(pool: &Pool<Sqlite>, model_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM virtual_devices WHERE model_id = ?")
            .bind(model_id)
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    pub async fn count_by_site(pool: &Pool<Sqlite>, site_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM virtual_devices WHERE site_id = ?")
            .bind(site_id)
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}
