use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

use crate::models::*;

use super::row_helpers::none_if_empty;

const SELECT_DEVICE_MODEL: &str = r#"
    SELECT dm.id, dm.name, dm.description, dm.default_config_name,
           dm.created_at, dm.updated_at,
           COALESCE(COUNT(d.id), 0) as device_count
    FROM device_models dm
    LEFT JOIN devices d ON d.model_id = dm.id
"#;

fn map_device_model_row(row: &SqliteRow) -> DeviceModel {
    DeviceModel {
        id: row.get("id"),
        name: row.get("name"),
        description: none_if_empty(row.get("description")),
        default_config_name: row.get("default_config_name"),
        device_count: Some(row.get("device_count")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub struct DeviceModelRepo;

impl DeviceModelRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<DeviceModel>> {
        let rows = sqlx::query(&format!(
            "{} GROUP BY dm.id ORDER BY dm.name",
            SELECT_DEVICE_MODEL
        ))
        .fetch_all(pool)
        .await?;

        Ok(rows.iter().map(map_device_model_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: &str) -> Result<Option<DeviceModel>> {
        let row = sqlx::query(&format!(
            "{} WHERE dm.id = ? GROUP BY dm.id",
            SELECT_DEVICE_MODEL
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row.as_ref().map(map_device_model_row))
    }

    pub async fn create(pool: &Pool<Sqlite>, id: &str, req: &CreateDeviceModelRequest) -> Result<DeviceModel> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO device_models (id, name, description, default_config_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(req.description.as_deref().unwrap_or(""))
        .bind(&req.default_config_name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Self::get(pool, id)
            .await?
            .context("Device model not found after creation")
    }

    pub async fn update(pool: &Pool<Sqlite>, id: &str, req: &UpdateDeviceModelRequest) -> Result<DeviceModel> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE device_models SET name = COALESCE(?, name),
                                     description = COALESCE(?, description),
                                     default_config_name = COALESCE(?, default_config_name),
                                     updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&req.name)
        .bind(&req.description)
        .bind(&req.default_config_name)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Device model", id).into());
        }

        Self::get(pool, id)
            .await?
            .context("Device model not found after update")
    }

    pub async fn delete(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM device_models WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Device model", id).into());
        }
        Ok(())
    }
}
