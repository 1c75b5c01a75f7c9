use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

use crate::models::*;
use crate::utils::new_id;

use super::row_helpers::none_if_empty;

const SELECT_SITE: &str = r#"
    SELECT s.id, s.name, s.remark, s.enabled, s.created_at, s.updated_at,
           COALESCE(COUNT(d.id), 0) as device_count
    FROM sites s
    LEFT JOIN devices d ON d.site_id = s.id
"#;

fn map_site_row(row: &SqliteRow) -> Site {
    let enabled: i32 = row.get("enabled");
    Site {
        id: row.get("id"),
        name: row.get("name"),
        remark: none_if_empty(row.get("remark")),
        enabled: enabled == 1,
        device_count: Some(row.get("device_count")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub struct SiteRepo;

impl SiteRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<Site>> {
        let rows = sqlx::query(&format!("{} GROUP BY s.id ORDER BY s.name", SELECT_SITE))
            .fetch_all(pool)
            .await?;

        Ok(rows.iter().map(map_site_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: &str) -> Result<Option<Site>> {
        let row = sqlx::query(&format!("{} WHERE s.id = ? GROUP BY s.id", SELECT_SITE))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.as_ref().map(map_site_row))
    }

    /// New sites start disabled
    pub async fn create(pool: &Pool<Sqlite>, req: &CreateSiteRequest) -> Result<Site> {
        let id = new_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO sites (id, name, remark, enabled, created_at, updated_at)
            VALUES (?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&req.name)
        .bind(req.remark.as_deref().unwrap_or(""))
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Self::get(pool, &id)
            .await?
            .context("Site not found after creation")
    }

    pub async fn update(pool: &Pool<Sqlite>, id: &str, req: &UpdateSiteRequest) -> Result<Site> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE sites SET name = COALESCE(?, name), remark = COALESCE(?, remark), updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&req.name)
        .bind(&req.remark)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Site", id).into());
        }

        Self::get(pool, id)
            .await?
            .context("Site not found after update")
    }

    pub async fn set_enabled(pool: &Pool<Sqlite>, id: &str, enabled: bool) -> Result<Site> {
        let result = sqlx::query("UPDATE sites SET enabled = ?, updated_at = ? WHERE id = ?")
            .bind(enabled as i32)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Site", id).into());
        }

        Self::get(pool, id)
            .await?
            .context("Site not found after update")
    }

    pub async fn delete(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM sites WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Site", id).into());
        }
        Ok(())
    }
}
