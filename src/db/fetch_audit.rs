use anyhow::Result;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

use crate::models::FetchAudit;
use crate::utils::new_id;

const SELECT_FETCH_AUDIT: &str = r#"
    SELECT id, device_id, success, state_string, remark, created_at
    FROM fetch_audit
"#;

fn map_fetch_audit_row(row: &SqliteRow) -> FetchAudit {
    let success: i32 = row.get("success");
    FetchAudit {
        id: row.get("id"),
        device_id: row.get("device_id"),
        success: success == 1,
        state_string: row.get("state_string"),
        remark: row.get("remark"),
        created_at: row.get("created_at"),
    }
}

pub struct FetchAuditRepo;

impl FetchAuditRepo {
    /// Newest first
    pub async fn list(pool: &Pool<Sqlite>, limit: i32) -> Result<Vec<FetchAudit>> {
        let rows = sqlx::query(&format!(
            "{} ORDER BY created_at DESC, rowid DESC LIMIT ?",
            SELECT_FETCH_AUDIT
        ))
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(rows.iter().map(map_fetch_audit_row).collect())
    }

    pub async fn list_by_device(pool: &Pool<Sqlite>, device_id: &str, limit: i32) -> Result<Vec<FetchAudit>> {
        let rows = sqlx::query(&format!(
            "{} WHERE device_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
            SELECT_FETCH_AUDIT
        ))
        .bind(device_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(rows.iter().map(map_fetch_audit_row).collect())
    }

    pub async fn create(
        pool: &Pool<Sqlite>,
        device_id: &str,
        success: bool,
        state_string: &str,
        remark: &str,
    ) -> Result<FetchAudit> {
        let entry = FetchAudit {
            id: new_id(),
            device_id: device_id.to_string(),
            success,
            state_string: state_string.to_string(),
            remark: remark.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO fetch_audit (id, device_id, success, state_string, remark, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.device_id)
        .bind(entry.success as i32)
        .bind(&entry.state_string)
        .bind(&entry.remark)
        .bind(entry.created_at)
        .execute(pool)
        .await?;

        Ok(entry)
    }

    /// Keep only the newest `keep` rows
    pub async fn prune(pool: &Pool<Sqlite>, keep: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM fetch_audit WHERE rowid NOT IN (
                SELECT rowid FROM fetch_audit ORDER BY created_at DESC, rowid DESC LIMIT ?
            )
            "#,
        )
        .bind(keep)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
