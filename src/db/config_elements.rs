use anyhow::{Context, Result};
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

use crate::models::ConfigElement;
use crate::tree::ElementFilter;

use super::row_helpers::none_if_empty;

const SELECT_ELEMENT: &str = r#"
    SELECT id, group_id, key, value, published, remark, created_at
    FROM config_elements
"#;

fn map_element_row(row: &SqliteRow) -> ConfigElement {
    let published: i32 = row.get("published");
    ConfigElement {
        id: row.get("id"),
        group_id: row.get("group_id"),
        key: row.get("key"),
        value: row.get("value"),
        published: published == 1,
        remark: none_if_empty(row.get("remark")),
        created_at: row.get("created_at"),
    }
}

fn filter_clause(filter: &ElementFilter) -> (String, Vec<&str>) {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    let columns = [
        ("id", filter.id.as_deref()),
        ("group_id", filter.group_id.as_deref()),
        ("key", filter.key.as_deref()),
    ];
    for (column, value) in columns {
        if let Some(value) = value {
            conditions.push(format!("{} = ?", column));
            binds.push(value);
        }
    }

    if conditions.is_empty() {
        (String::new(), binds)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), binds)
    }
}

pub struct ElementRepo;

impl ElementRepo {
    pub async fn find(pool: &Pool<Sqlite>, filter: &ElementFilter) -> Result<Vec<ConfigElement>> {
        let (clause, binds) = filter_clause(filter);
        let sql = format!("{} {} ORDER BY rowid", SELECT_ELEMENT, clause);
        let mut query = sqlx::query(&sql);
        for value in binds {
            query = query.bind(value);
        }
        let rows = query.fetch_all(pool).await?;

        Ok(rows.iter().map(map_element_row).collect())
    }

    pub async fn find_one(pool: &Pool<Sqlite>, filter: &ElementFilter) -> Result<Option<ConfigElement>> {
        let (clause, binds) = filter_clause(filter);
        let sql = format!("{} {} ORDER BY rowid LIMIT 1", SELECT_ELEMENT, clause);
        let mut query = sqlx::query(&sql);
        for value in binds {
            query = query.bind(value);
        }
        let row = query.fetch_optional(pool).await?;

        Ok(row.as_ref().map(map_element_row))
    }

    pub async fn save(pool: &Pool<Sqlite>, element: &ConfigElement) -> Result<ConfigElement> {
        sqlx::query(
            r#"
            INSERT INTO config_elements (id, group_id, key, value, published, remark, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                group_id = excluded.group_id,
                key = excluded.key,
                value = excluded.value,
                published = excluded.published,
                remark = excluded.remark
            "#,
        )
        .bind(&element.id)
        .bind(&element.group_id)
        .bind(&element.key)
        .bind(&element.value)
        .bind(element.published as i32)
        .bind(element.remark.as_deref().unwrap_or(""))
        .bind(element.created_at)
        .execute(pool)
        .await?;

        Self::find_one(pool, &ElementFilter::by_id(&element.id))
            .await?
            .context("Element not found after save")
    }

    pub async fn delete(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM config_elements WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Element", id).into());
        }
        Ok(())
    }
}
