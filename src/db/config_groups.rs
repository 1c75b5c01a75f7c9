use anyhow::{Context, Result};
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

use crate::models::ConfigGroup;
use crate::tree::GroupFilter;

use super::row_helpers::none_if_empty;

const SELECT_GROUP: &str = r#"
    SELECT id, name, scope_kind, scope_id, parent_id, published, remark, created_at
    FROM config_groups
"#;

fn map_group_row(row: &SqliteRow) -> Result<ConfigGroup> {
    let scope_kind: String = row.get("scope_kind");
    let published: i32 = row.get("published");
    Ok(ConfigGroup {
        id: row.get("id"),
        name: row.get("name"),
        scope_kind: scope_kind.parse()?,
        scope_id: row.get("scope_id"),
        parent_id: row.get("parent_id"),
        published: published == 1,
        remark: none_if_empty(row.get("remark")),
        created_at: row.get("created_at"),
    })
}

/// WHERE clause and bind values for a filter; every set field is an equality.
fn filter_clause(filter: &GroupFilter) -> (String, Vec<&str>) {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    let columns = [
        ("id", filter.id.as_deref()),
        ("scope_kind", filter.scope_kind.map(|k| k.as_str())),
        ("scope_id", filter.scope_id.as_deref()),
        ("parent_id", filter.parent_id.as_deref()),
        ("name", filter.name.as_deref()),
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

pub struct GroupRepo;

impl GroupRepo {
    pub async fn find(pool: &Pool<Sqlite>, filter: &GroupFilter) -> Result<Vec<ConfigGroup>> {
        let (clause, binds) = filter_clause(filter);
        let sql = format!("{} {} ORDER BY rowid", SELECT_GROUP, clause);
        let mut query = sqlx::query(&sql);
        for value in binds {
            query = query.bind(value);
        }
        let rows = query.fetch_all(pool).await?;

        rows.iter().map(map_group_row).collect()
    }

    pub async fn find_one(pool: &Pool<Sqlite>, filter: &GroupFilter) -> Result<Option<ConfigGroup>> {
        let (clause, binds) = filter_clause(filter);
        let sql = format!("{} {} ORDER BY rowid LIMIT 1", SELECT_GROUP, clause);
        let mut query = sqlx::query(&sql);
        for value in binds {
            query = query.bind(value);
        }
        let row = query.fetch_optional(pool).await?;

        row.as_ref().map(map_group_row).transpose()
    }

    pub async fn save(pool: &Pool<Sqlite>, group: &ConfigGroup) -> Result<ConfigGroup> {
        sqlx::query(
            r#"
            INSERT INTO config_groups (id, name, scope_kind, scope_id, parent_id, published, remark, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                scope_kind = excluded.scope_kind,
                scope_id = excluded.scope_id,
                parent_id = excluded.parent_id,
                published = excluded.published,
                remark = excluded.remark
            "#,
        )
        .bind(&group.id)
        .bind(&group.name)
        .bind(group.scope_kind.as_str())
        .bind(&group.scope_id)
        .bind(&group.parent_id)
        .bind(group.published as i32)
        .bind(group.remark.as_deref().unwrap_or(""))
        .bind(group.created_at)
        .execute(pool)
        .await?;

        Self::find_one(pool, &GroupFilter::by_id(&group.id))
            .await?
            .context("Group not found after save")
    }

    pub async fn delete(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM config_groups WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Group", id).into());
        }
        Ok(())
    }
}
