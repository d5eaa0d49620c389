use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::time::Duration;

use super::{with_timeout, StoneGateway};
use crate::error::{Error, Result};
use crate::models::change_log::ChangeLogEntry;
use crate::models::material::Material;
use crate::models::stone::{StoneData, StoneRecord, STONE_COLUMNS, STONE_ID_COLUMN};

#[derive(Clone)]
pub struct PgStoneGateway {
    pool: PgPool,
    timeout: Duration,
}

impl PgStoneGateway {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

fn quoted(column: &str) -> String {
    format!("\"{}\"", column)
}

fn select_list() -> String {
    std::iter::once(STONE_ID_COLUMN)
        .chain(STONE_COLUMNS.iter().map(|(_, c)| *c))
        .map(quoted)
        .collect::<Vec<_>>()
        .join(", ")
}

fn column_list() -> String {
    STONE_COLUMNS
        .iter()
        .map(|(_, c)| quoted(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn record_from_row(row: &PgRow) -> Result<StoneRecord> {
    let id: i64 = row
        .try_get(STONE_ID_COLUMN)
        .map_err(|e| Error::Fetch(e.to_string()))?;
    let mut columns = Vec::with_capacity(STONE_COLUMNS.len());
    for (_, column) in STONE_COLUMNS.iter() {
        let value: Option<String> = row
            .try_get(*column)
            .map_err(|e| Error::Fetch(format!("column {}: {}", column, e)))?;
        columns.push((*column, value.unwrap_or_default()));
    }
    Ok(StoneRecord {
        id,
        data: StoneData::from_columns(columns)?,
    })
}

#[async_trait]
impl StoneGateway for PgStoneGateway {
    async fn list_stones(&self) -> Result<Vec<StoneRecord>> {
        let sql = format!(
            "SELECT {} FROM stones ORDER BY {}",
            select_list(),
            quoted(STONE_ID_COLUMN)
        );
        with_timeout(self.timeout, Error::Fetch, async {
            let rows = sqlx::query(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| Error::Fetch(e.to_string()))?;
            rows.iter().map(record_from_row).collect()
        })
        .await
    }

    async fn get_stone(&self, id: i64) -> Result<Option<StoneRecord>> {
        let sql = format!(
            "SELECT {} FROM stones WHERE {} = $1",
            select_list(),
            quoted(STONE_ID_COLUMN)
        );
        with_timeout(self.timeout, Error::Fetch, async {
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Fetch(e.to_string()))?;
            row.as_ref().map(record_from_row).transpose()
        })
        .await
    }

    async fn create_stone(&self, data: &StoneData) -> Result<i64> {
        let placeholders = (1..=STONE_COLUMNS.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO stones ({}) VALUES ({}) RETURNING {}",
            column_list(),
            placeholders,
            quoted(STONE_ID_COLUMN)
        );
        with_timeout(self.timeout, Error::Write, async {
            let mut statement = sqlx::query_scalar::<_, i64>(&sql);
            for (field, _) in STONE_COLUMNS.iter() {
                statement = statement.bind(data.get(*field));
            }
            statement
                .fetch_one(&self.pool)
                .await
                .map_err(|e| Error::Write(e.to_string()))
        })
        .await
    }

    async fn update_stone(&self, id: i64, data: &StoneData) -> Result<()> {
        let assignments = STONE_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, (_, column))| format!("{} = ${}", quoted(column), i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE stones SET {} WHERE {} = ${}",
            assignments,
            quoted(STONE_ID_COLUMN),
            STONE_COLUMNS.len() + 1
        );
        let res = with_timeout(self.timeout, Error::Write, async {
            let mut statement = sqlx::query(&sql);
            for (field, _) in STONE_COLUMNS.iter() {
                statement = statement.bind(data.get(*field));
            }
            statement
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::Write(e.to_string()))
        })
        .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Stone {} not found", id)));
        }
        Ok(())
    }

    async fn delete_stone(&self, id: i64) -> Result<()> {
        let sql = format!("DELETE FROM stones WHERE {} = $1", quoted(STONE_ID_COLUMN));
        let res = with_timeout(self.timeout, Error::Write, async {
            sqlx::query(&sql)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::Write(e.to_string()))
        })
        .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Stone {} not found", id)));
        }
        Ok(())
    }

    async fn list_materials(&self) -> Result<Vec<Material>> {
        with_timeout(self.timeout, Error::Fetch, async {
            sqlx::query_as::<_, Material>("SELECT id, name, image FROM materials ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| Error::Fetch(e.to_string()))
        })
        .await
    }

    async fn append_change_log(&self, entry: &ChangeLogEntry) -> Result<()> {
        with_timeout(self.timeout, Error::Write, async {
            sqlx::query(
                r#"
                INSERT INTO stone_change_log (stone_id, editor, changes, created_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(entry.stone_id)
            .bind(&entry.editor)
            .bind(&entry.changes)
            .bind(entry.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Write(e.to_string()))?;
            Ok(())
        })
        .await
    }
}
