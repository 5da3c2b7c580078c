//! # SQLite Store
//!
//! `EntityStore<R>` for [`Database`], built on `sqlx::QueryBuilder`.
//!
//! ## Filter Compilation
//! ```text
//! Filter                              SQL (every value bound, never inlined)
//! ─────────────────────────────────   ─────────────────────────────────────
//! Eq { status, "sold" }               status = ?
//! Eq { imei2, Null }                  imei2 IS NULL
//! Contains { model, "Pixel" }         LOWER(model) LIKE ? ESCAPE '\'  ("%pixel%")
//! Between { price, 1, 9 }             price BETWEEN ? AND ?
//! And([a, b]) / Or([a, b])            (a AND b) / (a OR b)
//! ```
//!
//! Column names are spliced into SQL, so every column is checked against
//! `Record::COLUMNS` first. `rowid` is the tiebreaker of every ORDER BY.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite};
use tracing::debug;
use uuid::Uuid;

use super::{check_columns, EntityStore};
use crate::error::{DbError, DbResult};
use crate::pool::Database;
use resell_core::{FieldValue, Filter, Query, Record};

fn select_columns<R: Record>() -> String {
    R::COLUMNS.join(", ")
}

fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: FieldValue) {
    match value {
        FieldValue::Null => builder.push_bind(None::<String>),
        FieldValue::Text(text) => builder.push_bind(text),
        FieldValue::Integer(n) => builder.push_bind(n),
        FieldValue::Bool(b) => builder.push_bind(b),
        FieldValue::Timestamp(ts) => builder.push_bind(ts),
    };
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &Filter) {
    match filter {
        Filter::All => {
            builder.push("1 = 1");
        }
        Filter::Eq { column, value } if value.is_null() => {
            builder.push(*column).push(" IS NULL");
        }
        Filter::Eq { column, value } => {
            builder.push(*column).push(" = ");
            push_value(builder, value.clone());
        }
        Filter::Contains { column, needle } => {
            builder.push("LOWER(").push(*column).push(") LIKE ");
            builder.push_bind(format!("%{}%", escape_like(&needle.to_lowercase())));
            builder.push(" ESCAPE '\\'");
        }
        Filter::Between { column, from, to } => {
            builder.push(*column).push(" BETWEEN ");
            push_value(builder, from.clone());
            builder.push(" AND ");
            push_value(builder, to.clone());
        }
        Filter::And(parts) | Filter::Or(parts) => {
            if parts.is_empty() {
                // Empty conjunction is true, empty disjunction is false.
                builder.push(if matches!(filter, Filter::And(_)) {
                    "1 = 1"
                } else {
                    "1 = 0"
                });
                return;
            }
            let joiner = if matches!(filter, Filter::And(_)) {
                " AND "
            } else {
                " OR "
            };
            builder.push("(");
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    builder.push(joiner);
                }
                push_filter(builder, part);
            }
            builder.push(")");
        }
    }
}

#[async_trait]
impl<R> EntityStore<R> for Database
where
    R: Record + for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    async fn insert(&self, tenant_id: &str, mut record: R) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        record.set_id(id.clone());
        record.set_tenant_id(tenant_id);

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            R::TABLE,
            select_columns::<R>()
        ));
        for (i, value) in record.values().into_iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            push_value(&mut builder, value);
        }
        builder.push(")");

        builder.build().execute(self.pool()).await?;

        debug!(table = R::TABLE, id = %id, "Inserted row");
        Ok(id)
    }

    async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<R>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM {} WHERE tenant_id = ",
            select_columns::<R>(),
            R::TABLE
        ));
        builder.push_bind(tenant_id.to_string());
        builder.push(" AND id = ");
        builder.push_bind(id.to_string());

        let row = builder
            .build_query_as::<R>()
            .fetch_optional(self.pool())
            .await?;
        Ok(row)
    }

    async fn query(&self, tenant_id: &str, query: &Query) -> DbResult<Vec<R>> {
        check_columns::<R>(&query.columns())?;

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM {} WHERE tenant_id = ",
            select_columns::<R>(),
            R::TABLE
        ));
        builder.push_bind(tenant_id.to_string());
        builder.push(" AND ");
        push_filter(&mut builder, &query.filter);

        builder.push(" ORDER BY ");
        if let Some(order) = &query.order_by {
            builder.push(order.column);
            builder.push(if order.descending { " DESC, " } else { " ASC, " });
        }
        builder.push("rowid");

        let rows = builder.build_query_as::<R>().fetch_all(self.pool()).await?;
        Ok(rows)
    }

    async fn update(&self, tenant_id: &str, record: &R) -> DbResult<()> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", R::TABLE));

        // id and tenant_id lead COLUMNS and are never rewritten.
        let assignments = R::COLUMNS.iter().zip(record.values()).skip(2);
        for (i, (column, value)) in assignments.enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(*column).push(" = ");
            push_value(&mut builder, value);
        }
        builder.push(" WHERE tenant_id = ");
        builder.push_bind(tenant_id.to_string());
        builder.push(" AND id = ");
        builder.push_bind(record.id().to_string());

        let result = builder.build().execute(self.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(R::ENTITY, record.id()));
        }
        Ok(())
    }

    async fn delete(&self, tenant_id: &str, id: &str) -> DbResult<()> {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("DELETE FROM {} WHERE tenant_id = ", R::TABLE));
        builder.push_bind(tenant_id.to_string());
        builder.push(" AND id = ");
        builder.push_bind(id.to_string());

        let result = builder.build().execute(self.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(R::ENTITY, id));
        }
        Ok(())
    }

    async fn delete_where(
        &self,
        tenant_id: &str,
        column: &'static str,
        value: FieldValue,
    ) -> DbResult<u64> {
        check_columns::<R>(&[column])?;

        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("DELETE FROM {} WHERE tenant_id = ", R::TABLE));
        builder.push_bind(tenant_id.to_string());
        builder.push(" AND ");
        push_filter(&mut builder, &Filter::Eq { column, value });

        let result = builder.build().execute(self.pool()).await?;
        Ok(result.rows_affected())
    }

    async fn delete_all(&self, tenant_id: &str) -> DbResult<u64> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE tenant_id = ?", R::TABLE))
            .bind(tenant_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
