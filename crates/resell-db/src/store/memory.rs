//! # Embedded Store
//!
//! In-process adapter: every table is a `Vec` behind one `RwLock`.
//!
//! ```text
//! RwLock<HashMap<table name, Box<dyn Any>>>
//!                 "phones" ──► Vec<Phone>          (insertion order)
//!                 "sales"  ──► Vec<Sale>
//!                 ...
//! ```
//!
//! Filters are evaluated with [`resell_core::Filter::matches`], the same
//! semantics the SQLite adapter compiles to SQL. Used by tests, demos and
//! the `memory` backend.

use async_trait::async_trait;
use std::any::Any;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{check_columns, EntityStore};
use crate::error::{DbError, DbResult};
use resell_core::{FieldValue, Query, Record};

type Tables = HashMap<&'static str, Box<dyn Any + Send + Sync>>;

/// Embedded entity store.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

fn rows<R: Record>(tables: &Tables) -> DbResult<&[R]> {
    match tables.get(R::TABLE) {
        Some(rows) => rows
            .downcast_ref::<Vec<R>>()
            .map(Vec::as_slice)
            .ok_or_else(|| table_type_mismatch::<R>()),
        None => Ok(&[]),
    }
}

fn rows_mut<R: Record>(tables: &mut Tables) -> DbResult<&mut Vec<R>> {
    tables
        .entry(R::TABLE)
        .or_insert_with(|| Box::new(Vec::<R>::new()))
        .downcast_mut::<Vec<R>>()
        .ok_or_else(table_type_mismatch::<R>)
}

fn table_type_mismatch<R: Record>() -> DbError {
    DbError::Internal(format!("table {} holds another record type", R::TABLE))
}

/// Checks `record` against every other row of the tenant for `R::UNIQUE`.
fn check_unique<R: Record>(rows: &[R], tenant_id: &str, record: &R) -> DbResult<()> {
    for column in R::UNIQUE {
        let value = match record.value(column) {
            Some(value) if !value.is_null() => value,
            _ => continue,
        };
        let clash = rows.iter().any(|row| {
            row.tenant_id() == tenant_id
                && row.id() != record.id()
                && row.value(column).as_ref() == Some(&value)
        });
        if clash {
            let shown = match &value {
                FieldValue::Text(text) => text.clone(),
                other => format!("{:?}", other),
            };
            return Err(DbError::duplicate(*column, shown));
        }
    }
    Ok(())
}

#[async_trait]
impl<R: Record> EntityStore<R> for MemoryStore {
    async fn insert(&self, tenant_id: &str, mut record: R) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        record.set_id(id.clone());
        record.set_tenant_id(tenant_id);

        let mut tables = self.tables.write().await;
        let rows = rows_mut::<R>(&mut tables)?;
        check_unique(rows, tenant_id, &record)?;
        rows.push(record);

        debug!(table = R::TABLE, id = %id, "Inserted row");
        Ok(id)
    }

    async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<R>> {
        let tables = self.tables.read().await;
        Ok(rows::<R>(&tables)?
            .iter()
            .find(|row| row.tenant_id() == tenant_id && row.id() == id)
            .cloned())
    }

    async fn query(&self, tenant_id: &str, query: &Query) -> DbResult<Vec<R>> {
        check_columns::<R>(&query.columns())?;

        let tables = self.tables.read().await;
        let mut found: Vec<R> = rows::<R>(&tables)?
            .iter()
            .filter(|row| row.tenant_id() == tenant_id && query.filter.matches(*row))
            .cloned()
            .collect();

        // sort_by is stable, so ties keep insertion order.
        if let Some(order) = &query.order_by {
            found.sort_by(|a, b| {
                let ordering = match (a.value(order.column), b.value(order.column)) {
                    (Some(x), Some(y)) => x.sort_cmp(&y),
                    _ => Ordering::Equal,
                };
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        Ok(found)
    }

    async fn update(&self, tenant_id: &str, record: &R) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        let rows = rows_mut::<R>(&mut tables)?;
        let index = rows
            .iter()
            .position(|row| row.tenant_id() == tenant_id && row.id() == record.id())
            .ok_or_else(|| DbError::not_found(R::ENTITY, record.id()))?;
        check_unique(rows, tenant_id, record)?;

        let mut replacement = record.clone();
        replacement.set_tenant_id(tenant_id);
        rows[index] = replacement;
        Ok(())
    }

    async fn delete(&self, tenant_id: &str, id: &str) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        let rows = rows_mut::<R>(&mut tables)?;
        let index = rows
            .iter()
            .position(|row| row.tenant_id() == tenant_id && row.id() == id)
            .ok_or_else(|| DbError::not_found(R::ENTITY, id))?;
        rows.remove(index);
        Ok(())
    }

    async fn delete_where(
        &self,
        tenant_id: &str,
        column: &'static str,
        value: FieldValue,
    ) -> DbResult<u64> {
        check_columns::<R>(&[column])?;
        let filter = resell_core::Filter::Eq { column, value };

        let mut tables = self.tables.write().await;
        let rows = rows_mut::<R>(&mut tables)?;
        let before = rows.len();
        rows.retain(|row| !(row.tenant_id() == tenant_id && filter.matches(row)));
        Ok((before - rows.len()) as u64)
    }

    async fn delete_all(&self, tenant_id: &str) -> DbResult<u64> {
        let mut tables = self.tables.write().await;
        let rows = rows_mut::<R>(&mut tables)?;
        let before = rows.len();
        rows.retain(|row| row.tenant_id() != tenant_id);
        Ok((before - rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;

    #[tokio::test]
    async fn test_insert_assigns_id_and_tenant() {
        contract::insert_assigns_id_and_tenant(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        contract::tenants_are_isolated(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_unique_columns_enforced() {
        contract::unique_columns_enforced(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        contract::update_and_delete(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_filters_and_ordering() {
        contract::filters_and_ordering(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_delete_where_counts() {
        contract::delete_where_counts(&MemoryStore::new()).await;
    }
}
