//! # Entity Store Adapter
//!
//! The storage contract the lifecycle engine and backup codec are written
//! against, and its two adapters.
//!
//! ## One Contract, Two Adapters
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   LifecycleEngine<S: Store>          BackupCodec<S: Store, A>           │
//! │            │                                │                           │
//! │            └──────────┬─────────────────────┘                           │
//! │                       ▼                                                 │
//! │       Table<'_, S, R>  (typed handle bound to one tenant)               │
//! │                       │                                                 │
//! │                       ▼                                                 │
//! │       EntityStore<R> for R in {Phone, Sale, Return, Credit,            │
//! │                                CreditPayment}                           │
//! │              ┌────────┴─────────┐                                       │
//! │              ▼                  ▼                                       │
//! │        MemoryStore          Database                                    │
//! │        (embedded,           (SQLite via sqlx,                           │
//! │         memory.rs)           sqlite.rs)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Contract
//! - Every call is scoped to a tenant; no call returns another tenant's rows
//! - `insert` assigns a fresh UUID and stamps the tenant, whatever the
//!   record carried
//! - Single-record calls are atomic; nothing spans records
//! - Columns listed in `Record::UNIQUE` are unique per tenant
//! - Rows that tie on the sort column come back in insertion order
//! - A query naming a column the record does not have fails with
//!   `QueryFailed` rather than matching nothing

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use std::marker::PhantomData;

use crate::error::{DbError, DbResult};
use resell_core::{Credit, CreditPayment, FieldValue, Phone, Query, Record, Return, Sale};

pub use memory::MemoryStore;

// =============================================================================
// Entity Store
// =============================================================================

/// CRUD and filtered queries over one record type.
#[async_trait]
pub trait EntityStore<R: Record>: Send + Sync {
    /// Inserts a record and returns its new id.
    async fn insert(&self, tenant_id: &str, record: R) -> DbResult<String>;

    async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<R>>;

    async fn query(&self, tenant_id: &str, query: &Query) -> DbResult<Vec<R>>;

    /// Replaces the stored record with the same id. `NotFound` if absent.
    async fn update(&self, tenant_id: &str, record: &R) -> DbResult<()>;

    /// `NotFound` if absent.
    async fn delete(&self, tenant_id: &str, id: &str) -> DbResult<()>;

    /// Deletes every record whose `column` equals `value`; returns the count.
    async fn delete_where(
        &self,
        tenant_id: &str,
        column: &'static str,
        value: FieldValue,
    ) -> DbResult<u64>;

    /// Deletes every record of the tenant; returns the count.
    async fn delete_all(&self, tenant_id: &str) -> DbResult<u64>;
}

/// A store holding every record type of the ledger.
pub trait Store:
    EntityStore<Phone>
    + EntityStore<Sale>
    + EntityStore<Return>
    + EntityStore<Credit>
    + EntityStore<CreditPayment>
    + Send
    + Sync
    + 'static
{
}

impl<T> Store for T where
    T: EntityStore<Phone>
        + EntityStore<Sale>
        + EntityStore<Return>
        + EntityStore<Credit>
        + EntityStore<CreditPayment>
        + Send
        + Sync
        + 'static
{
}

// =============================================================================
// Table Handle
// =============================================================================

/// One record type of a store, bound to a tenant.
///
/// Picks the `EntityStore<R>` impl by type so call sites read
/// `engine.phones().require(id)` instead of spelling out the trait.
pub struct Table<'a, S: ?Sized, R> {
    store: &'a S,
    tenant_id: &'a str,
    _record: PhantomData<fn() -> R>,
}

impl<'a, S, R> Table<'a, S, R>
where
    S: EntityStore<R> + ?Sized,
    R: Record,
{
    pub fn new(store: &'a S, tenant_id: &'a str) -> Self {
        Table {
            store,
            tenant_id,
            _record: PhantomData,
        }
    }

    /// Inserts `record` and returns it with the assigned id and tenant.
    pub async fn insert(&self, mut record: R) -> DbResult<R> {
        record.set_tenant_id(self.tenant_id);
        let id = self.store.insert(self.tenant_id, record.clone()).await?;
        record.set_id(id);
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<R>> {
        self.store.get_by_id(self.tenant_id, id).await
    }

    /// Like [`Table::get`], but a missing row is `NotFound`.
    pub async fn require(&self, id: &str) -> DbResult<R> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found(R::ENTITY, id))
    }

    pub async fn find(&self, query: &Query) -> DbResult<Vec<R>> {
        self.store.query(self.tenant_id, query).await
    }

    /// Every record, oldest first.
    pub async fn all(&self) -> DbResult<Vec<R>> {
        self.find(&Query::all()).await
    }

    pub async fn update(&self, record: &R) -> DbResult<()> {
        self.store.update(self.tenant_id, record).await
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        self.store.delete(self.tenant_id, id).await
    }

    pub async fn delete_where(
        &self,
        column: &'static str,
        value: impl Into<FieldValue>,
    ) -> DbResult<u64> {
        self.store
            .delete_where(self.tenant_id, column, value.into())
            .await
    }

    pub async fn delete_all(&self) -> DbResult<u64> {
        self.store.delete_all(self.tenant_id).await
    }
}

/// Rejects queries that name unknown columns.
pub(crate) fn check_columns<R: Record>(columns: &[&'static str]) -> DbResult<()> {
    match columns.iter().find(|c| !R::has_column(c)) {
        Some(column) => Err(DbError::QueryFailed(format!(
            "unknown column `{}` for {}",
            column,
            R::TABLE
        ))),
        None => Ok(()),
    }
}

// =============================================================================
// Contract Tests
// =============================================================================

/// Tests every adapter must pass. Each adapter's test module calls these
/// with a fresh store.
#[cfg(test)]
pub(crate) mod contract {
    use super::*;
    use chrono::Utc;
    use resell_core::{Filter, PhoneStatus};

    pub const TENANT: &str = "tenant-a";
    pub const OTHER_TENANT: &str = "tenant-b";

    pub fn phone(imei: &str, model: &str, price: i64) -> Phone {
        resell_core::lifecycle::new_phone(
            "ignored",
            resell_core::NewPhone {
                imei1: imei.to_string(),
                model: model.to_string(),
                purchase_price_cents: price,
                ..Default::default()
            },
            "2026-01-01".to_string(),
            Utc::now(),
        )
    }

    pub async fn insert_assigns_id_and_tenant<S: Store>(store: &S) {
        let phones = Table::<S, Phone>::new(store, TENANT);
        let stored = phones.insert(phone("111", "Pixel 7", 100)).await.unwrap();

        assert!(!stored.id.is_empty());
        assert_eq!(stored.tenant_id, TENANT);

        let fetched = phones.require(&stored.id).await.unwrap();
        assert_eq!(fetched, stored);
    }

    pub async fn tenants_are_isolated<S: Store>(store: &S) {
        let mine = Table::<S, Phone>::new(store, TENANT);
        let theirs = Table::<S, Phone>::new(store, OTHER_TENANT);

        let stored = mine.insert(phone("111", "Pixel 7", 100)).await.unwrap();
        // Same IMEI is fine under another tenant.
        theirs.insert(phone("111", "Pixel 7", 100)).await.unwrap();

        assert!(theirs.get(&stored.id).await.unwrap().is_none());
        assert_eq!(mine.all().await.unwrap().len(), 1);
        assert!(matches!(
            theirs.delete(&stored.id).await,
            Err(DbError::NotFound { .. })
        ));

        assert_eq!(theirs.delete_all().await.unwrap(), 1);
        assert_eq!(mine.all().await.unwrap().len(), 1);
    }

    pub async fn unique_columns_enforced<S: Store>(store: &S) {
        let phones = Table::<S, Phone>::new(store, TENANT);
        phones.insert(phone("111", "A", 1)).await.unwrap();
        let second = phones.insert(phone("222", "B", 1)).await.unwrap();

        assert!(matches!(
            phones.insert(phone("111", "C", 1)).await,
            Err(DbError::UniqueViolation { .. })
        ));

        let mut clash = second.clone();
        clash.imei1 = "111".to_string();
        assert!(matches!(
            phones.update(&clash).await,
            Err(DbError::UniqueViolation { .. })
        ));

        // Rewriting a row with its own value is not a clash.
        phones.update(&second).await.unwrap();
    }

    pub async fn update_and_delete<S: Store>(store: &S) {
        let phones = Table::<S, Phone>::new(store, TENANT);
        let mut stored = phones.insert(phone("111", "A", 1)).await.unwrap();

        stored.status = PhoneStatus::Sold;
        stored.sale_price_cents = Some(250);
        phones.update(&stored).await.unwrap();
        assert_eq!(phones.require(&stored.id).await.unwrap(), stored);

        let mut ghost = stored.clone();
        ghost.id = "missing".to_string();
        assert!(matches!(
            phones.update(&ghost).await,
            Err(DbError::NotFound { .. })
        ));

        phones.delete(&stored.id).await.unwrap();
        assert!(phones.get(&stored.id).await.unwrap().is_none());
        assert!(matches!(
            phones.delete(&stored.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    pub async fn filters_and_ordering<S: Store>(store: &S) {
        let phones = Table::<S, Phone>::new(store, TENANT);
        phones.insert(phone("111", "Google Pixel 7", 300)).await.unwrap();
        phones.insert(phone("222", "iPhone 12", 100)).await.unwrap();
        phones.insert(phone("333", "iPhone 13", 300)).await.unwrap();
        let mut sold = phones.insert(phone("444", "Galaxy S21", 200)).await.unwrap();
        sold.status = PhoneStatus::Sold;
        phones.update(&sold).await.unwrap();

        let in_stock = phones
            .find(&Query::where_eq("status", PhoneStatus::InStock))
            .await
            .unwrap();
        assert_eq!(in_stock.len(), 3);

        let iphones = phones
            .find(&Query::filter(Filter::contains("model", "IPHONE")))
            .await
            .unwrap();
        assert_eq!(iphones.len(), 2);

        let search = Filter::Or(vec![
            Filter::contains("imei1", "44"),
            Filter::contains("model", "pixel"),
        ]);
        assert_eq!(phones.find(&Query::filter(search)).await.unwrap().len(), 2);

        let ranged = phones
            .find(&Query::filter(Filter::between("purchase_price_cents", 150, 300)))
            .await
            .unwrap();
        assert_eq!(ranged.len(), 3);

        // Ties on price keep insertion order, in both directions.
        let by_price: Vec<String> = phones
            .find(&Query::all().order_by_desc("purchase_price_cents"))
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.imei1)
            .collect();
        assert_eq!(by_price, vec!["111", "333", "444", "222"]);

        let unset = phones
            .find(&Query::where_eq("imei2", FieldValue::Null))
            .await
            .unwrap();
        assert_eq!(unset.len(), 4);

        assert!(matches!(
            phones.find(&Query::where_eq("price", 1)).await,
            Err(DbError::QueryFailed(_))
        ));
    }

    pub async fn delete_where_counts<S: Store>(store: &S) {
        let phones = Table::<S, Phone>::new(store, TENANT);
        phones.insert(phone("111", "A", 1)).await.unwrap();
        phones.insert(phone("222", "A", 1)).await.unwrap();
        phones.insert(phone("333", "B", 1)).await.unwrap();

        assert_eq!(phones.delete_where("model", "A").await.unwrap(), 2);
        assert_eq!(phones.delete_where("model", "A").await.unwrap(), 0);
        assert_eq!(phones.all().await.unwrap().len(), 1);
    }
}
