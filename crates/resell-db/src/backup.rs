//! # Backup Codec
//!
//! Exports a tenant's ledger to a [`BackupDocument`] and restores one with
//! fresh identifiers.
//!
//! ## Restore Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Restore Protocol                                │
//! │                                                                         │
//! │  0. parse + validate          ── fails: Unreadable / Invalid,           │
//! │     │                            live data untouched                    │
//! │     ▼                                                                   │
//! │  0b. safety backup of live data (skipped if empty, failure only warns)  │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  1. clear live tables         ── fails: Aborted { safety_backup }       │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  2. phones   (sale fields stripped)     old id ──► new id               │
//! │  3. sales    (phone id translated)      old id ──► new id, mirrored     │
//! │  4. returns  (phone + sale translated)  old id ──► new id, phone reset  │
//! │     └── sales' originalReturnId translated through the return map       │
//! │  5. credits  (phone + sale translated)  credit mirrors refreshed        │
//! │  6. credit payments discarded, counted                                  │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  RestoreSummary { imported / skipped per table, safety backup }         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Steps 2-5 skip a record whose insert fails or whose parent was skipped,
//! log it and carry on. A restore ends with as much data as could be
//! recovered, never with an empty store because one row was bad.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::archive::BackupArchive;
use crate::engine::LifecycleEngine;
use crate::error::{BackupError, BackupResult, DbResult};
use crate::store::Store;
use resell_core::backup::{validate_document, BackupDocument};
use resell_core::lifecycle;
use resell_core::{CoreError, CoreResult, Phone, Record, Sale, Snapshot};

/// File name prefix of the backups written before a restore.
pub const SAFETY_BACKUP_PREFIX: &str = "safety-backup";

// =============================================================================
// Restore Summary
// =============================================================================

/// Imported and skipped counts of one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCount {
    pub imported: usize,
    pub skipped: usize,
}

/// A record the restore could not bring back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    pub entity: &'static str,
    /// Identifier the record carried in the backup.
    pub backup_id: String,
    pub reason: String,
}

/// What a restore did.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSummary {
    pub phones: TableCount,
    pub sales: TableCount,
    pub returns: TableCount,
    pub credits: TableCount,
    /// Credit payments are never replayed.
    pub credit_payments_discarded: usize,
    /// Archive name of the copy of the data this restore replaced.
    pub safety_backup: Option<String>,
    pub skipped: Vec<SkippedRecord>,
    /// Non-fatal findings: version mismatch, failed reconciliation writes.
    pub warnings: Vec<String>,
}

impl RestoreSummary {
    pub fn imported_count(&self) -> usize {
        self.phones.imported + self.sales.imported + self.returns.imported + self.credits.imported
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Strict view of the restore: any skipped record is an error.
    pub fn into_result(self) -> CoreResult<Self> {
        if self.skipped.is_empty() {
            Ok(self)
        } else {
            Err(CoreError::PartialImportFailure {
                skipped: self.skipped.len(),
            })
        }
    }

    fn skip(&mut self, entity: &'static str, backup_id: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(entity, backup_id = %backup_id, reason = %reason, "Skipping record during restore");

        let count = match entity {
            "Phone" => &mut self.phones,
            "Sale" => &mut self.sales,
            "Return" => &mut self.returns,
            _ => &mut self.credits,
        };
        count.skipped += 1;
        self.skipped.push(SkippedRecord {
            entity,
            backup_id: backup_id.to_string(),
            reason,
        });
    }
}

// =============================================================================
// Codec
// =============================================================================

/// Backup export and restore for one tenant.
pub struct BackupCodec<S: Store, A: BackupArchive> {
    engine: LifecycleEngine<S>,
    archive: A,
    safety_backups: bool,
}

impl<S: Store, A: BackupArchive> BackupCodec<S, A> {
    pub fn new(engine: LifecycleEngine<S>, archive: A) -> Self {
        BackupCodec {
            engine,
            archive,
            safety_backups: true,
        }
    }

    /// Turns the pre-restore safety backup on or off.
    pub fn safety_backups(mut self, enabled: bool) -> Self {
        self.safety_backups = enabled;
        self
    }

    pub fn engine(&self) -> &LifecycleEngine<S> {
        &self.engine
    }

    pub fn archive(&self) -> &A {
        &self.archive
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// The tenant's full ledger, original identifiers included.
    pub async fn export(&self) -> BackupResult<BackupDocument> {
        let snapshot = self.live_snapshot().await.map_err(BackupError::Export)?;
        let document = BackupDocument::from_snapshot(snapshot, Utc::now());
        info!(records = document.record_count(), "Ledger exported");
        Ok(document)
    }

    /// [`BackupCodec::export`] as pretty-printed JSON.
    pub async fn export_json(&self) -> BackupResult<String> {
        let document = self.export().await?;
        serde_json::to_string_pretty(&document).map_err(|e| BackupError::Export(e.into()))
    }

    /// Exports into the archive under `name`.
    pub async fn export_to_archive(&self, name: &str) -> BackupResult<String> {
        let document = self.export().await?;
        self.archive
            .store(name, &document)
            .await
            .map_err(BackupError::Export)
    }

    async fn live_snapshot(&self) -> DbResult<Snapshot> {
        Ok(Snapshot {
            phones: self.engine.phones().all().await?,
            sales: self.engine.sales().all().await?,
            returns: self.engine.returns().all().await?,
            credits: self.engine.credits().all().await?,
            credit_payments: self.engine.credit_payments().all().await?,
        })
    }

    // =========================================================================
    // Import
    // =========================================================================

    /// Validates `json` and restores it over the tenant's live data.
    ///
    /// ## Errors
    /// - `Unreadable` if `json` does not parse; nothing was modified
    /// - `Invalid` with every validation problem; nothing was modified
    /// - `Aborted` if clearing live data failed, naming the safety backup
    pub async fn import_json(&self, json: &str) -> BackupResult<RestoreSummary> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| BackupError::Unreadable {
                reason: e.to_string(),
            })?;

        let validated = validate_document(&value).map_err(|err| match err {
            CoreError::ValidationFailed(problems) => BackupError::Invalid(problems),
            other => BackupError::Invalid(vec![other.to_string()]),
        })?;

        for warning in &validated.warnings {
            warn!(warning = %warning, "Backup validation warning");
        }

        let mut summary = self.restore(validated.document).await?;
        let mut warnings = validated.warnings;
        warnings.append(&mut summary.warnings);
        summary.warnings = warnings;
        Ok(summary)
    }

    /// Restores an already validated document.
    async fn restore(&self, mut document: BackupDocument) -> BackupResult<RestoreSummary> {
        info!(
            version = %document.version,
            exported = %document.export_date,
            records = document.record_count(),
            "Starting restore"
        );

        let mut summary = RestoreSummary {
            safety_backup: self.write_safety_backup().await,
            ..Default::default()
        };

        self.clear().await.map_err(|source| BackupError::Aborted {
            source,
            safety_backup: summary.safety_backup.clone(),
        })?;

        // Replay in creation order, whatever order the document lists them
        // in: the last sale replayed for a phone is its active sale. Stable
        // sorts keep document order on ties, as the store does.
        document.sales.sort_by_key(|s| s.created_at);
        document.returns.sort_by_key(|r| r.created_at);

        let mut replay = Replay::default();
        self.replay_phones(document.phones, &mut replay, &mut summary).await;
        self.replay_sales(document.sales, &mut replay, &mut summary).await;
        self.replay_returns(document.returns, &mut replay, &mut summary).await;
        self.link_resales(&mut replay, &mut summary).await;
        self.replay_credits(document.credits, &mut replay, &mut summary).await;
        self.save_phones(&mut replay, &mut summary).await;

        summary.credit_payments_discarded = document.credit_payments.len();
        if summary.credit_payments_discarded > 0 {
            warn!(
                discarded = summary.credit_payments_discarded,
                "Credit payments are not restored"
            );
        }

        info!(
            imported = summary.imported_count(),
            skipped = summary.skipped_count(),
            safety_backup = ?summary.safety_backup,
            "Restore finished"
        );
        Ok(summary)
    }

    /// Archives the live ledger before it is cleared.
    ///
    /// Returns the archive name, or `None` if there was nothing to protect
    /// or the backup could not be written.
    async fn write_safety_backup(&self) -> Option<String> {
        if !self.safety_backups {
            return None;
        }

        let snapshot = match self.live_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "Could not read live data for the safety backup");
                return None;
            }
        };
        if snapshot.is_empty() {
            debug!("Live data is empty; no safety backup needed");
            return None;
        }

        let now = Utc::now();
        let name = self.unused_name(safety_backup_name(now)).await;
        let document = BackupDocument::from_snapshot(snapshot, now);
        match self.archive.store(&name, &document).await {
            Ok(stored) => {
                info!(name = %stored, records = document.record_count(), "Safety backup written");
                Some(stored)
            }
            Err(err) => {
                warn!(error = %err, "Safety backup failed; continuing with restore");
                None
            }
        }
    }

    /// `name`, or `name` with a `-N` suffix if the archive already holds it.
    async fn unused_name(&self, name: String) -> String {
        let taken = match self.archive.list().await {
            Ok(names) => names,
            Err(err) => {
                debug!(error = %err, "Could not list archive; using name as is");
                return name;
            }
        };
        if !taken.contains(&name) {
            return name;
        }
        let stem = name.trim_end_matches(".json");
        (1..)
            .map(|n| format!("{}-{}.json", stem, n))
            .find(|candidate| !taken.contains(candidate))
            .unwrap_or(name)
    }

    /// Deletes every row of the tenant, children first.
    async fn clear(&self) -> DbResult<()> {
        let payments = self.engine.credit_payments().delete_all().await?;
        let credits = self.engine.credits().delete_all().await?;
        let returns = self.engine.returns().delete_all().await?;
        let sales = self.engine.sales().delete_all().await?;
        let phones = self.engine.phones().delete_all().await?;
        debug!(phones, sales, returns, credits, payments, "Live data cleared");
        Ok(())
    }

    // =========================================================================
    // Replay Steps
    // =========================================================================

    async fn replay_phones(
        &self,
        phones: Vec<Phone>,
        replay: &mut Replay,
        summary: &mut RestoreSummary,
    ) {
        for mut phone in phones {
            let backup_id = std::mem::take(&mut phone.id);
            // Sales replayed next re-establish the sold state.
            let updated_at = phone.updated_at;
            lifecycle::reset_after_return(&mut phone, None, updated_at);

            match self.engine.phones().insert(phone).await {
                Ok(stored) => {
                    replay.phone_ids.insert(backup_id, stored.id.clone());
                    replay.phones.insert(stored.id.clone(), stored);
                    summary.phones.imported += 1;
                }
                Err(err) => summary.skip(Phone::ENTITY, &backup_id, err.to_string()),
            }
        }
    }

    async fn replay_sales(&self, sales: Vec<Sale>, replay: &mut Replay, summary: &mut RestoreSummary) {
        for mut sale in sales {
            let backup_id = std::mem::take(&mut sale.id);
            let Some(phone_id) = replay.phone_ids.get(&sale.phone_id).cloned() else {
                let reason = format!("phone {} was not restored", sale.phone_id);
                summary.skip(Sale::ENTITY, &backup_id, reason);
                continue;
            };
            sale.phone_id = phone_id;

            match self.engine.sales().insert(sale).await {
                Ok(stored) => {
                    replay.sale_ids.insert(backup_id, stored.id.clone());
                    if let Some(phone) = replay.phones.get_mut(&stored.phone_id) {
                        let at = phone.updated_at;
                        lifecycle::mirror_sale(phone, &stored, at);
                        replay.active_sales.insert(phone.id.clone(), stored.id.clone());
                        replay.dirty.insert(phone.id.clone());
                    }
                    replay.sales.push(stored);
                    summary.sales.imported += 1;
                }
                Err(err) => summary.skip(Sale::ENTITY, &backup_id, err.to_string()),
            }
        }
    }

    async fn replay_returns(
        &self,
        returns: Vec<resell_core::Return>,
        replay: &mut Replay,
        summary: &mut RestoreSummary,
    ) {
        for mut record in returns {
            let backup_id = std::mem::take(&mut record.id);
            let phone_id = replay.phone_ids.get(&record.phone_id).cloned();
            let sale_id = replay.sale_ids.get(&record.sale_id).cloned();
            let (Some(phone_id), Some(sale_id)) = (phone_id, sale_id) else {
                let reason = format!(
                    "phone {} or sale {} was not restored",
                    record.phone_id, record.sale_id
                );
                summary.skip(resell_core::Return::ENTITY, &backup_id, reason);
                continue;
            };
            record.phone_id = phone_id;
            record.sale_id = sale_id;

            match self.engine.returns().insert(record).await {
                Ok(stored) => {
                    replay.return_ids.insert(backup_id, stored.id.clone());
                    let reverses_active =
                        replay.active_sales.get(&stored.phone_id) == Some(&stored.sale_id);
                    if reverses_active {
                        replay.active_sales.remove(&stored.phone_id);
                        if let Some(phone) = replay.phones.get_mut(&stored.phone_id) {
                            let at = phone.updated_at;
                            lifecycle::reset_after_return(phone, None, at);
                            replay.dirty.insert(phone.id.clone());
                        }
                    }
                    summary.returns.imported += 1;
                }
                Err(err) => summary.skip(resell_core::Return::ENTITY, &backup_id, err.to_string()),
            }
        }
    }

    /// Points restored resales at the restored return they follow.
    async fn link_resales(&self, replay: &mut Replay, summary: &mut RestoreSummary) {
        for sale in replay.sales.iter_mut() {
            let Some(backup_return_id) = sale.original_return_id.clone() else {
                continue;
            };
            sale.original_return_id = replay.return_ids.get(&backup_return_id).cloned();
            if sale.original_return_id.is_none() {
                debug!(sale_id = %sale.id, backup_return_id = %backup_return_id, "Resale link dropped");
            }
            if let Err(err) = self.engine.sales().update(sale).await {
                summary
                    .warnings
                    .push(format!("sale {}: resale link not updated: {}", sale.id, err));
            }
        }
    }

    async fn replay_credits(
        &self,
        credits: Vec<resell_core::Credit>,
        replay: &mut Replay,
        summary: &mut RestoreSummary,
    ) {
        for mut credit in credits {
            let backup_id = std::mem::take(&mut credit.id);
            let phone_id = replay.phone_ids.get(&credit.phone_id).cloned();
            let sale_id = replay.sale_ids.get(&credit.sale_id).cloned();
            let (Some(phone_id), Some(sale_id)) = (phone_id, sale_id) else {
                let reason = format!(
                    "phone {} or sale {} was not restored",
                    credit.phone_id, credit.sale_id
                );
                summary.skip(resell_core::Credit::ENTITY, &backup_id, reason);
                continue;
            };
            credit.phone_id = phone_id;
            credit.sale_id = sale_id;

            match self.engine.credits().insert(credit).await {
                Ok(stored) => {
                    let active = replay.active_sales.get(&stored.phone_id) == Some(&stored.sale_id);
                    if active {
                        if let Some(phone) = replay.phones.get_mut(&stored.phone_id) {
                            let at = phone.updated_at;
                            lifecycle::mirror_credit_on_phone(phone, &stored, at);
                            replay.dirty.insert(phone.id.clone());
                        }
                    }
                    summary.credits.imported += 1;
                }
                Err(err) => summary.skip(resell_core::Credit::ENTITY, &backup_id, err.to_string()),
            }
        }
    }

    /// Writes the reconciled sale mirrors back onto the restored phones.
    async fn save_phones(&self, replay: &mut Replay, summary: &mut RestoreSummary) {
        for phone_id in replay.dirty.drain() {
            let Some(phone) = replay.phones.get(&phone_id) else {
                continue;
            };
            if let Err(err) = self.engine.phones().update(phone).await {
                summary
                    .warnings
                    .push(format!("phone {}: sale fields not restored: {}", phone_id, err));
            }
        }
    }
}

/// Identifier maps and phone state built up while replaying.
#[derive(Default)]
struct Replay {
    phone_ids: HashMap<String, String>,
    sale_ids: HashMap<String, String>,
    return_ids: HashMap<String, String>,
    /// Restored phones by new id, with their mirrors reconciled so far.
    phones: HashMap<String, Phone>,
    /// New phone id to the new id of the sale it currently reflects.
    active_sales: HashMap<String, String>,
    sales: Vec<Sale>,
    dirty: HashSet<String>,
}

/// `safety-backup-YYYYMMDD-HHMMSSmmm.json`, millisecond resolution.
pub fn safety_backup_name(at: DateTime<Utc>) -> String {
    format!("{}-{}.json", SAFETY_BACKUP_PREFIX, at.format("%Y%m%d-%H%M%S%3f"))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DbError, ServiceError};
    use crate::pool::{Database, DbConfig};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use resell_core::{NewPhone, PhoneStatus, ReturnInput, SaleInput};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    const TENANT: &str = "shop";

    /// Archive kept in memory; `broken` makes every write fail.
    #[derive(Default)]
    struct MemoryArchive {
        documents: Mutex<HashMap<String, String>>,
        broken: bool,
    }

    #[async_trait]
    impl BackupArchive for MemoryArchive {
        async fn store(&self, name: &str, document: &BackupDocument) -> DbResult<String> {
            if self.broken {
                return Err(DbError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only archive",
                )));
            }
            let json = serde_json::to_string(document)?;
            self.documents.lock().await.insert(name.to_string(), json);
            Ok(name.to_string())
        }

        async fn read(&self, name: &str) -> DbResult<String> {
            self.documents
                .lock()
                .await
                .get(name)
                .cloned()
                .ok_or_else(|| DbError::not_found("Backup", name))
        }

        async fn list(&self) -> DbResult<Vec<String>> {
            let mut names: Vec<String> = self.documents.lock().await.keys().cloned().collect();
            names.sort();
            Ok(names)
        }
    }

    fn codec<S: Store>(store: S, archive: MemoryArchive) -> BackupCodec<S, MemoryArchive> {
        BackupCodec::new(LifecycleEngine::new(Arc::new(store), TENANT), archive)
    }

    fn phone(imei: &str, model: &str, price: i64) -> NewPhone {
        NewPhone {
            imei1: imei.to_string(),
            model: model.to_string(),
            purchase_price_cents: price,
            ..Default::default()
        }
    }

    fn sale(price: i64) -> SaleInput {
        SaleInput {
            sale_price_cents: price,
            customer_name: Some("Bilal".to_string()),
            ..Default::default()
        }
    }

    fn refund(return_price: i64, new_price: i64) -> ReturnInput {
        ReturnInput {
            return_price_cents: return_price,
            new_price_cents: new_price,
            ..Default::default()
        }
    }

    /// In stock, sold, sold-returned-resold, credit with a payment,
    /// returned credit sale.
    async fn populate<S: Store>(engine: &LifecycleEngine<S>) {
        engine.add_phone(phone("100", "Pixel 7", 100)).await.unwrap();

        let sold = engine.add_phone(phone("200", "iPhone 12", 200)).await.unwrap();
        engine.record_sale(&sold.id, sale(260)).await.unwrap();

        let resold = engine.add_phone(phone("300", "iPhone 13", 300)).await.unwrap();
        engine.record_sale(&resold.id, sale(350)).await.unwrap();
        engine.record_return(&resold.id, refund(340, 290)).await.unwrap();
        engine.record_sale(&resold.id, sale(330)).await.unwrap();

        let credit = engine.add_phone(phone("400", "Galaxy S21", 400)).await.unwrap();
        let outcome = engine
            .record_sale(
                &credit.id,
                SaleInput {
                    is_credit: true,
                    received_amount_cents: 100,
                    ..sale(500)
                },
            )
            .await
            .unwrap();
        engine
            .record_credit_payment(&outcome.credit.unwrap().id, 150, None, None)
            .await
            .unwrap();

        let cancelled = engine.add_phone(phone("500", "Galaxy S22", 500)).await.unwrap();
        engine
            .record_sale(
                &cancelled.id,
                SaleInput {
                    is_credit: true,
                    received_amount_cents: 50,
                    ..sale(600)
                },
            )
            .await
            .unwrap();
        engine.record_return(&cancelled.id, refund(50, 480)).await.unwrap();
    }

    fn by_imei(snapshot: &Snapshot) -> HashMap<String, Phone> {
        snapshot
            .phones
            .iter()
            .map(|p| (p.imei1.clone(), p.clone()))
            .collect()
    }

    async fn round_trip<S: Store, T: Store>(source: S, target: T) {
        let source = codec(source, MemoryArchive::default());
        populate(source.engine()).await;
        let json = source.export_json().await.unwrap();
        let before = source.engine().snapshot().await.unwrap();

        let target = codec(target, MemoryArchive::default());
        let summary = target.import_json(&json).await.unwrap();
        let after = target.engine().snapshot().await.unwrap();

        assert_eq!(summary.phones.imported, 5);
        assert_eq!(summary.sales.imported, 5);
        assert_eq!(summary.returns.imported, 2);
        assert_eq!(summary.credits.imported, 2);
        assert_eq!(summary.credit_payments_discarded, 1);
        assert_eq!(summary.safety_backup, None);
        assert!(summary.skipped.is_empty());

        assert_eq!(after.phones.len(), before.phones.len());
        assert_eq!(after.sales.len(), before.sales.len());
        assert_eq!(after.returns.len(), before.returns.len());
        assert_eq!(after.credits.len(), before.credits.len());
        assert!(after.credit_payments.is_empty());

        // Fresh identifiers, links intact.
        let phone_ids: HashSet<_> = after.phones.iter().map(|p| p.id.as_str()).collect();
        let sale_ids: HashSet<_> = after.sales.iter().map(|s| s.id.as_str()).collect();
        let return_ids: HashSet<_> = after.returns.iter().map(|r| r.id.as_str()).collect();
        assert!(before.phones.iter().all(|p| !phone_ids.contains(p.id.as_str())));
        assert!(after.sales.iter().all(|s| phone_ids.contains(s.phone_id.as_str())));
        assert!(after.returns.iter().all(|r| sale_ids.contains(r.sale_id.as_str())));
        assert!(after.credits.iter().all(|c| {
            phone_ids.contains(c.phone_id.as_str()) && sale_ids.contains(c.sale_id.as_str())
        }));

        let resale = after.sales.iter().find(|s| s.is_resale).unwrap();
        assert_eq!(resale.profit_cents, 40);
        let original = resale.original_return_id.as_deref().unwrap();
        assert!(return_ids.contains(original));

        // Phones end up in the state they were exported in.
        let (old, new) = (by_imei(&before), by_imei(&after));
        for (imei, exported) in &old {
            let restored = &new[imei];
            assert_eq!(restored.status, exported.status, "status of {imei}");
            assert_eq!(restored.purchase_price_cents, exported.purchase_price_cents);
            assert_eq!(restored.sale_price_cents, exported.sale_price_cents);
            assert_eq!(restored.receipt_number, exported.receipt_number);
            assert_eq!(restored.is_credit, exported.is_credit);
            assert_eq!(restored.credit_remaining_cents, exported.credit_remaining_cents);
        }
        assert_eq!(new["400"].credit_remaining_cents, Some(250));
        assert_eq!(new["500"].status, PhoneStatus::InStock);
    }

    #[tokio::test]
    async fn test_round_trip_embedded() {
        round_trip(MemoryStore::new(), MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_round_trip_embedded_to_sqlite() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        round_trip(MemoryStore::new(), db).await;
    }

    /// Restores a sell, return, resell history whose sales are listed newest
    /// first, the way `list_sales` hands them out.
    async fn restore_newest_first<T: Store>(target: T) {
        let source = codec(MemoryStore::new(), MemoryArchive::default());
        let engine = source.engine();
        let resold = engine.add_phone(phone("300", "iPhone 13", 300)).await.unwrap();
        engine.record_sale(&resold.id, sale(350)).await.unwrap();
        engine.record_return(&resold.id, refund(340, 290)).await.unwrap();
        let resale = engine.record_sale(&resold.id, sale(330)).await.unwrap().sale;

        let mut document = source.export().await.unwrap();
        document.sales[1].created_at = document.sales[0].created_at + chrono::Duration::seconds(1);
        document.sales.reverse();
        assert_eq!(document.sales[0].id, resale.id);
        let json = serde_json::to_string(&document).unwrap();

        let target = codec(target, MemoryArchive::default());
        let summary = target.import_json(&json).await.unwrap();
        assert!(summary.skipped.is_empty());

        let live = target.engine().snapshot().await.unwrap();
        let restored = &live.phones[0];
        assert_eq!(restored.status, PhoneStatus::Sold);
        assert_eq!(restored.sale_price_cents, Some(330));
        assert_eq!(restored.receipt_number.as_deref(), Some(resale.receipt_number.as_str()));
        assert_eq!(
            lifecycle::active_sale(restored, &live.sales).map(|s| s.sale_price_cents),
            Some(330)
        );

        // The resale is still live, so the phone cannot be sold again.
        let err = target
            .engine()
            .record_sale(&restored.id, sale(400))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::AlreadySold { .. })));
    }

    #[tokio::test]
    async fn test_restore_follows_creation_order_embedded() {
        restore_newest_first(MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_restore_follows_creation_order_sqlite() {
        restore_newest_first(Database::new(DbConfig::in_memory()).await.unwrap()).await;
    }

    #[tokio::test]
    async fn test_import_over_live_data_writes_safety_backup() {
        let source = codec(MemoryStore::new(), MemoryArchive::default());
        populate(source.engine()).await;
        let json = source.export_json().await.unwrap();

        let target = codec(MemoryStore::new(), MemoryArchive::default());
        target
            .engine()
            .add_phone(phone("999", "Nokia 3310", 10))
            .await
            .unwrap();

        let summary = target.import_json(&json).await.unwrap();
        let name = summary.safety_backup.clone().unwrap();
        assert!(name.starts_with("safety-backup-") && name.ends_with(".json"));
        assert_eq!(target.archive().list().await.unwrap(), vec![name.clone()]);

        let saved: BackupDocument =
            serde_json::from_str(&target.archive().read(&name).await.unwrap()).unwrap();
        assert_eq!(saved.phones.len(), 1);
        assert_eq!(saved.phones[0].imei1, "999");

        let live = target.engine().snapshot().await.unwrap();
        assert_eq!(live.phones.len(), 5);
        assert!(live.phones.iter().all(|p| p.imei1 != "999"));
    }

    #[tokio::test]
    async fn test_invalid_backup_leaves_live_data_untouched() {
        let target = codec(MemoryStore::new(), MemoryArchive::default());
        populate(target.engine()).await;
        let before = target.engine().snapshot().await.unwrap();

        let mut document = target.export().await.unwrap();
        document.sales[0].phone_id = "ghost".to_string();
        document.returns[0].sale_id = "ghost-sale".to_string();
        let json = serde_json::to_string(&document).unwrap();

        match target.import_json(&json).await {
            Err(BackupError::Invalid(problems)) => {
                assert_eq!(problems.len(), 2);
                assert!(problems[0].contains("ghost"));
            }
            other => panic!("expected Invalid, got {other:?}"),
        }

        let after = target.engine().snapshot().await.unwrap();
        assert_eq!(after.phones, before.phones);
        assert_eq!(after.sales, before.sales);
        assert_eq!(after.credit_payments, before.credit_payments);
        assert!(target.archive().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_and_structurally_broken_documents() {
        let target = codec(MemoryStore::new(), MemoryArchive::default());

        let err = target.import_json("{ not json").await.unwrap_err();
        assert!(matches!(err, BackupError::Unreadable { .. }));
        assert!(err.to_string().contains("No data was modified"));

        let err = target.import_json(r#"{"phones": []}"#).await.unwrap_err();
        match err {
            BackupError::Invalid(problems) => assert_eq!(problems.len(), 2),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_safety_backup_does_not_block_restore() {
        let source = codec(MemoryStore::new(), MemoryArchive::default());
        populate(source.engine()).await;
        let json = source.export_json().await.unwrap();

        let target = codec(
            MemoryStore::new(),
            MemoryArchive {
                broken: true,
                ..Default::default()
            },
        );
        target
            .engine()
            .add_phone(phone("999", "Nokia 3310", 10))
            .await
            .unwrap();

        let summary = target.import_json(&json).await.unwrap();
        assert_eq!(summary.safety_backup, None);
        assert_eq!(summary.phones.imported, 5);
    }

    #[tokio::test]
    async fn test_rejected_records_are_skipped_not_fatal() {
        let source = codec(MemoryStore::new(), MemoryArchive::default());
        let a = source.engine().add_phone(phone("111", "A", 100)).await.unwrap();
        source.engine().record_sale(&a.id, sale(150)).await.unwrap();
        let b = source.engine().add_phone(phone("222", "B", 100)).await.unwrap();
        source.engine().record_sale(&b.id, sale(150)).await.unwrap();

        // Two phones sharing imei1: the store refuses the second one, and
        // its sale goes with it.
        let mut document = source.export().await.unwrap();
        document.phones[1].imei1 = "111".to_string();
        document.version = "0.9.0".to_string();
        let json = serde_json::to_string(&document).unwrap();

        let target = codec(MemoryStore::new(), MemoryArchive::default());
        let summary = target.import_json(&json).await.unwrap();

        assert_eq!(summary.phones, TableCount { imported: 1, skipped: 1 });
        assert_eq!(summary.sales, TableCount { imported: 1, skipped: 1 });
        assert_eq!(summary.skipped[0].entity, "Phone");
        assert_eq!(summary.skipped[0].backup_id, b.id);
        assert!(summary.warnings[0].contains("0.9.0"));

        let live = target.engine().snapshot().await.unwrap();
        assert_eq!(live.phones.len(), 1);
        assert_eq!(live.phones[0].status, PhoneStatus::Sold);

        assert_eq!(
            summary.into_result().unwrap_err(),
            CoreError::PartialImportFailure { skipped: 2 }
        );
    }

    #[tokio::test]
    async fn test_export_to_archive() {
        let codec = codec(MemoryStore::new(), MemoryArchive::default());
        populate(codec.engine()).await;

        let name = codec.export_to_archive("nightly.json").await.unwrap();
        let raw = codec.archive().read(&name).await.unwrap();
        let summary = codec.import_json(&raw).await.unwrap();

        assert_eq!(summary.imported_count(), 14);
        assert!(summary.safety_backup.is_some());
    }

    #[test]
    fn test_safety_backup_name() {
        let at = DateTime::parse_from_rfc3339("2026-05-20T10:15:30.042Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(safety_backup_name(at), "safety-backup-20260520-101530042.json");
    }

    #[tokio::test]
    async fn test_safety_backup_never_overwrites() {
        let codec = codec(MemoryStore::new(), MemoryArchive::default());
        let document = BackupDocument::from_snapshot(Snapshot::default(), Utc::now());
        let name = "safety-backup-20260520-101530042.json";

        assert_eq!(codec.unused_name(name.to_string()).await, name);

        codec.archive().store(name, &document).await.unwrap();
        codec
            .archive()
            .store("safety-backup-20260520-101530042-1.json", &document)
            .await
            .unwrap();
        assert_eq!(
            codec.unused_name(name.to_string()).await,
            "safety-backup-20260520-101530042-2.json"
        );
    }

    #[tokio::test]
    async fn test_back_to_back_imports_keep_every_safety_backup() {
        let codec = codec(MemoryStore::new(), MemoryArchive::default());
        populate(codec.engine()).await;
        let json = codec.export_json().await.unwrap();

        let first = codec.import_json(&json).await.unwrap().safety_backup.unwrap();
        let second = codec.import_json(&json).await.unwrap().safety_backup.unwrap();
        assert_ne!(first, second);
        assert_eq!(codec.archive().list().await.unwrap().len(), 2);
    }
}
