//! Saved cost query history
//!
//! The whole history lives as one JSON array under a single key. Saving is a
//! read-modify-write of that array and is not transactional: two stores
//! writing to the same database can lose an update, the last write wins.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::db;
use crate::error::{CostError, Result};
use crate::models::{CostComputation, HistoryEntry};

/// Storage key holding the serialized history
pub const HISTORY_KEY: &str = "consultasHistorico";

pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    /// Wrap an open connection, creating the schema if needed
    pub fn new(conn: Connection) -> Result<Self> {
        db::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open (or create) the history database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(Connection::open(path)?)
    }

    /// All saved entries in insertion order
    ///
    /// Unreadable or malformed data is logged and reported as an empty history.
    pub fn load_all(&self) -> Vec<HistoryEntry> {
        match self.try_load() {
            Ok(entries) => entries,
            Err(error) => {
                warn!(%error, "ignoring unreadable query history");
                Vec::new()
            }
        }
    }

    fn try_load(&self) -> Result<Vec<HistoryEntry>> {
        let Some(raw) = db::get_value(&self.conn, HISTORY_KEY)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|e| CostError::StorageCorrupt(e.to_string()))
    }

    /// Whether anything is stored under the history key, readable or not
    pub fn is_stored(&self) -> Result<bool> {
        Ok(db::get_value(&self.conn, HISTORY_KEY)?.is_some())
    }

    /// Record a computation as a new history entry and persist the full history
    ///
    /// Unreadable stored history aborts the save and is left as it was.
    pub fn save(
        &self,
        computation: &CostComputation,
        product_name: &str,
        produced_quantity: f64,
        queried_at: DateTime<Utc>,
    ) -> Result<HistoryEntry> {
        let mut entries = self.try_load()?;

        let entry = HistoryEntry {
            id: unique_id(&entries, queried_at),
            queried_at,
            product_name: product_name.to_string(),
            produced_quantity,
            total_cost: computation.total_cost,
            detail: computation.clone(),
        };
        entries.push(entry.clone());
        self.replace_all(&entries)?;

        info!(id = %entry.id, product = product_name, total_cost = entry.total_cost, "saved cost query");
        Ok(entry)
    }

    /// Overwrite the stored history with `entries`
    pub fn replace_all(&self, entries: &[HistoryEntry]) -> Result<()> {
        let raw = serde_json::to_string(entries)?;
        db::set_value(&self.conn, HISTORY_KEY, &raw)
    }

    /// Delete every saved entry
    pub fn clear_all(&self) -> Result<()> {
        db::remove_value(&self.conn, HISTORY_KEY)?;
        info!("cleared query history");
        Ok(())
    }
}

/// Timestamp id, suffixed when an entry with the same instant already exists
fn unique_id(existing: &[HistoryEntry], queried_at: DateTime<Utc>) -> String {
    let base = queried_at.to_rfc3339_opts(SecondsFormat::Millis, true);
    let taken = |candidate: &str| existing.iter().any(|e| e.id == candidate);

    if !taken(&base) {
        return base;
    }
    let mut suffix = 1;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if !taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::compute_cost;
    use crate::models::RawMaterialUsage;
    use chrono::TimeZone;

    fn store() -> HistoryStore {
        HistoryStore::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn computation(cost: f64, quantity: f64) -> CostComputation {
        let materials = vec![RawMaterialUsage {
            name: "Aço".to_string(),
            quantity_used_per_unit: 1.0,
            unit_cost: Some(cost),
            ..Default::default()
        }];
        compute_cost(&materials, quantity).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn empty_store_loads_nothing() {
        assert!(store().load_all().is_empty());
    }

    #[test]
    fn save_then_load_returns_entry_last() {
        let store = store();
        store.save(&computation(2.0, 1.0), "Mesa", 1.0, at(0)).unwrap();
        let saved = store.save(&computation(5.0, 4.0), "Cadeira", 4.0, at(1)).unwrap();

        let entries = store.load_all();
        assert_eq!(entries.len(), 2);
        let last = entries.last().unwrap();
        assert_eq!(last, &saved);
        assert_eq!(last.product_name, "Cadeira");
        assert_eq!(last.produced_quantity, 4.0);
        assert_eq!(last.total_cost, 20.0);
        assert_eq!(entries[0].product_name, "Mesa");
    }

    #[test]
    fn clear_then_load_is_empty() {
        let store = store();
        store.save(&computation(2.0, 1.0), "Mesa", 1.0, at(0)).unwrap();
        store.clear_all().unwrap();
        assert!(store.load_all().is_empty());
        store.clear_all().unwrap();
    }

    #[test]
    fn ids_are_unique_for_same_instant() {
        let store = store();
        let a = store.save(&computation(1.0, 1.0), "A", 1.0, at(0)).unwrap();
        let b = store.save(&computation(1.0, 1.0), "B", 1.0, at(0)).unwrap();
        let c = store.save(&computation(1.0, 1.0), "C", 1.0, at(0)).unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.id, "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn saved_entry_is_a_copy() {
        let store = store();
        let mut source = computation(3.0, 2.0);
        store.save(&source, "Mesa", 2.0, at(0)).unwrap();

        source.line_items[0].material.unit_cost = Some(100.0);
        source.total_cost = 400.0;

        let entry = &store.load_all()[0];
        assert_eq!(entry.total_cost, 6.0);
        assert_eq!(entry.detail.line_items[0].material.unit_cost, Some(3.0));
    }

    #[test]
    fn corrupt_history_reads_as_empty() {
        let store = store();
        db::set_value(&store.conn, HISTORY_KEY, "{not json").unwrap();
        assert!(store.load_all().is_empty());
        assert!(store.is_stored().unwrap());
    }

    #[test]
    fn save_refuses_to_overwrite_corrupt_history() {
        let store = store();
        db::set_value(&store.conn, HISTORY_KEY, "{not json").unwrap();

        let result = store.save(&computation(1.0, 1.0), "Mesa", 1.0, at(0));
        assert!(matches!(result, Err(CostError::StorageCorrupt(_))));
        assert_eq!(
            db::get_value(&store.conn, HISTORY_KEY).unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn null_numbers_in_stored_history_read_as_zero() {
        let store = store();
        let raw = r#"[
            {"id": "2024-05-01T10:00:00.000Z", "dataConsulta": "2024-05-01T10:00:00.000Z",
             "nomeProduto": "Mesa", "qtdProduzida": 2, "custoTotal": 12.5,
             "detalhes": {"quantidadeProduzida": 2, "totalCusto": 12.5, "rawMaterials": []}},
            {"id": "2024-05-02T10:00:00.000Z", "dataConsulta": "2024-05-02T10:00:00.000Z",
             "nomeProduto": "Cadeira", "qtdProduzida": null, "custoTotal": null,
             "detalhes": {"quantidadeProduzida": null, "totalCusto": null, "rawMaterials": [
                 {"descricao_produto": "Cola", "quantidade_utilizada": 1, "valor_unitario": null,
                  "quantidadeTotalMP": null, "subTotalMP": null}
             ]}}
        ]"#;
        db::set_value(&store.conn, HISTORY_KEY, raw).unwrap();

        let entries = store.load_all();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].product_name, "Cadeira");
        assert_eq!(entries[1].total_cost, 0.0);
        assert_eq!(entries[1].produced_quantity, 0.0);
        assert_eq!(entries[1].detail.total_cost, 0.0);
        assert_eq!(entries[1].detail.line_items[0].subtotal, 0.0);
        assert_eq!(entries[1].detail.line_items[0].material.unit_cost, None);

        store.save(&computation(1.0, 1.0), "Banco", 1.0, at(0)).unwrap();
        let names: Vec<_> = store.load_all().into_iter().map(|e| e.product_name).collect();
        assert_eq!(names, vec!["Mesa", "Cadeira", "Banco"]);
    }

    #[test]
    fn tolerates_missing_and_extra_fields() {
        let store = store();
        let raw = r#"[{"id": "x", "dataConsulta": "2024-05-01T10:00:00.000Z",
                      "nomeProduto": "Mesa", "qtdProduzida": 3, "custoTotal": 30.0,
                      "extra": true}]"#;
        db::set_value(&store.conn, HISTORY_KEY, raw).unwrap();

        let entries = store.load_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].produced_quantity, 3.0);
        assert!(entries[0].detail.line_items.is_empty());
    }

    // Known limitation: save is read-modify-write without a transaction, so
    // two writers that interleave lose the earlier update.
    #[test]
    fn interleaved_writers_lose_an_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let tab_a = HistoryStore::open(&path).unwrap();
        let tab_b = HistoryStore::open(&path).unwrap();

        let mut snapshot_a = tab_a.load_all();
        tab_b.save(&computation(1.0, 1.0), "B", 1.0, at(0)).unwrap();

        snapshot_a.push(HistoryEntry {
            id: "a".to_string(),
            product_name: "A".to_string(),
            ..Default::default()
        });
        tab_a.replace_all(&snapshot_a).unwrap();

        let entries = tab_b.load_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].product_name, "A");
    }
}
