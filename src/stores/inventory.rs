use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use super::{local_today, new_id, StoreError};
use crate::mock_api::{ApiError, MockApi, TryModify};
use crate::models::{
    InventoryFilters, InventoryItem, InventoryItemUpdate, InventoryStats, ItemCategory,
    ItemStatus, NewInventoryItem, NewStockMovement, NotificationPriority, ReorderSuggestion,
    StockAlert, StockAlertKind, StockMovement,
};
use crate::rules;
use crate::store::{EntityState, EntityStore};

pub type InventoryState = EntityState<InventoryItem, InventoryFilters>;

pub struct InventoryStore {
    items: EntityStore<InventoryItem, InventoryFilters>,
    movements: EntityStore<StockMovement, ()>,
}

deref_entity_store!(InventoryStore, items: InventoryItem, InventoryFilters);

impl InventoryStore {
    pub fn new(items: Arc<MockApi<InventoryItem>>, movements: Arc<MockApi<StockMovement>>) -> Self {
        Self {
            items: EntityStore::new(items),
            movements: EntityStore::new(movements),
        }
    }

    pub fn movements(&self) -> &EntityStore<StockMovement, ()> {
        &self.movements
    }

    pub async fn create(&self, new: NewInventoryItem) -> Result<InventoryItem, StoreError> {
        new.validate()?;
        let item = new.into_item(new_id(), local_today(), Utc::now());
        self.items.insert(item).await
    }

    /// Changing stock, minimum level or expiry without an explicit status
    /// re-derives the status.
    pub async fn update(
        &self,
        id: &str,
        update: InventoryItemUpdate,
    ) -> Result<InventoryItem, StoreError> {
        self.items.patch(id, update).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.items.remove(id).await
    }

    // ── Stock movements ─────────────────────────────────────

    /// Applies the movement to the item's stock, re-derives its status and
    /// appends the movement to the history. Stock never goes below zero.
    pub async fn record_stock_movement(
        &self,
        item_id: &str,
        movement: NewStockMovement,
        performed_by: &str,
    ) -> Result<StockMovement, StoreError> {
        movement.validate()?;
        let items = Arc::clone(self.items.api());
        let movements = Arc::clone(self.movements.api());
        let performed_by = performed_by.to_string();
        let today = local_today();

        let (item, recorded) = self
            .items
            .run(
                "stock-movement",
                async move {
                    let delta = rules::stock_delta(movement.kind, movement.quantity);
                    // Stock seen under the write lock; set on shortage too.
                    let mut previous = None;
                    let mut short = false;
                    let result = items
                        .update(
                            item_id,
                            TryModify(|i: &mut InventoryItem| {
                                previous = Some(i.current_stock);
                                let Ok(new_stock) =
                                    u32::try_from(i64::from(i.current_stock) + delta)
                                else {
                                    short = true;
                                    return Err(ApiError::InvalidPatch("insufficient stock".into()));
                                };
                                i.current_stock = new_stock;
                                i.status = rules::determine_item_status(
                                    new_stock,
                                    i.min_stock_level,
                                    i.expiry_date,
                                    today,
                                );
                                Ok(())
                            }),
                        )
                        .await;
                    let item = match result {
                        Ok(item) => item,
                        Err(_) if short => {
                            return Err(StoreError::InsufficientStock {
                                item_id: item_id.to_string(),
                                available: previous.unwrap_or_default(),
                                requested: movement.quantity,
                            })
                        }
                        Err(e) => return Err(e.into()),
                    };
                    let previous_stock = previous.unwrap_or_default();

                    let now = Utc::now();
                    let entry = StockMovement {
                        id: new_id(),
                        item_id: item_id.to_string(),
                        item_name: Some(item.name.clone()),
                        kind: movement.kind,
                        quantity: movement.quantity,
                        previous_stock,
                        new_stock: item.current_stock,
                        reason: movement.reason,
                        reference_number: movement.reference_number,
                        performed_by,
                        created_at: now,
                        updated_at: now,
                    };
                    let recorded = movements.create(entry).await?;
                    Ok((item, recorded))
                },
                |s, (item, _): &(InventoryItem, StockMovement)| {
                    if let Some(slot) = s.data.iter_mut().find(|i| i.id == item.id) {
                        *slot = item.clone();
                    }
                },
            )
            .await?;

        self.movements
            .store()
            .update(|s| s.data.push(recorded.clone()));
        tracing::info!(
            item = %item.name,
            kind = %recorded.kind,
            previous = recorded.previous_stock,
            new = recorded.new_stock,
            status = %item.status,
            "stock movement recorded"
        );
        Ok(recorded)
    }

    pub fn movements_for_item(&self, item_id: &str) -> Vec<StockMovement> {
        self.movements.store().with(|s| {
            s.data
                .iter()
                .filter(|m| m.item_id == item_id)
                .cloned()
                .collect()
        })
    }

    // ── Filter shortcuts ────────────────────────────────────

    pub fn filter_by_category(&self, category: ItemCategory) {
        self.update_filters(|f| f.category = Some(category));
    }

    pub fn filter_by_status(&self, status: ItemStatus) {
        self.update_filters(|f| f.status = Some(status));
    }

    // ── Derived views ───────────────────────────────────────

    /// Items matching the search query (name, SKU, manufacturer, barcode)
    /// and the active filters.
    pub fn filtered(&self) -> Vec<InventoryItem> {
        self.store().with(|s| {
            let query = s.search_query.trim().to_lowercase();
            s.data
                .iter()
                .filter(|i| query.is_empty() || matches_query(i, &query))
                .filter(|i| s.filters.matches(i))
                .cloned()
                .collect()
        })
    }

    /// Out-of-stock, low-stock, expired and expiring-soon alerts, grouped in
    /// that order.
    pub fn stock_alerts_on(&self, today: NaiveDate) -> Vec<StockAlert> {
        self.store().with(|s| stock_alerts(&s.data, today))
    }

    pub fn stock_alerts(&self) -> Vec<StockAlert> {
        self.stock_alerts_on(local_today())
    }

    pub fn stats(&self) -> InventoryStats {
        self.store().with(|s| {
            let mut stats = InventoryStats {
                total: s.data.len(),
                ..InventoryStats::default()
            };
            for item in &s.data {
                stats.total_value += item.stock_value();
                *stats.by_category.entry(item.category).or_insert(0) += 1;
                *stats.by_status.entry(item.status).or_insert(0) += 1;
                if matches!(
                    item.status,
                    ItemStatus::LowStock | ItemStatus::OutOfStock | ItemStatus::Expired
                ) {
                    stats.alert_count += 1;
                }
            }
            stats
        })
    }

    pub fn items_needing_reorder(&self) -> Vec<ReorderSuggestion> {
        self.store().with(|s| {
            s.data
                .iter()
                .filter(|i| i.needs_reorder())
                .map(|i| ReorderSuggestion {
                    recommended_order_quantity: rules::recommended_order_quantity(i),
                    item: i.clone(),
                })
                .collect()
        })
    }
}

fn matches_query(item: &InventoryItem, query: &str) -> bool {
    let contains = |field: &Option<String>| {
        field
            .as_deref()
            .is_some_and(|v| v.to_lowercase().contains(query))
    };
    item.name.to_lowercase().contains(query)
        || contains(&item.sku)
        || contains(&item.manufacturer)
        || contains(&item.barcode)
}

fn stock_alerts(items: &[InventoryItem], today: NaiveDate) -> Vec<StockAlert> {
    let alert = |item: &InventoryItem, kind, priority, message: String| StockAlert {
        item_id: item.id.clone(),
        item_name: item.name.clone(),
        kind,
        priority,
        message,
    };
    let mut alerts = Vec::new();

    alerts.extend(items.iter().filter(|i| i.current_stock == 0).map(|i| {
        alert(
            i,
            StockAlertKind::OutOfStock,
            NotificationPriority::Urgent,
            format!("{} stok tükendi", i.name),
        )
    }));
    alerts.extend(
        items
            .iter()
            .filter(|i| i.current_stock > 0 && i.current_stock <= i.min_stock_level)
            .map(|i| {
                alert(
                    i,
                    StockAlertKind::LowStock,
                    NotificationPriority::High,
                    format!("{} düşük stokta ({} {})", i.name, i.current_stock, i.unit),
                )
            }),
    );
    alerts.extend(
        items
            .iter()
            .filter(|i| i.expiry_date.is_some_and(|d| d < today))
            .map(|i| {
                alert(
                    i,
                    StockAlertKind::Expired,
                    NotificationPriority::High,
                    format!("{} son kullanma tarihi geçmiş", i.name),
                )
            }),
    );
    alerts.extend(items.iter().filter_map(|i| {
        let expiry = i.expiry_date.filter(|d| rules::is_expiring_soon(*d, today))?;
        Some(alert(
            i,
            StockAlertKind::ExpiringSoon,
            NotificationPriority::Medium,
            format!(
                "{} son kullanma tarihi yaklaşıyor ({})",
                i.name,
                expiry.format("%d.%m.%Y")
            ),
        ))
    }));
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn new_item(name: &str, stock: u32, min: u32, expiry: Option<NaiveDate>) -> NewInventoryItem {
        NewInventoryItem {
            name: name.into(),
            category: ItemCategory::Medication,
            sku: Some(format!("SKU-{}", name.to_uppercase())),
            barcode: None,
            description: None,
            manufacturer: Some("Abdi İbrahim".into()),
            current_stock: stock,
            min_stock_level: min,
            max_stock_level: 100,
            unit: "kutu".into(),
            unit_price: 2_500,
            expiry_date: expiry,
            location: Some("Depo A".into()),
            notes: None,
        }
    }

    fn empty_store() -> InventoryStore {
        InventoryStore::new(
            Arc::new(MockApi::instant(vec![])),
            Arc::new(MockApi::instant(vec![])),
        )
    }

    #[tokio::test]
    async fn usage_and_purchase_move_stock_and_status() {
        let store = empty_store();
        let item = store.create(new_item("Parol", 20, 10, None)).await.unwrap();
        assert_eq!(item.status, ItemStatus::InStock);

        let used = store
            .record_stock_movement(&item.id, NewStockMovement::new(StockMovementType::Usage, 12), "u3")
            .await
            .unwrap();
        assert_eq!(used.previous_stock, 20);
        assert_eq!(used.new_stock, 8);
        assert_eq!(used.item_name.as_deref(), Some("Parol"));
        let low = store.data()[0].clone();
        assert_eq!(low.current_stock, 8);
        assert_eq!(low.status, ItemStatus::LowStock);

        store
            .record_stock_movement(&item.id, NewStockMovement::new(StockMovementType::Disposal, 8), "u3")
            .await
            .unwrap();
        assert_eq!(store.data()[0].status, ItemStatus::OutOfStock);

        store
            .record_stock_movement(&item.id, NewStockMovement::new(StockMovementType::Purchase, 50), "u3")
            .await
            .unwrap();
        assert_eq!(store.get(&item.id).await.unwrap().status, ItemStatus::InStock);
        assert_eq!(store.movements_for_item(&item.id).len(), 3);
        assert_eq!(store.movements().api().len(), 3);
    }

    #[tokio::test]
    async fn overdrawing_stock_is_rejected() {
        let store = empty_store();
        let item = store.create(new_item("Parol", 5, 10, None)).await.unwrap();
        let err = store
            .record_stock_movement(&item.id, NewStockMovement::new(StockMovementType::Usage, 6), "u3")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock {
                available: 5,
                requested: 6,
                ..
            }
        ));
        assert_eq!(store.get(&item.id).await.unwrap().current_stock, 5);
        assert!(store.movements().data().is_empty());
        assert!(store.state().error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_usage_cannot_overdraw() {
        let delay = std::time::Duration::from_millis(20);
        let store = InventoryStore::new(
            Arc::new(MockApi::with_delay(vec![], delay)),
            Arc::new(MockApi::with_delay(vec![], delay)),
        );
        let item = store.create(new_item("Parol", 5, 1, None)).await.unwrap();

        let (a, b) = tokio::join!(
            store.record_stock_movement(&item.id, NewStockMovement::new(StockMovementType::Usage, 4), "u1"),
            store.record_stock_movement(&item.id, NewStockMovement::new(StockMovementType::Usage, 4), "u2"),
        );
        let (ok, err) = match (a, b) {
            (Ok(m), Err(e)) | (Err(e), Ok(m)) => (m, e),
            other => panic!("expected exactly one success, got {other:?}"),
        };
        assert_eq!(ok.previous_stock, 5);
        assert_eq!(ok.new_stock, 1);
        assert!(matches!(
            err,
            StoreError::InsufficientStock { available: 1, requested: 4, .. }
        ));
        assert_eq!(store.api().get_by_id(&item.id).await.unwrap().current_stock, 1);
        assert_eq!(store.movements().api().len(), 1);
    }

    #[tokio::test]
    async fn movement_on_missing_item_fails() {
        let store = empty_store();
        let err = store
            .record_stock_movement("nope", NewStockMovement::new(StockMovementType::Purchase, 1), "u3")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn search_and_filters() {
        let store = empty_store();
        store.create(new_item("Parol", 20, 10, None)).await.unwrap();
        let mut gloves = new_item("Eldiven", 0, 10, None);
        gloves.category = ItemCategory::Consumable;
        gloves.manufacturer = Some("Medikal AŞ".into());
        store.create(gloves).await.unwrap();

        store.set_search_query("sku-par");
        assert_eq!(store.filtered().len(), 1);
        store.set_search_query("medikal");
        assert_eq!(store.filtered()[0].name, "Eldiven");

        store.clear_filters();
        store.filter_by_category(ItemCategory::Consumable);
        store.filter_by_status(ItemStatus::OutOfStock);
        assert_eq!(store.filtered().len(), 1);
        store.filter_by_status(ItemStatus::InStock);
        assert!(store.filtered().is_empty());
    }

    #[tokio::test]
    async fn alerts_cover_every_kind_in_group_order() {
        let today = day(6, 1);
        let items = vec![
            new_item("Vitamin", 50, 10, Some(day(7, 15))).into_item("a".into(), today, Utc::now()),
            new_item("Serum", 50, 10, Some(day(5, 1))).into_item("b".into(), today, Utc::now()),
            new_item("Parol", 4, 10, None).into_item("c".into(), today, Utc::now()),
            new_item("Eldiven", 0, 10, None).into_item("d".into(), today, Utc::now()),
            new_item("Gazlı bez", 50, 10, Some(day(12, 1))).into_item("e".into(), today, Utc::now()),
        ];
        let store = InventoryStore::new(
            Arc::new(MockApi::instant(items)),
            Arc::new(MockApi::instant(vec![])),
        );

        let alerts = store.stock_alerts_on(today);
        let kinds: Vec<_> = alerts.iter().map(|a| (a.item_id.as_str(), a.kind)).collect();
        assert_eq!(
            kinds,
            [
                ("d", StockAlertKind::OutOfStock),
                ("c", StockAlertKind::LowStock),
                ("b", StockAlertKind::Expired),
                ("a", StockAlertKind::ExpiringSoon),
            ]
        );
        assert_eq!(alerts[0].priority, NotificationPriority::Urgent);
        assert_eq!(alerts[1].message, "Parol düşük stokta (4 kutu)");
        assert!(alerts[3].message.contains("15.07.2024"));
    }

    #[tokio::test]
    async fn stats_and_reorder_suggestions() {
        let today = day(6, 1);
        let items = vec![
            new_item("Parol", 4, 10, None).into_item("c".into(), today, Utc::now()),
            new_item("Eldiven", 0, 30, None).into_item("d".into(), today, Utc::now()),
            new_item("Serum", 50, 10, Some(day(5, 1))).into_item("b".into(), today, Utc::now()),
            new_item("Vitamin", 60, 10, None).into_item("a".into(), today, Utc::now()),
        ];
        let store = InventoryStore::new(
            Arc::new(MockApi::instant(items)),
            Arc::new(MockApi::instant(vec![])),
        );

        let stats = store.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.total_value, (4 + 50 + 60) * 2_500);
        assert_eq!(stats.by_category.get(&ItemCategory::Medication), Some(&4));
        assert_eq!(stats.by_status.get(&ItemStatus::Expired), Some(&1));
        assert_eq!(stats.alert_count, 3);

        let reorder = store.items_needing_reorder();
        let quantities: Vec<_> = reorder
            .iter()
            .map(|r| (r.item.id.as_str(), r.recommended_order_quantity))
            .collect();
        assert_eq!(quantities, [("c", 96), ("d", 100)]);
    }
}
