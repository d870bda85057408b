use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::billing::Money;
use super::enums::{ItemCategory, ItemStatus, NotificationPriority, StockAlertKind, StockMovementType};
use crate::mock_api::{ApiError, Patch};
use crate::rules;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub category: ItemCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    pub current_stock: u32,
    pub min_stock_level: u32,
    pub max_stock_level: u32,
    pub unit: String,
    pub unit_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

entity!(InventoryItem, "InventoryItem");

impl InventoryItem {
    pub fn stock_value(&self) -> Money {
        Money::from(self.current_stock) * self.unit_price
    }

    pub fn needs_reorder(&self) -> bool {
        matches!(self.status, ItemStatus::OutOfStock | ItemStatus::LowStock)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub name: String,
    pub category: ItemCategory,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    pub current_stock: u32,
    pub min_stock_level: u32,
    pub max_stock_level: u32,
    pub unit: String,
    pub unit_price: Money,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewInventoryItem {
    /// Builds the stored item; status is derived from the stock levels on `today`.
    pub fn into_item(self, id: String, today: NaiveDate, now: DateTime<Utc>) -> InventoryItem {
        let status = rules::determine_item_status(
            self.current_stock,
            self.min_stock_level,
            self.expiry_date,
            today,
        );
        InventoryItem {
            id,
            name: self.name,
            category: self.category,
            sku: self.sku,
            barcode: self.barcode,
            description: self.description,
            manufacturer: self.manufacturer,
            current_stock: self.current_stock,
            min_stock_level: self.min_stock_level,
            max_stock_level: self.max_stock_level,
            unit: self.unit,
            unit_price: self.unit_price,
            expiry_date: self.expiry_date,
            status,
            location: self.location,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial item edit. Unless `status` is given explicitly, changing stock,
/// minimum level or expiry re-derives it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryItemUpdate {
    pub name: Option<String>,
    pub category: Option<ItemCategory>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
    pub current_stock: Option<u32>,
    pub min_stock_level: Option<u32>,
    pub max_stock_level: Option<u32>,
    pub unit: Option<String>,
    pub unit_price: Option<Money>,
    pub expiry_date: Option<NaiveDate>,
    pub status: Option<ItemStatus>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl Patch<InventoryItem> for InventoryItemUpdate {
    fn apply(self, item: &mut InventoryItem) -> Result<(), ApiError> {
        let rederive = self.status.is_none()
            && (self.current_stock.is_some()
                || self.min_stock_level.is_some()
                || self.expiry_date.is_some());
        let src = self;
        merge_fields!(src => item;
            name, category, current_stock, min_stock_level, max_stock_level,
            unit, unit_price, status;
            optional sku, barcode, description, manufacturer, expiry_date,
            location, notes);
        if rederive {
            item.status = rules::determine_item_status(
                item.current_stock,
                item.min_stock_level,
                item.expiry_date,
                Utc::now().date_naive(),
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: String,
    pub item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: StockMovementType,
    pub quantity: u32,
    pub previous_stock: u32,
    pub new_stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
    pub performed_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

entity!(StockMovement, "StockMovement");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStockMovement {
    #[serde(rename = "type")]
    pub kind: StockMovementType,
    pub quantity: u32,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub reference_number: Option<String>,
}

impl NewStockMovement {
    pub fn new(kind: StockMovementType, quantity: u32) -> Self {
        Self {
            kind,
            quantity,
            reason: None,
            reference_number: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryFilters {
    pub category: Option<ItemCategory>,
    pub status: Option<ItemStatus>,
    pub location: Option<String>,
}

impl InventoryFilters {
    pub fn matches(&self, item: &InventoryItem) -> bool {
        self.category.map_or(true, |c| item.category == c)
            && self.status.map_or(true, |s| item.status == s)
            && self
                .location
                .as_ref()
                .map_or(true, |l| item.location.as_ref() == Some(l))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAlert {
    pub item_id: String,
    pub item_name: String,
    #[serde(rename = "type")]
    pub kind: StockAlertKind,
    pub priority: NotificationPriority,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStats {
    pub total: usize,
    pub total_value: Money,
    pub by_category: HashMap<ItemCategory, usize>,
    pub by_status: HashMap<ItemStatus, usize>,
    /// Low-stock, out-of-stock and expired items.
    pub alert_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderSuggestion {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub recommended_order_quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn gloves(stock: u32) -> NewInventoryItem {
        NewInventoryItem {
            name: "Nitril Eldiven".into(),
            category: ItemCategory::Consumable,
            sku: Some("CON-001".into()),
            barcode: None,
            description: None,
            manufacturer: Some("MedSupply".into()),
            current_stock: stock,
            min_stock_level: 20,
            max_stock_level: 200,
            unit: "kutu".into(),
            unit_price: 12_500,
            expiry_date: None,
            location: Some("Depo A".into()),
            notes: None,
        }
    }

    #[test]
    fn status_derived_on_create() {
        let today = day(2024, 1, 15);
        let now = Utc::now();
        assert_eq!(
            gloves(0).into_item("a".into(), today, now).status,
            ItemStatus::OutOfStock
        );
        assert_eq!(
            gloves(20).into_item("b".into(), today, now).status,
            ItemStatus::LowStock
        );
        assert_eq!(
            gloves(21).into_item("c".into(), today, now).status,
            ItemStatus::InStock
        );
    }

    #[test]
    fn explicit_status_wins_over_rederivation() {
        let mut item = gloves(100).into_item("a".into(), day(2024, 1, 15), Utc::now());
        InventoryItemUpdate {
            current_stock: Some(0),
            status: Some(ItemStatus::InStock),
            ..Default::default()
        }
        .apply(&mut item)
        .unwrap();
        assert_eq!(item.current_stock, 0);
        assert_eq!(item.status, ItemStatus::InStock);
    }

    #[test]
    fn stock_change_rederives_status() {
        let mut item = gloves(100).into_item("a".into(), day(2024, 1, 15), Utc::now());
        InventoryItemUpdate {
            current_stock: Some(5),
            ..Default::default()
        }
        .apply(&mut item)
        .unwrap();
        assert_eq!(item.status, ItemStatus::LowStock);
    }

    #[test]
    fn reorder_suggestion_flattens_item() {
        let item = gloves(0).into_item("a".into(), day(2024, 1, 15), Utc::now());
        let json = serde_json::to_value(ReorderSuggestion {
            item,
            recommended_order_quantity: 200,
        })
        .unwrap();
        assert_eq!(json["name"], "Nitril Eldiven");
        assert_eq!(json["recommended_order_quantity"], 200);
    }

    #[test]
    fn stock_value_multiplies_unit_price() {
        let item = gloves(4).into_item("a".into(), day(2024, 1, 15), Utc::now());
        assert_eq!(item.stock_value(), 50_000);
    }
}
