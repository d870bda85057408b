//! Generic in-memory collection service.
//!
//! `MockApi<T>` wraps one entity collection in an insertion-ordered map and
//! exposes CRUD, search and pagination behind an artificial latency. Failures
//! ("not found", "already exists") come back as `ApiError` values.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config;
use crate::models::{PaginatedResponse, PaginationParams, SearchParams, SortOrder};

// ═══════════════════════════════════════════════════════════
// Errors and response envelope
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },
    #[error("Invalid patch: {0}")]
    InvalidPatch(String),
}

impl ApiError {
    pub fn not_found<T: Entity>(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: T::KIND,
            id: id.into(),
        }
    }
}

/// Success flag plus optional payload, error and message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn failed(error: impl Display) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (_, _) => Err(self.error.unwrap_or_else(|| "Unknown error".into())),
        }
    }
}

impl ApiResponse<()> {
    pub fn done() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            message: None,
        }
    }
}

impl<T, E: Display> From<Result<T, E>> for ApiResponse<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failed(e),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Entity + Patch
// ═══════════════════════════════════════════════════════════

/// A record stored in a `MockApi` collection.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection name used in errors and logs.
    const KIND: &'static str;

    fn id(&self) -> &str;
    fn updated_at(&self) -> DateTime<Utc>;
    fn set_updated_at(&mut self, at: DateTime<Utc>);
}

/// Partial update merged into an existing record.
pub trait Patch<T> {
    fn apply(self, target: &mut T) -> Result<(), ApiError>;
}

/// Untyped patch: top-level JSON keys replace the record's fields.
/// The `id` key is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonPatch(pub serde_json::Map<String, Value>);

impl JsonPatch {
    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ApiError::InvalidPatch(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.0.insert(key.into(), value);
        self
    }
}

impl<T: Entity> Patch<T> for JsonPatch {
    fn apply(self, target: &mut T) -> Result<(), ApiError> {
        let mut current =
            serde_json::to_value(&*target).map_err(|e| ApiError::InvalidPatch(e.to_string()))?;
        let Some(fields) = current.as_object_mut() else {
            return Err(ApiError::InvalidPatch(format!(
                "{} does not serialize to an object",
                T::KIND
            )));
        };
        for (key, value) in self.0 {
            if key != "id" {
                fields.insert(key, value);
            }
        }
        *target =
            serde_json::from_value(current).map_err(|e| ApiError::InvalidPatch(e.to_string()))?;
        Ok(())
    }
}

/// In-place edit run under the collection's write lock, so a
/// read-modify-write on one record cannot interleave with another update.
pub struct Modify<F>(pub F);

impl<T: Entity, F: FnOnce(&mut T)> Patch<T> for Modify<F> {
    fn apply(self, target: &mut T) -> Result<(), ApiError> {
        (self.0)(target);
        Ok(())
    }
}

/// Fallible `Modify`: an `Err` leaves the stored record untouched.
pub struct TryModify<F>(pub F);

impl<T: Entity, F: FnOnce(&mut T) -> Result<(), ApiError>> Patch<T> for TryModify<F> {
    fn apply(self, target: &mut T) -> Result<(), ApiError> {
        (self.0)(target)
    }
}

// ═══════════════════════════════════════════════════════════
// MockApi
// ═══════════════════════════════════════════════════════════

struct Collection<T> {
    order: Vec<String>,
    items: HashMap<String, T>,
}

impl<T: Entity> Collection<T> {
    fn from_items(items: Vec<T>) -> Self {
        let mut collection = Self {
            order: Vec::with_capacity(items.len()),
            items: HashMap::with_capacity(items.len()),
        };
        for item in items {
            collection.upsert(item);
        }
        collection
    }

    /// Later duplicates replace the value but keep the first position.
    fn upsert(&mut self, item: T) {
        let id = item.id().to_string();
        if self.items.insert(id.clone(), item).is_none() {
            self.order.push(id);
        }
    }

    fn values(&self) -> Vec<T> {
        self.order
            .iter()
            .filter_map(|id| self.items.get(id))
            .cloned()
            .collect()
    }
}

pub struct MockApi<T: Entity> {
    data: RwLock<Collection<T>>,
    delay: Duration,
}

impl<T: Entity> MockApi<T> {
    /// Collection with the default latency.
    pub fn new(initial: Vec<T>) -> Self {
        Self::with_delay(initial, Duration::from_millis(config::MOCK_API_DELAY_MS))
    }

    pub fn with_delay(initial: Vec<T>, delay: Duration) -> Self {
        Self {
            data: RwLock::new(Collection::from_items(initial)),
            delay,
        }
    }

    /// Zero-latency collection, handy for tests and seeding.
    pub fn instant(initial: Vec<T>) -> Self {
        Self::with_delay(initial, Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn read(&self) -> RwLockReadGuard<'_, Collection<T>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Collection<T>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_delay(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    // ── Reads ───────────────────────────────────────────────

    pub async fn get_all(&self) -> Vec<T> {
        self.simulate_delay().await;
        self.read().values()
    }

    /// 1-indexed page. Out-of-range pages (including page 0) are empty.
    pub async fn get_paginated(&self, params: PaginationParams) -> PaginatedResponse<T> {
        self.simulate_delay().await;
        let all = self.read().values();
        let total = all.len();
        let (data, total_pages) = if params.limit == 0 {
            (Vec::new(), 0)
        } else {
            let start = params.page.checked_sub(1).map(|p| p.saturating_mul(params.limit));
            let page = match start {
                Some(start) if start < total => all
                    .into_iter()
                    .skip(start)
                    .take(params.limit)
                    .collect(),
                _ => Vec::new(),
            };
            (page, total.div_ceil(params.limit))
        };
        PaginatedResponse {
            data,
            total,
            page: params.page,
            limit: params.limit,
            total_pages,
        }
    }

    /// Substring query over the JSON form, exact-match filters, optional sort.
    pub async fn search(&self, params: SearchParams) -> Vec<T> {
        self.simulate_delay().await;
        let all = self.read().values();
        search_items(all, &params)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<T, ApiError> {
        self.simulate_delay().await;
        self.read()
            .items
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::not_found::<T>(id))
    }

    // ── Writes ──────────────────────────────────────────────

    pub async fn create(&self, item: T) -> Result<T, ApiError> {
        self.simulate_delay().await;
        let mut data = self.write();
        if data.items.contains_key(item.id()) {
            tracing::debug!(entity = T::KIND, id = item.id(), "create rejected: duplicate id");
            return Err(ApiError::AlreadyExists {
                entity: T::KIND,
                id: item.id().to_string(),
            });
        }
        tracing::debug!(entity = T::KIND, id = item.id(), "created");
        data.upsert(item.clone());
        Ok(item)
    }

    /// Shallow-merges `patch` and stamps `updated_at` strictly later than before.
    pub async fn update(&self, id: &str, patch: impl Patch<T>) -> Result<T, ApiError> {
        self.simulate_delay().await;
        let mut data = self.write();
        let current = data
            .items
            .get(id)
            .ok_or_else(|| ApiError::not_found::<T>(id))?;

        let previous = current.updated_at();
        let mut updated = current.clone();
        patch.apply(&mut updated)?;
        if updated.id() != id {
            return Err(ApiError::InvalidPatch(format!("patch changed id of {id}")));
        }
        updated.set_updated_at(next_timestamp(previous));

        data.items.insert(id.to_string(), updated.clone());
        tracing::debug!(entity = T::KIND, id, "updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.simulate_delay().await;
        let mut data = self.write();
        if data.items.remove(id).is_none() {
            return Err(ApiError::not_found::<T>(id));
        }
        data.order.retain(|k| k != id);
        tracing::debug!(entity = T::KIND, id, "deleted");
        Ok(())
    }

    // ── Utility (no latency) ────────────────────────────────

    /// Replaces the whole collection.
    pub fn set_data(&self, items: Vec<T>) {
        *self.write() = Collection::from_items(items);
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.read().values()
    }

    pub fn clear(&self) {
        let mut data = self.write();
        data.order.clear();
        data.items.clear();
    }

    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `now`, or one nanosecond after `previous` when the clock has not moved past it.
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    let floor = previous + chrono::Duration::nanoseconds(1);
    now.max(floor)
}

fn search_items<T: Entity>(items: Vec<T>, params: &SearchParams) -> Vec<T> {
    let query = params
        .query
        .as_deref()
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let mut results: Vec<(T, Value)> = items
        .into_iter()
        .filter_map(|item| serde_json::to_value(&item).ok().map(|v| (item, v)))
        .filter(|(_, json)| {
            query
                .as_ref()
                .map_or(true, |q| json.to_string().to_lowercase().contains(q))
        })
        .filter(|(_, json)| {
            params
                .filters
                .iter()
                .all(|(field, expected)| json.get(field) == Some(expected))
        })
        .collect();

    if let Some(sort) = &params.sort {
        results.sort_by(|(_, a), (_, b)| {
            let ord = compare_json(a.get(&sort.field), b.get(&sort.field));
            match sort.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
    }

    results.into_iter().map(|(item, _)| item).collect()
}

/// Numbers, strings and booleans compare naturally; anything else ties.
fn compare_json(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .zip(y.as_f64())
            .and_then(|(x, y)| x.partial_cmp(&y))
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SortSpec;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: String,
        value: i64,
        #[serde(default)]
        label: String,
        updated_at: DateTime<Utc>,
    }

    impl Entity for Row {
        const KIND: &'static str = "Row";

        fn id(&self) -> &str {
            &self.id
        }

        fn updated_at(&self) -> DateTime<Utc> {
            self.updated_at
        }

        fn set_updated_at(&mut self, at: DateTime<Utc>) {
            self.updated_at = at;
        }
    }

    fn row(id: &str, value: i64, label: &str) -> Row {
        Row {
            id: id.into(),
            value,
            label: label.into(),
            updated_at: Utc::now(),
        }
    }

    fn api(rows: Vec<Row>) -> MockApi<Row> {
        MockApi::instant(rows)
    }

    fn fixture() -> MockApi<Row> {
        api(vec![
            row("c", 3, "Kardiyoloji"),
            row("a", 1, "Dahiliye"),
            row("d", 2, "Ortopedi"),
            row("b", 2, "Göz"),
            row("e", 5, "KBB"),
        ])
    }

    #[tokio::test]
    async fn create_then_get_returns_equal_record() {
        let api = api(vec![]);
        let created = api.create(row("x", 7, "")).await.unwrap();
        assert_eq!(api.get_by_id("x").await.unwrap(), created);
    }

    #[tokio::test]
    async fn duplicate_create_fails_and_leaves_collection() {
        let api = fixture();
        let before = api.snapshot();
        let err = api.create(row("a", 99, "dup")).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::AlreadyExists {
                entity: "Row",
                id: "a".into()
            }
        );
        assert_eq!(api.snapshot(), before);
    }

    #[tokio::test]
    async fn update_missing_fails_and_leaves_collection() {
        let api = fixture();
        let before = api.snapshot();
        let err = api
            .update("zz", JsonPatch::default().set("value", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
        assert_eq!(api.snapshot(), before);
    }

    #[tokio::test]
    async fn update_merges_and_advances_updated_at() {
        let api = fixture();
        let before = api.get_by_id("c").await.unwrap();
        let after = api
            .update("c", JsonPatch::default().set("value", 30))
            .await
            .unwrap();
        assert_eq!(after.value, 30);
        assert_eq!(after.label, before.label);
        assert!(after.updated_at > before.updated_at);
    }

    #[tokio::test]
    async fn updated_at_advances_even_when_previous_is_in_the_future() {
        let mut future = row("f", 1, "");
        future.updated_at = Utc::now() + chrono::Duration::hours(1);
        let api = api(vec![future.clone()]);
        let after = api
            .update("f", JsonPatch::default().set("label", "x"))
            .await
            .unwrap();
        assert!(after.updated_at > future.updated_at);
    }

    #[tokio::test]
    async fn seeded_value_update_example() {
        let api = api(vec![row("a", 1, "")]);
        let updated = api
            .update("a", JsonPatch::default().set("value", 2))
            .await
            .unwrap();
        assert_eq!(updated.value, 2);
        assert_eq!(updated.id, "a");
        assert_eq!(api.get_by_id("a").await.unwrap(), updated);
    }

    #[tokio::test]
    async fn modify_edits_in_place() {
        let api = fixture();
        let updated = api
            .update("e", Modify(|r: &mut Row| r.value += 10))
            .await
            .unwrap();
        assert_eq!(updated.value, 15);
        assert_eq!(updated.label, "KBB");
    }

    #[tokio::test]
    async fn json_patch_ignores_id() {
        let api = fixture();
        let updated = api
            .update("a", JsonPatch::default().set("id", "hijack").set("value", 4))
            .await
            .unwrap();
        assert_eq!(updated.id, "a");
        assert!(api.get_by_id("hijack").await.is_err());
    }

    #[tokio::test]
    async fn json_patch_with_wrong_type_is_rejected() {
        let api = fixture();
        let before = api.snapshot();
        let err = api
            .update("a", JsonPatch::default().set("value", "not a number"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidPatch(_)));
        assert_eq!(api.snapshot(), before);
    }

    #[tokio::test]
    async fn try_modify_error_leaves_record_unchanged() {
        let api = fixture();
        let before = api.get_by_id("a").await.unwrap();
        let err = api
            .update(
                "a",
                TryModify(|r: &mut Row| {
                    r.value = 99;
                    Err(ApiError::InvalidPatch("refused".into()))
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidPatch(_)));
        assert_eq!(api.get_by_id("a").await.unwrap(), before);

        let ok = api
            .update(
                "a",
                TryModify(|r: &mut Row| {
                    r.value += 1;
                    Ok(())
                }),
            )
            .await
            .unwrap();
        assert_eq!(ok.value, before.value + 1);
    }

    #[tokio::test]
    async fn delete_twice_succeeds_once() {
        let api = fixture();
        assert!(api.delete("d").await.is_ok());
        assert!(matches!(
            api.delete("d").await,
            Err(ApiError::NotFound { .. })
        ));
        assert_eq!(api.len(), 4);
    }

    #[tokio::test]
    async fn get_all_keeps_insertion_order() {
        let api = fixture();
        let ids: Vec<_> = api.get_all().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["c", "a", "d", "b", "e"]);
        api.delete("a").await.unwrap();
        api.create(row("a", 1, "")).await.unwrap();
        let ids: Vec<_> = api.get_all().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["c", "d", "b", "e", "a"]);
    }

    #[tokio::test]
    async fn pages_concatenate_to_get_all() {
        let api = fixture();
        for limit in 1..=6 {
            let first = api
                .get_paginated(PaginationParams { page: 1, limit })
                .await;
            let mut joined = Vec::new();
            for page in 1..=first.total_pages {
                joined.extend(api.get_paginated(PaginationParams { page, limit }).await.data);
            }
            assert_eq!(joined, api.get_all().await, "limit {limit}");
        }
    }

    #[tokio::test]
    async fn pagination_edges() {
        let api = fixture();
        let page = api.get_paginated(PaginationParams { page: 2, limit: 2 }).await;
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.data.len(), 2);

        let beyond = api.get_paginated(PaginationParams { page: 4, limit: 2 }).await;
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.total_pages, 3);

        let zero_page = api.get_paginated(PaginationParams { page: 0, limit: 2 }).await;
        assert!(zero_page.data.is_empty());

        let zero_limit = api.get_paginated(PaginationParams { page: 1, limit: 0 }).await;
        assert!(zero_limit.data.is_empty());
        assert_eq!(zero_limit.total_pages, 0);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_over_json() {
        let api = fixture();
        let hits = api.search(SearchParams::query("kardiyo")).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "c");
        assert_eq!(api.search(SearchParams::default()).await.len(), 5);
    }

    #[tokio::test]
    async fn filters_are_exact_equality() {
        let api = fixture();
        let hits = api.search(SearchParams::default().filter("value", 2)).await;
        let ids: Vec<_> = hits.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["d", "b"]);
        assert!(api
            .search(SearchParams::default().filter("missing", 2))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn sort_is_stable_both_ways() {
        let api = fixture();
        let asc: Vec<_> = api
            .search(SearchParams::default().sorted(SortSpec::asc("value")))
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(asc, ["a", "d", "b", "c", "e"]);
        let desc: Vec<_> = api
            .search(SearchParams::default().sorted(SortSpec::desc("value")))
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(desc, ["e", "c", "d", "b", "a"]);
    }

    #[tokio::test]
    async fn sort_on_unknown_field_keeps_order() {
        let api = fixture();
        let ids: Vec<_> = api
            .search(SearchParams::default().sorted(SortSpec::asc("nope")))
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["c", "a", "d", "b", "e"]);
    }

    #[tokio::test]
    async fn set_data_replaces_and_dedupes() {
        let api = fixture();
        api.set_data(vec![row("x", 1, ""), row("y", 2, ""), row("x", 3, "")]);
        let all = api.get_all().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "x");
        assert_eq!(all[0].value, 3);
        api.clear();
        assert!(api.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn operations_wait_for_configured_delay() {
        let api = MockApi::with_delay(vec![row("a", 1, "")], Duration::from_millis(300));
        let started = tokio::time::Instant::now();
        api.get_by_id("a").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(api.delay(), Duration::from_millis(300));
    }

    #[test]
    fn response_envelope_from_result() {
        let ok: ApiResponse<i32> = Ok::<_, ApiError>(5).into();
        assert!(ok.success);
        assert_eq!(ok.data, Some(5));

        let failed: ApiResponse<i32> = Err(ApiError::not_found::<Row>("q")).into();
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("Row not found: q"));
        assert_eq!(failed.into_result(), Err("Row not found: q".to_string()));
    }

    #[test]
    fn json_patch_rejects_non_objects() {
        assert!(JsonPatch::from_value(serde_json::json!([1, 2])).is_err());
        assert!(JsonPatch::from_value(serde_json::json!({"a": 1})).is_ok());
    }
}
