use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;

use super::{new_id, StoreError};
use crate::mock_api::MockApi;
use crate::models::{
    NewNotification, Notification, NotificationFilters, NotificationStatus, NotificationUpdate,
};
use crate::store::{EntityState, EntityStore};

/// Size of the recent-notifications list.
pub const RECENT_NOTIFICATIONS_LIMIT: usize = 10;

pub type NotificationState = EntityState<Notification, NotificationFilters>;

pub struct NotificationStore {
    entities: EntityStore<Notification, NotificationFilters>,
}

deref_entity_store!(NotificationStore, entities: Notification, NotificationFilters);

impl NotificationStore {
    pub fn new(api: Arc<MockApi<Notification>>) -> Self {
        Self {
            entities: EntityStore::new(api),
        }
    }

    /// New notifications go to the head of the list.
    pub async fn create(&self, new: NewNotification) -> Result<Notification, StoreError> {
        let notification = new.into_notification(new_id(), Utc::now());
        self.entities.insert_front(notification).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.entities.remove(id).await
    }

    // ── Status changes (no loading transition) ──────────────

    pub async fn mark_as_read(&self, id: &str) -> Result<Notification, StoreError> {
        let updated = self
            .api()
            .update(id, NotificationUpdate::read(Utc::now()))
            .await?;
        self.apply_local(&updated);
        Ok(updated)
    }

    /// Marks every id concurrently. Unknown ids are skipped; returns how
    /// many were updated.
    pub async fn mark_multiple_as_read(&self, ids: &[String]) -> usize {
        let mut tasks = JoinSet::new();
        for id in ids {
            let api = Arc::clone(self.api());
            let id = id.clone();
            tasks.spawn(async move { api.update(&id, NotificationUpdate::read(Utc::now())).await });
        }

        let mut updated = Vec::with_capacity(ids.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(notification)) => updated.push(notification),
                Ok(Err(e)) => tracing::debug!(error = %e, "mark as read skipped"),
                Err(e) => tracing::warn!(error = %e, "mark as read task failed"),
            }
        }

        let count = updated.len();
        self.store().update(|s| {
            for n in updated {
                if let Some(slot) = s.data.iter_mut().find(|d| d.id == n.id) {
                    *slot = n;
                }
            }
        });
        count
    }

    pub async fn mark_all_as_read(&self) -> usize {
        let unread: Vec<String> = self.store().with(|s| {
            s.data
                .iter()
                .filter(|n| n.is_unread())
                .map(|n| n.id.clone())
                .collect()
        });
        self.mark_multiple_as_read(&unread).await
    }

    pub async fn archive(&self, id: &str) -> Result<Notification, StoreError> {
        let updated = self.api().update(id, NotificationUpdate::archived()).await?;
        self.apply_local(&updated);
        Ok(updated)
    }

    /// Deletes every notification that is archived in the current state.
    /// Returns how many were removed from the collection.
    pub async fn clear_archived(&self) -> usize {
        let archived: HashSet<String> = self.store().with(|s| {
            s.data
                .iter()
                .filter(|n| n.status == NotificationStatus::Archived)
                .map(|n| n.id.clone())
                .collect()
        });

        let mut removed = 0;
        for id in &archived {
            match self.api().delete(id).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::debug!(error = %e, "archived notification already gone"),
            }
        }
        self.store().update(|s| s.data.retain(|n| !archived.contains(&n.id)));
        removed
    }

    // ── Derived views ───────────────────────────────────────

    pub fn filtered(&self) -> Vec<Notification> {
        self.store().with(|s| {
            s.data
                .iter()
                .filter(|n| s.filters.matches(n))
                .cloned()
                .collect()
        })
    }

    pub fn unread_count(&self) -> usize {
        self.store()
            .with(|s| s.data.iter().filter(|n| n.is_unread()).count())
    }

    /// Unread notifications, newest first.
    pub fn unread(&self) -> Vec<Notification> {
        self.unread_where(|_| true)
    }

    pub fn unread_for(&self, user_id: &str) -> Vec<Notification> {
        self.unread_where(|n| n.user_id == user_id)
    }

    pub fn recent(&self) -> Vec<Notification> {
        let mut unread = self.unread();
        unread.truncate(RECENT_NOTIFICATIONS_LIMIT);
        unread
    }

    fn unread_where(&self, keep: impl Fn(&Notification) -> bool) -> Vec<Notification> {
        let mut unread: Vec<Notification> = self.store().with(|s| {
            s.data
                .iter()
                .filter(|n| n.is_unread() && keep(n))
                .cloned()
                .collect()
        });
        unread.sort_by_key(|n| Reverse(n.created_at));
        unread
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use chrono::Duration;

    fn note(user: &str, title: &str) -> NewNotification {
        NewNotification {
            user_id: user.into(),
            kind: NotificationType::AppointmentReminder,
            priority: NotificationPriority::Medium,
            title: title.into(),
            message: "Yarın saat 10:00 randevunuz var".into(),
            data: Some(serde_json::json!({ "appointment_id": "a1" })),
            action_url: None,
        }
    }

    fn empty_store() -> NotificationStore {
        NotificationStore::new(Arc::new(MockApi::instant(vec![])))
    }

    #[tokio::test]
    async fn create_prepends_as_unread() {
        let store = empty_store();
        store.create(note("u1", "ilk")).await.unwrap();
        let second = store.create(note("u1", "ikinci")).await.unwrap();
        assert_eq!(store.data()[0], second);
        assert_eq!(second.status, NotificationStatus::Unread);
        assert_eq!(store.unread_count(), 2);
    }

    #[tokio::test]
    async fn mark_read_and_archive() {
        let store = empty_store();
        let n = store.create(note("u1", "x")).await.unwrap();
        let read = store.mark_as_read(&n.id).await.unwrap();
        assert_eq!(read.status, NotificationStatus::Read);
        assert!(read.read_at.is_some());
        assert_eq!(store.unread_count(), 0);

        let archived = store.archive(&n.id).await.unwrap();
        assert_eq!(store.data()[0], archived);
        assert!(store.mark_as_read("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn mark_multiple_counts_successes() {
        let store = empty_store();
        let a = store.create(note("u1", "a")).await.unwrap();
        let b = store.create(note("u1", "b")).await.unwrap();
        store.create(note("u1", "c")).await.unwrap();

        let count = store
            .mark_multiple_as_read(&[a.id.clone(), "ghost".into(), b.id.clone()])
            .await;
        assert_eq!(count, 2);
        assert_eq!(store.unread_count(), 1);

        assert_eq!(store.mark_all_as_read().await, 1);
        assert_eq!(store.unread_count(), 0);
        assert_eq!(store.mark_all_as_read().await, 0);
    }

    #[tokio::test]
    async fn clear_archived_uses_current_state() {
        let store = empty_store();
        let a = store.create(note("u1", "a")).await.unwrap();
        store.create(note("u1", "b")).await.unwrap();
        store.archive(&a.id).await.unwrap();

        assert_eq!(store.clear_archived().await, 1);
        assert_eq!(store.data().len(), 1);
        assert_eq!(store.api().len(), 1);
        assert_eq!(store.clear_archived().await, 0);
    }

    #[tokio::test]
    async fn unread_views_sort_newest_first_and_filter_by_user() {
        let now = Utc::now();
        let items: Vec<Notification> = (0..12)
            .map(|i| {
                let user = if i % 2 == 0 { "u1" } else { "u2" };
                note(user, &format!("n{i}"))
                    .into_notification(format!("n{i}"), now - Duration::minutes(i))
            })
            .collect();
        let store = NotificationStore::new(Arc::new(MockApi::instant(items)));

        let recent = store.recent();
        assert_eq!(recent.len(), RECENT_NOTIFICATIONS_LIMIT);
        assert_eq!(recent[0].id, "n0");
        assert_eq!(recent[9].id, "n9");

        let mine = store.unread_for("u2");
        assert_eq!(mine.len(), 6);
        assert!(mine.iter().all(|n| n.user_id == "u2"));

        store.set_filters(NotificationFilters {
            status: Some(NotificationStatus::Read),
            ..Default::default()
        });
        assert!(store.filtered().is_empty());
    }
}
