use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use super::auth::{email_in_use, Credentials};
use super::{new_id, StoreError};
use crate::mock_api::MockApi;
use crate::models::{NewUser, User, UserFilters, UserRole, UserUpdate};
use crate::store::{EntityState, EntityStore, Store};
use crate::validation::{FieldError, ValidationErrors};

pub type UserState = EntityState<User, UserFilters>;

pub struct UserStore {
    entities: EntityStore<User, UserFilters>,
    current: Store<Option<User>>,
    credentials: Arc<Credentials>,
    /// Held while an email is checked for uniqueness and written.
    emails: Mutex<()>,
}

deref_entity_store!(UserStore, entities: User, UserFilters);

impl UserStore {
    pub fn new(api: Arc<MockApi<User>>, credentials: Arc<Credentials>) -> Self {
        Self {
            entities: EntityStore::new(api),
            current: Store::new(None),
            credentials,
            emails: Mutex::new(()),
        }
    }

    /// Stores the user and registers the password for login. An email
    /// already held by another user is rejected.
    pub async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        new.validate()?;
        let _emails = self.emails.lock().await;
        if email_in_use(self.api(), &new.email, None) {
            return Err(email_taken().into());
        }
        let (user, password) = new.into_user(new_id(), Utc::now());
        let created = self.entities.insert(user).await?;
        self.credentials.set(&created.email, &password);
        tracing::info!(user_id = %created.id, role = %created.role, "user created");
        Ok(created)
    }

    /// A changed first or last name recomputes `full_name`; a changed email
    /// carries the stored credential along.
    pub async fn update_user(&self, id: &str, update: UserUpdate) -> Result<User, StoreError> {
        let _emails = self.emails.lock().await;
        if update
            .email
            .as_deref()
            .is_some_and(|email| email_in_use(self.api(), email, Some(id)))
        {
            return Err(email_taken().into());
        }
        let old_email = self.email_of(id);
        let updated = self.entities.patch(id, update).await?;
        if let Some(old) = old_email.filter(|old| *old != updated.email) {
            self.credentials.rename(&old, &updated.email);
        }
        self.current.update(|current| {
            if current.as_ref().is_some_and(|u| u.id == updated.id) {
                *current = Some(updated.clone());
            }
        });
        Ok(updated)
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        let email = self.email_of(id);
        self.entities.remove(id).await?;
        if let Some(email) = email {
            self.credentials.remove(&email);
        }
        self.current.update(|current| {
            if current.as_ref().is_some_and(|u| u.id == id) {
                *current = None;
            }
        });
        Ok(())
    }

    // ── Current user ────────────────────────────────────────

    pub fn set_current_user(&self, user: Option<User>) {
        self.current.set(user);
    }

    pub fn current_user(&self) -> Option<User> {
        self.current.get()
    }

    pub fn current(&self) -> &Store<Option<User>> {
        &self.current
    }

    // ── Derived views ───────────────────────────────────────

    pub fn filtered(&self) -> Vec<User> {
        self.store().with(|s| {
            let query = s.search_query.trim().to_lowercase();
            s.data
                .iter()
                .filter(|u| s.filters.matches(u))
                .filter(|u| {
                    query.is_empty()
                        || u.full_name.to_lowercase().contains(&query)
                        || u.email.to_lowercase().contains(&query)
                })
                .cloned()
                .collect()
        })
    }

    pub fn with_role(&self, role: UserRole) -> Vec<User> {
        self.store()
            .with(|s| s.data.iter().filter(|u| u.role == role).cloned().collect())
    }

    fn email_of(&self, id: &str) -> Option<String> {
        let cached = self
            .store()
            .with(|s| s.data.iter().find(|u| u.id == id).map(|u| u.email.clone()));
        cached.or_else(|| {
            self.api()
                .snapshot()
                .into_iter()
                .find(|u| u.id == id)
                .map(|u| u.email)
        })
    }
}

fn email_taken() -> ValidationErrors {
    ValidationErrors {
        errors: vec![FieldError {
            field: "email".into(),
            message: "is already in use".into(),
        }],
    }
}
