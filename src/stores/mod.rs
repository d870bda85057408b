//! Per-domain reactive stores.
//!
//! Each store mirrors one or more `MockApi` collections through an
//! `EntityStore` and adds the domain operations and derived views on top.
//! Date-sensitive views take an explicit day or instant; the `*_today`
//! wrappers read the local clock.

use chrono::{Local, NaiveDate};
use uuid::Uuid;

use crate::mock_api::ApiError;
use crate::storage::StorageError;
use crate::validation::ValidationErrors;

/// Implements `Deref` to the wrapped `EntityStore` so the generic lifecycle,
/// filters and subscriptions are available on every domain store.
macro_rules! deref_entity_store {
    ($store:ty, $field:ident: $entity:ty, $filters:ty) => {
        impl std::ops::Deref for $store {
            type Target = crate::store::EntityStore<$entity, $filters>;

            fn deref(&self) -> &Self::Target {
                &self.$field
            }
        }
    };
}

pub mod appointments;
pub mod auth;
pub mod billing;
pub mod emr;
pub mod inventory;
pub mod notifications;
pub mod patients;
pub mod settings;
pub mod theme;
pub mod users;

pub use appointments::AppointmentStore;
pub use auth::{AuthError, AuthState, AuthStore};
pub use billing::BillingStore;
pub use emr::EmrStore;
pub use inventory::InventoryStore;
pub use notifications::NotificationStore;
pub use patients::PatientStore;
pub use settings::{AppSettings, SettingsStore};
pub use theme::{ThemeState, ThemeStore};
pub use users::UserStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("Insufficient stock for {item_id}: {available} available, {requested} requested")]
    InsufficientStock {
        item_id: String,
        available: u32,
        requested: u32,
    },
    #[error("No medical record found for patient {0}")]
    NoRecordForPatient(String),
    #[error("Prescription not found: {0}")]
    PrescriptionNotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::Api(ApiError::NotFound { .. })
                | StoreError::NoRecordForPatient(_)
                | StoreError::PrescriptionNotFound(_)
        )
    }
}

/// Fresh opaque record id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Today's date on the local clock.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_uuids() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn not_found_classification() {
        let err = StoreError::from(ApiError::NotFound {
            entity: "Patient",
            id: "p9".into(),
        });
        assert!(err.is_not_found());
        assert!(StoreError::NoRecordForPatient("p1".into()).is_not_found());
        assert!(!StoreError::InsufficientStock {
            item_id: "i1".into(),
            available: 1,
            requested: 2
        }
        .is_not_found());
    }
}
