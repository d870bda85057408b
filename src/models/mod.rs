//! Entity schemas for every clinic collection.
//!
//! Records are plain serde structs keyed by an opaque string id.
//! Relationships between collections are by id only.

/// Implements `mock_api::Entity` for a record with `id` and `updated_at` fields.
macro_rules! entity {
    ($ty:ty, $kind:literal) => {
        impl crate::mock_api::Entity for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn updated_at(&self) -> chrono::DateTime<chrono::Utc> {
                self.updated_at
            }

            fn set_updated_at(&mut self, at: chrono::DateTime<chrono::Utc>) {
                self.updated_at = at;
            }
        }
    };
}

/// Shallow merge of the `Some` fields of a partial update into a record.
/// Fields listed after `optional` are `Option` on the record too.
macro_rules! merge_fields {
    ($src:ident => $dst:ident; $($field:ident),* $(,)? $(; optional $($ofield:ident),* $(,)?)?) => {
        $(
            if let Some(value) = $src.$field {
                $dst.$field = value;
            }
        )*
        $($(
            if let Some(value) = $src.$ofield {
                $dst.$ofield = Some(value);
            }
        )*)?
    };
}

pub mod appointment;
pub mod billing;
pub mod common;
pub mod emr;
pub mod enums;
pub mod inventory;
pub mod notification;
pub mod patient;
pub mod user;

pub use appointment::*;
pub use billing::*;
pub use common::*;
pub use emr::*;
pub use enums::*;
pub use inventory::*;
pub use notification::*;
pub use patient::*;
pub use user::*;
