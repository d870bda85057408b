use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid value for {field}: {value}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The serde representation is the same string `as_str` returns.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

// ── Patients ────────────────────────────────────────────

str_enum!(Gender {
    Male => "male",
    Female => "female",
    Other => "other",
});

str_enum!(BloodType {
    APos => "A+",
    ANeg => "A-",
    BPos => "B+",
    BNeg => "B-",
    AbPos => "AB+",
    AbNeg => "AB-",
    OPos => "O+",
    ONeg => "O-",
});

str_enum!(PatientStatus {
    Active => "active",
    Inactive => "inactive",
    Deceased => "deceased",
});

str_enum!(InsuranceType {
    Sgk => "sgk",
    Private => "private",
    None => "none",
});

// ── Appointments ────────────────────────────────────────

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Confirmed => "confirmed",
    InProgress => "in-progress",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no-show",
});

str_enum!(AppointmentType {
    Consultation => "consultation",
    FollowUp => "follow-up",
    Emergency => "emergency",
    RoutineCheckup => "routine-checkup",
});

// ── Billing ─────────────────────────────────────────────

str_enum!(InvoiceStatus {
    Draft => "draft",
    Pending => "pending",
    Paid => "paid",
    Overdue => "overdue",
    Cancelled => "cancelled",
});

str_enum!(PaymentMethod {
    Cash => "cash",
    CreditCard => "credit-card",
    DebitCard => "debit-card",
    BankTransfer => "bank-transfer",
    Insurance => "insurance",
});

// ── EMR ─────────────────────────────────────────────────

str_enum!(DiagnosisSeverity {
    Mild => "mild",
    Moderate => "moderate",
    Severe => "severe",
});

str_enum!(DiagnosisStatus {
    Active => "active",
    Resolved => "resolved",
    Chronic => "chronic",
});

str_enum!(LabResultStatus {
    Normal => "normal",
    Abnormal => "abnormal",
    Critical => "critical",
});

// ── Inventory ───────────────────────────────────────────

str_enum!(ItemCategory {
    Medication => "medication",
    Equipment => "equipment",
    Consumable => "consumable",
    Other => "other",
});

str_enum!(ItemStatus {
    InStock => "in-stock",
    LowStock => "low-stock",
    OutOfStock => "out-of-stock",
    Expired => "expired",
});

str_enum!(StockMovementType {
    Purchase => "purchase",
    Usage => "usage",
    Adjustment => "adjustment",
    Return => "return",
    Disposal => "disposal",
});

str_enum!(StockAlertKind {
    OutOfStock => "out-of-stock",
    LowStock => "low-stock",
    Expired => "expired",
    ExpiringSoon => "expiring-soon",
});

// ── Notifications ───────────────────────────────────────

str_enum!(NotificationType {
    AppointmentReminder => "appointment-reminder",
    AppointmentConfirmed => "appointment-confirmed",
    AppointmentCancelled => "appointment-cancelled",
    PaymentReminder => "payment-reminder",
    PaymentReceived => "payment-received",
    LabResultReady => "lab-result-ready",
    PrescriptionReady => "prescription-ready",
    StockAlert => "stock-alert",
    System => "system",
    Other => "other",
});

str_enum!(NotificationPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

str_enum!(NotificationStatus {
    Unread => "unread",
    Read => "read",
    Archived => "archived",
});

// ── Users & preferences ─────────────────────────────────

str_enum!(UserRole {
    Admin => "admin",
    Doctor => "doctor",
    Nurse => "nurse",
    Receptionist => "receptionist",
    Pharmacist => "pharmacist",
});

str_enum!(UserStatus {
    Active => "active",
    Inactive => "inactive",
    Suspended => "suspended",
});

str_enum!(Theme {
    Light => "light",
    Dark => "dark",
    System => "system",
});

str_enum!(Language {
    Tr => "tr",
    En => "en",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kebab_case_values_round_trip_through_from_str() {
        assert_eq!(
            AppointmentStatus::from_str("no-show").unwrap(),
            AppointmentStatus::NoShow
        );
        assert_eq!(ItemStatus::OutOfStock.as_str(), "out-of-stock");
    }

    #[test]
    fn unknown_value_names_the_enum() {
        let err = InvoiceStatus::from_str("refunded").unwrap_err();
        assert_eq!(err.field, "InvoiceStatus");
        assert_eq!(err.value, "refunded");
    }

    #[test]
    fn serde_uses_wire_strings() {
        let json = serde_json::to_string(&PaymentMethod::CreditCard).unwrap();
        assert_eq!(json, "\"credit-card\"");
        let blood: BloodType = serde_json::from_str("\"AB-\"").unwrap();
        assert_eq!(blood, BloodType::AbNeg);
    }

    #[test]
    fn all_lists_every_variant() {
        assert_eq!(UserRole::ALL.len(), 5);
        assert!(NotificationStatus::ALL.contains(&NotificationStatus::Archived));
    }
}
