//! Form-level validation for the `New*` payloads.
//!
//! Each payload reports every failing field at once. These checks run at the
//! point of creation in the stores; `MockApi` itself never validates.

use std::fmt;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde::Serialize;

use crate::models::{
    LoginCredentials, NewAppointment, NewInventoryItem, NewInvoice, NewMedicalRecord, NewPatient,
    NewPayment, NewStockMovement, NewUser, TAX_RATES,
};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 50;
pub const MIN_PHONE_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "Validation failed: {}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.fail(field, message);
        }
    }

    fn required(&mut self, field: &str, value: &str) {
        self.check(!value.trim().is_empty(), field, "is required");
    }

    fn min_len(&mut self, field: &str, value: &str, min: usize) {
        if value.trim().chars().count() < min {
            self.fail(field, format!("must be at least {min} characters"));
        }
    }

    fn email(&mut self, field: &str, value: &str) {
        self.check(is_valid_email(value), field, "is not a valid email address");
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                errors: self.errors,
            })
        }
    }
}

impl NewPatient {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::default();
        c.required("tc_no", &self.tc_no);
        c.min_len("first_name", &self.first_name, 2);
        c.min_len("last_name", &self.last_name, 2);
        c.check(
            self.birth_date <= Utc::now().date_naive(),
            "birth_date",
            "cannot be in the future",
        );
        c.min_len("contact.phone", &self.contact.phone, MIN_PHONE_LEN);
        if let Some(email) = self.contact.email.as_deref().filter(|e| !e.is_empty()) {
            c.email("contact.email", email);
        }
        if let Some(address) = &self.contact.address {
            c.min_len("contact.address.street", &address.street, 3);
            c.min_len("contact.address.city", &address.city, 2);
        }
        c.min_len("emergency_contact.name", &self.emergency_contact.name, 3);
        c.min_len(
            "emergency_contact.relationship",
            &self.emergency_contact.relationship,
            2,
        );
        c.min_len(
            "emergency_contact.phone",
            &self.emergency_contact.phone,
            MIN_PHONE_LEN,
        );
        c.finish()
    }
}

impl NewAppointment {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::default();
        c.required("patient_id", &self.patient_id);
        c.required("doctor_id", &self.doctor_id);
        c.min_len("reason", &self.reason, 5);
        if self.duration == 0 {
            c.fail("duration", "must be positive");
        } else {
            let end = crate::rules::appointment_end_time(self.start_time, self.duration);
            c.check(end > self.start_time, "end_time", "must be after start_time");
        }
        c.finish()
    }
}

impl NewInvoice {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::default();
        c.required("patient_id", &self.patient_id);
        c.check(!self.items.is_empty(), "items", "must contain at least one item");
        for (i, item) in self.items.iter().enumerate() {
            c.min_len(&format!("items[{i}].description"), &item.description, 3);
            c.check(
                item.quantity >= 1,
                &format!("items[{i}].quantity"),
                "must be at least 1",
            );
            c.check(
                item.unit_price >= 0,
                &format!("items[{i}].unit_price"),
                "cannot be negative",
            );
            c.check(
                TAX_RATES.contains(&item.tax_rate),
                &format!("items[{i}].tax_rate"),
                "must be one of 0, 1, 8, 18",
            );
        }
        if let Some(due) = self.due_date {
            c.check(due >= self.issue_date, "due_date", "must not precede issue_date");
        }
        c.finish()
    }
}

impl NewPayment {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::default();
        c.required("invoice_id", &self.invoice_id);
        c.check(self.amount > 0, "amount", "must be positive");
        c.finish()
    }
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::default();
        c.email("email", &self.email);
        let len = self.password.chars().count();
        if len < MIN_PASSWORD_LEN {
            c.fail("password", format!("must be at least {MIN_PASSWORD_LEN} characters"));
        } else if len > MAX_PASSWORD_LEN {
            c.fail("password", format!("must be at most {MAX_PASSWORD_LEN} characters"));
        }
        c.min_len("first_name", &self.first_name, 2);
        c.min_len("last_name", &self.last_name, 2);
        c.finish()
    }
}

impl NewInventoryItem {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::default();
        c.min_len("name", &self.name, 2);
        c.required("unit", &self.unit);
        c.check(self.unit_price > 0, "unit_price", "must be positive");
        c.check(
            self.max_stock_level >= self.min_stock_level,
            "max_stock_level",
            "must not be below min_stock_level",
        );
        c.finish()
    }
}

impl NewStockMovement {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::default();
        c.check(self.quantity > 0, "quantity", "must be positive");
        c.finish()
    }
}

impl NewMedicalRecord {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::default();
        c.required("patient_id", &self.patient_id);
        c.required("doctor_id", &self.doctor_id);
        c.min_len("chief_complaint", &self.chief_complaint, 5);
        c.min_len("assessment", &self.assessment, 5);
        c.min_len("plan", &self.plan, 5);
        c.finish()
    }
}

impl LoginCredentials {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::default();
        c.email("email", &self.email);
        c.required("password", &self.password);
        c.finish()
    }
}
