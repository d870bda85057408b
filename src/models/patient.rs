use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::common::{Contact, EmergencyContact};
use super::enums::{BloodType, Gender, InsuranceType, PatientStatus};
use crate::mock_api::{ApiError, Patch};
use crate::rules;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insurance {
    #[serde(rename = "type")]
    pub kind: InsuranceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_number: Option<String>,
}

impl Insurance {
    pub fn none() -> Self {
        Self {
            kind: InsuranceType::None,
            company: None,
            provider: None,
            policy_number: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalHistory {
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub past_illnesses: Vec<String>,
    #[serde(default)]
    pub surgeries: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub tc_no: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<BloodType>,
    pub status: PatientStatus,
    pub contact: Contact,
    pub emergency_contact: EmergencyContact,
    pub insurance: Insurance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<MedicalHistory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

entity!(Patient, "Patient");

/// Form payload for registering a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPatient {
    pub tc_no: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    #[serde(default)]
    pub blood_type: Option<BloodType>,
    #[serde(default = "default_patient_status")]
    pub status: PatientStatus,
    pub contact: Contact,
    pub emergency_contact: EmergencyContact,
    pub insurance: Insurance,
    #[serde(default)]
    pub medical_history: Option<MedicalHistory>,
    #[serde(default)]
    pub avatar: Option<String>,
}

fn default_patient_status() -> PatientStatus {
    PatientStatus::Active
}

impl NewPatient {
    pub fn into_patient(self, id: String, now: DateTime<Utc>) -> Patient {
        Patient {
            id,
            full_name: rules::full_name(&self.first_name, &self.last_name),
            tc_no: self.tc_no,
            first_name: self.first_name,
            last_name: self.last_name,
            birth_date: self.birth_date,
            gender: self.gender,
            blood_type: self.blood_type,
            status: self.status,
            contact: self.contact,
            emergency_contact: self.emergency_contact,
            insurance: self.insurance,
            medical_history: self.medical_history,
            avatar: self.avatar,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientUpdate {
    pub tc_no: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub blood_type: Option<BloodType>,
    pub status: Option<PatientStatus>,
    pub contact: Option<Contact>,
    pub emergency_contact: Option<EmergencyContact>,
    pub insurance: Option<Insurance>,
    pub medical_history: Option<MedicalHistory>,
    pub avatar: Option<String>,
}

impl Patch<Patient> for PatientUpdate {
    fn apply(self, patient: &mut Patient) -> Result<(), ApiError> {
        let renamed = self.first_name.is_some() || self.last_name.is_some();
        let src = self;
        merge_fields!(src => patient;
            tc_no, first_name, last_name, birth_date, gender, status,
            contact, emergency_contact, insurance;
            optional blood_type, medical_history, avatar);
        if renamed {
            patient.full_name = rules::full_name(&patient.first_name, &patient.last_name);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientFilters {
    pub status: Option<PatientStatus>,
    pub gender: Option<Gender>,
    pub insurance_type: Option<InsuranceType>,
}

impl PatientFilters {
    pub fn matches(&self, patient: &Patient) -> bool {
        self.status.map_or(true, |s| patient.status == s)
            && self.gender.map_or(true, |g| patient.gender == g)
            && self.insurance_type.map_or(true, |t| patient.insurance.kind == t)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub with_sgk: usize,
    pub with_private_insurance: usize,
    pub without_insurance: usize,
    pub new_this_month: usize,
    pub by_gender: HashMap<Gender, usize>,
    /// Mean age in whole years, 0 when there are no patients.
    pub average_age: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Patient {
        NewPatient {
            tc_no: "12345678901".into(),
            first_name: "Ayşe".into(),
            last_name: "Yılmaz".into(),
            birth_date: NaiveDate::from_ymd_opt(1985, 4, 12).unwrap(),
            gender: Gender::Female,
            blood_type: Some(BloodType::APos),
            status: PatientStatus::Active,
            contact: Contact {
                phone: "05321234567".into(),
                email: Some("ayse@example.com".into()),
                address: None,
            },
            emergency_contact: EmergencyContact {
                name: "Mehmet Yılmaz".into(),
                relationship: "Eş".into(),
                phone: "05329876543".into(),
            },
            insurance: Insurance::none(),
            medical_history: None,
            avatar: None,
        }
        .into_patient("p1".into(), Utc::now())
    }

    #[test]
    fn new_patient_derives_full_name() {
        assert_eq!(sample().full_name, "Ayşe Yılmaz");
    }

    #[test]
    fn renaming_recomputes_full_name() {
        let mut patient = sample();
        PatientUpdate {
            last_name: Some("Demir".into()),
            ..Default::default()
        }
        .apply(&mut patient)
        .unwrap();
        assert_eq!(patient.full_name, "Ayşe Demir");
        assert_eq!(patient.first_name, "Ayşe");
    }

    #[test]
    fn empty_update_leaves_record_untouched() {
        let mut patient = sample();
        let before = patient.clone();
        PatientUpdate::default().apply(&mut patient).unwrap();
        assert_eq!(patient, before);
    }

    #[test]
    fn filters_combine_with_and() {
        let patient = sample();
        let mut filters = PatientFilters {
            gender: Some(Gender::Female),
            ..Default::default()
        };
        assert!(filters.matches(&patient));
        filters.insurance_type = Some(InsuranceType::Sgk);
        assert!(!filters.matches(&patient));
    }

    #[test]
    fn insurance_kind_serializes_as_type() {
        let json = serde_json::to_value(Insurance::none()).unwrap();
        assert_eq!(json["type"], "none");
    }
}
