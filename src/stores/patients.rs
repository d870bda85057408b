use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};

use super::{local_today, new_id, StoreError};
use crate::mock_api::MockApi;
use crate::models::{
    InsuranceType, NewPatient, Patient, PatientFilters, PatientStats, PatientStatus, PatientUpdate,
};
use crate::rules;
use crate::store::{EntityState, EntityStore};

pub type PatientState = EntityState<Patient, PatientFilters>;

pub struct PatientStore {
    entities: EntityStore<Patient, PatientFilters>,
}

deref_entity_store!(PatientStore, entities: Patient, PatientFilters);

impl PatientStore {
    pub fn new(api: Arc<MockApi<Patient>>) -> Self {
        Self {
            entities: EntityStore::new(api),
        }
    }

    pub async fn create(&self, new: NewPatient) -> Result<Patient, StoreError> {
        new.validate()?;
        let patient = new.into_patient(new_id(), Utc::now());
        self.entities.insert(patient).await
    }

    pub async fn update(&self, id: &str, update: PatientUpdate) -> Result<Patient, StoreError> {
        self.entities.patch(id, update).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.entities.remove(id).await
    }

    // ── Derived views ───────────────────────────────────────

    /// Patients matching the search query (name, T.C. number, phone, email)
    /// and the active filters, in list order.
    pub fn filtered(&self) -> Vec<Patient> {
        self.store().with(|s| {
            let query = s.search_query.trim().to_lowercase();
            s.data
                .iter()
                .filter(|p| query.is_empty() || matches_query(p, &query))
                .filter(|p| s.filters.matches(p))
                .cloned()
                .collect()
        })
    }

    pub fn stats_on(&self, today: NaiveDate) -> PatientStats {
        self.store().with(|s| patient_stats(&s.data, today))
    }

    pub fn stats(&self) -> PatientStats {
        self.stats_on(local_today())
    }
}

fn matches_query(patient: &Patient, query: &str) -> bool {
    patient.full_name.to_lowercase().contains(query)
        || patient.tc_no.contains(query)
        || patient.contact.phone.contains(query)
        || patient
            .contact
            .email
            .as_deref()
            .is_some_and(|e| e.to_lowercase().contains(query))
}

fn patient_stats(patients: &[Patient], today: NaiveDate) -> PatientStats {
    let mut stats = PatientStats {
        total: patients.len(),
        ..PatientStats::default()
    };
    let mut age_sum = 0u64;

    for p in patients {
        match p.status {
            PatientStatus::Active => stats.active += 1,
            PatientStatus::Inactive => stats.inactive += 1,
            PatientStatus::Deceased => {}
        }
        match p.insurance.kind {
            InsuranceType::Sgk => stats.with_sgk += 1,
            InsuranceType::Private => stats.with_private_insurance += 1,
            InsuranceType::None => stats.without_insurance += 1,
        }
        let created = p.created_at.date_naive();
        if created.year() == today.year() && created.month() == today.month() {
            stats.new_this_month += 1;
        }
        *stats.by_gender.entry(p.gender).or_insert(0) += 1;
        age_sum += u64::from(rules::age_on(p.birth_date, today));
    }

    if !patients.is_empty() {
        let mean = age_sum as f64 / patients.len() as f64;
        stats.average_age = (mean * 10.0).round() / 10.0;
    }
    stats
}
