use std::cmp::Reverse;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use super::{new_id, StoreError};
use crate::mock_api::{ApiError, MockApi, Modify, Patch, TryModify};
use crate::models::{
    EmrStats, MedicalRecord, MedicalRecordUpdate, NewMedicalRecord, Prescription,
    PrescriptionUpdate, RecordFilters, SearchParams,
};
use crate::store::{EntityState, EntityStore};

/// Size of the recent-records list.
pub const RECENT_RECORDS_LIMIT: usize = 10;

pub type EmrState = EntityState<MedicalRecord, RecordFilters>;

pub struct EmrStore {
    entities: EntityStore<MedicalRecord, RecordFilters>,
}

deref_entity_store!(EmrStore, entities: MedicalRecord, RecordFilters);

impl EmrStore {
    pub fn new(api: Arc<MockApi<MedicalRecord>>) -> Self {
        Self {
            entities: EntityStore::new(api),
        }
    }

    pub async fn create(&self, new: NewMedicalRecord) -> Result<MedicalRecord, StoreError> {
        new.validate()?;
        let record = new.into_record(new_id(), Utc::now());
        self.entities.insert(record).await
    }

    pub async fn update(
        &self,
        id: &str,
        update: MedicalRecordUpdate,
    ) -> Result<MedicalRecord, StoreError> {
        self.entities.patch(id, update).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.entities.remove(id).await
    }

    /// The patient's records from the collection, newest visit first.
    pub async fn records_for_patient(&self, patient_id: &str) -> Vec<MedicalRecord> {
        let mut records = self
            .api()
            .search(SearchParams::default().filter("patient_id", patient_id))
            .await;
        records.sort_by_key(|r| Reverse(r.visit_date));
        records
    }

    // ── Prescriptions ───────────────────────────────────────

    pub async fn get_prescription(
        &self,
        patient_id: &str,
        prescription_id: &str,
    ) -> Result<Prescription, StoreError> {
        self.records_for_patient(patient_id)
            .await
            .iter()
            .find_map(|r| r.prescription(prescription_id).cloned())
            .ok_or_else(|| StoreError::PrescriptionNotFound(prescription_id.to_string()))
    }

    /// Appends to the patient's latest record. An empty id is replaced with
    /// a fresh one.
    pub async fn add_prescription(
        &self,
        patient_id: &str,
        mut prescription: Prescription,
    ) -> Result<MedicalRecord, StoreError> {
        let latest = self
            .records_for_patient(patient_id)
            .await
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NoRecordForPatient(patient_id.to_string()))?;
        if prescription.id.is_empty() {
            prescription.id = new_id();
        }
        self.entities
            .patch(
                &latest.id,
                Modify(move |r: &mut MedicalRecord| r.prescriptions.push(prescription)),
            )
            .await
    }

    /// Merges `update` into the prescription wherever it lives among the
    /// patient's records.
    pub async fn update_prescription(
        &self,
        patient_id: &str,
        prescription_id: &str,
        update: PrescriptionUpdate,
    ) -> Result<MedicalRecord, StoreError> {
        let records = self.records_for_patient(patient_id).await;
        if records.is_empty() {
            return Err(StoreError::NoRecordForPatient(patient_id.to_string()));
        }
        let record_id = records
            .iter()
            .find(|r| r.prescription(prescription_id).is_some())
            .map(|r| r.id.clone())
            .ok_or_else(|| StoreError::PrescriptionNotFound(prescription_id.to_string()))?;

        // The prescription is looked up again under the write lock, so a
        // concurrent edit to the same record is never overwritten.
        let mut missing = false;
        let result = self
            .entities
            .patch(
                &record_id,
                TryModify(|r: &mut MedicalRecord| {
                    match r.prescriptions.iter_mut().find(|p| p.id == prescription_id) {
                        Some(p) => update.apply(p),
                        None => {
                            missing = true;
                            Err(ApiError::InvalidPatch("prescription removed".into()))
                        }
                    }
                }),
            )
            .await;
        match result {
            Err(_) if missing => Err(StoreError::PrescriptionNotFound(prescription_id.to_string())),
            other => other,
        }
    }

    // ── Filter shortcuts ────────────────────────────────────

    pub fn filter_by_patient(&self, patient_id: impl Into<String>) {
        let patient_id = patient_id.into();
        self.update_filters(|f| f.patient_id = Some(patient_id));
    }

    pub fn filter_by_doctor(&self, doctor_id: impl Into<String>) {
        let doctor_id = doctor_id.into();
        self.update_filters(|f| f.doctor_id = Some(doctor_id));
    }

    /// Inclusive range of visit days.
    pub fn filter_by_date_range(&self, from: NaiveDate, to: NaiveDate) {
        self.update_filters(|f| {
            f.date_from = Some(from);
            f.date_to = Some(to);
        });
    }

    // ── Derived views ───────────────────────────────────────

    pub fn filtered(&self) -> Vec<MedicalRecord> {
        self.store().with(|s| {
            s.data
                .iter()
                .filter(|r| s.filters.matches(r))
                .cloned()
                .collect()
        })
    }

    pub fn recent(&self) -> Vec<MedicalRecord> {
        let mut records = self.data();
        records.sort_by_key(|r| Reverse(r.visit_date));
        records.truncate(RECENT_RECORDS_LIMIT);
        records
    }

    pub fn stats(&self) -> EmrStats {
        self.store().with(|s| EmrStats {
            total: s.data.len(),
            with_prescriptions: s.data.iter().filter(|r| !r.prescriptions.is_empty()).count(),
            with_lab_results: s.data.iter().filter(|r| !r.lab_results.is_empty()).count(),
            with_procedures: s.data.iter().filter(|r| !r.procedures.is_empty()).count(),
        })
    }
}
