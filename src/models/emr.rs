use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{DiagnosisSeverity, DiagnosisStatus, LabResultStatus};
use crate::mock_api::{ApiError, Patch};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalSigns {
    /// Celsius.
    pub temperature: Option<f64>,
    pub blood_pressure_systolic: Option<u32>,
    pub blood_pressure_diastolic: Option<u32>,
    /// Beats per minute.
    pub heart_rate: Option<u32>,
    pub respiratory_rate: Option<u32>,
    /// Percent.
    pub oxygen_saturation: Option<f64>,
    /// Kilograms.
    pub weight: Option<f64>,
    /// Centimetres.
    pub height: Option<f64>,
    pub bmi: Option<f64>,
}

impl VitalSigns {
    /// BMI from weight and height, rounded to one decimal.
    pub fn computed_bmi(&self) -> Option<f64> {
        let (weight, height) = (self.weight?, self.height?);
        if height <= 0.0 {
            return None;
        }
        let metres = height / 100.0;
        Some((weight / (metres * metres) * 10.0).round() / 10.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: String,
    /// ICD-10 code.
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<DiagnosisSeverity>,
    pub status: DiagnosisStatus,
    pub diagnosed_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub id: String,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: String,
    pub medications: Vec<Medication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub prescribed_date: NaiveDate,
    pub prescribed_by: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrescriptionUpdate {
    pub medications: Option<Vec<Medication>>,
    pub notes: Option<String>,
    pub prescribed_date: Option<NaiveDate>,
    pub prescribed_by: Option<String>,
}

impl Patch<Prescription> for PrescriptionUpdate {
    fn apply(self, prescription: &mut Prescription) -> Result<(), ApiError> {
        let src = self;
        merge_fields!(src => prescription;
            medications, prescribed_date, prescribed_by;
            optional notes);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabResult {
    pub id: String,
    pub test_name: String,
    pub test_type: String,
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_range: Option<String>,
    pub status: LabResultStatus,
    pub test_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: String,
    pub patient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,
    pub doctor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    pub visit_date: DateTime<Utc>,
    pub chief_complaint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub present_illness: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_examination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vital_signs: Option<VitalSigns>,
    #[serde(default)]
    pub diagnoses: Vec<Diagnosis>,
    #[serde(default)]
    pub prescriptions: Vec<Prescription>,
    #[serde(default)]
    pub lab_results: Vec<LabResult>,
    #[serde(default)]
    pub procedures: Vec<String>,
    pub assessment: String,
    pub plan: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

entity!(MedicalRecord, "MedicalRecord");

impl MedicalRecord {
    pub fn prescription(&self, prescription_id: &str) -> Option<&Prescription> {
        self.prescriptions.iter().find(|p| p.id == prescription_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMedicalRecord {
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub appointment_id: Option<String>,
    pub doctor_id: String,
    #[serde(default)]
    pub doctor_name: Option<String>,
    pub visit_date: DateTime<Utc>,
    pub chief_complaint: String,
    #[serde(default)]
    pub present_illness: Option<String>,
    #[serde(default)]
    pub physical_examination: Option<String>,
    #[serde(default)]
    pub vital_signs: Option<VitalSigns>,
    #[serde(default)]
    pub diagnoses: Vec<Diagnosis>,
    #[serde(default)]
    pub prescriptions: Vec<Prescription>,
    #[serde(default)]
    pub lab_results: Vec<LabResult>,
    #[serde(default)]
    pub procedures: Vec<String>,
    pub assessment: String,
    pub plan: String,
    #[serde(default)]
    pub follow_up_instructions: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewMedicalRecord {
    pub fn into_record(self, id: String, now: DateTime<Utc>) -> MedicalRecord {
        let vital_signs = self.vital_signs.map(|mut v| {
            if v.bmi.is_none() {
                v.bmi = v.computed_bmi();
            }
            v
        });
        MedicalRecord {
            id,
            patient_id: self.patient_id,
            patient_name: self.patient_name,
            appointment_id: self.appointment_id,
            doctor_id: self.doctor_id,
            doctor_name: self.doctor_name,
            visit_date: self.visit_date,
            chief_complaint: self.chief_complaint,
            present_illness: self.present_illness,
            physical_examination: self.physical_examination,
            vital_signs,
            diagnoses: self.diagnoses,
            prescriptions: self.prescriptions,
            lab_results: self.lab_results,
            procedures: self.procedures,
            assessment: self.assessment,
            plan: self.plan,
            follow_up_instructions: self.follow_up_instructions,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicalRecordUpdate {
    pub appointment_id: Option<String>,
    pub doctor_id: Option<String>,
    pub visit_date: Option<DateTime<Utc>>,
    pub chief_complaint: Option<String>,
    pub present_illness: Option<String>,
    pub physical_examination: Option<String>,
    pub vital_signs: Option<VitalSigns>,
    pub diagnoses: Option<Vec<Diagnosis>>,
    pub prescriptions: Option<Vec<Prescription>>,
    pub lab_results: Option<Vec<LabResult>>,
    pub procedures: Option<Vec<String>>,
    pub assessment: Option<String>,
    pub plan: Option<String>,
    pub follow_up_instructions: Option<String>,
    pub notes: Option<String>,
}

impl Patch<MedicalRecord> for MedicalRecordUpdate {
    fn apply(self, record: &mut MedicalRecord) -> Result<(), ApiError> {
        let src = self;
        merge_fields!(src => record;
            doctor_id, visit_date, chief_complaint, diagnoses, prescriptions,
            lab_results, procedures, assessment, plan;
            optional appointment_id, present_illness, physical_examination,
            vital_signs, follow_up_instructions, notes);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFilters {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl RecordFilters {
    pub fn matches(&self, record: &MedicalRecord) -> bool {
        let day = record.visit_date.date_naive();
        self.patient_id
            .as_ref()
            .map_or(true, |p| &record.patient_id == p)
            && self.doctor_id.as_ref().map_or(true, |d| &record.doctor_id == d)
            && self.date_from.map_or(true, |from| day >= from)
            && self.date_to.map_or(true, |to| day <= to)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmrStats {
    pub total: usize,
    pub with_prescriptions: usize,
    pub with_lab_results: usize,
    pub with_procedures: usize,
}
