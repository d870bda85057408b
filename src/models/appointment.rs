use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::hhmm;
use super::enums::{AppointmentStatus, AppointmentType};
use crate::mock_api::{ApiError, Patch};
use crate::rules;

/// Default visit length in minutes.
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    /// Always `start_time + duration`.
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub duration: u32,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
    pub status: AppointmentStatus,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

entity!(Appointment, "Appointment");

impl Appointment {
    /// Moment the visit starts, interpreting date and clock time as UTC.
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.date.and_time(self.start_time).and_utc()
    }

    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
    #[serde(default = "default_status")]
    pub status: AppointmentStatus,
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_MINUTES
}

fn default_status() -> AppointmentStatus {
    AppointmentStatus::Scheduled
}

impl NewAppointment {
    pub fn into_appointment(self, id: String, now: DateTime<Utc>) -> Appointment {
        Appointment {
            id,
            end_time: rules::appointment_end_time(self.start_time, self.duration),
            patient_id: self.patient_id,
            patient_name: self.patient_name,
            doctor_id: self.doctor_id,
            doctor_name: self.doctor_name,
            date: self.date,
            start_time: self.start_time,
            duration: self.duration,
            kind: self.kind,
            status: self.status,
            reason: self.reason,
            notes: self.notes,
            symptoms: self.symptoms,
            diagnosis: None,
            prescription: None,
            follow_up_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppointmentUpdate {
    pub doctor_id: Option<String>,
    pub doctor_name: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(with = "hhmm::option")]
    pub start_time: Option<NaiveTime>,
    pub duration: Option<u32>,
    #[serde(rename = "type")]
    pub kind: Option<AppointmentType>,
    pub status: Option<AppointmentStatus>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub symptoms: Option<Vec<String>>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

impl AppointmentUpdate {
    pub fn status(status: AppointmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

impl Patch<Appointment> for AppointmentUpdate {
    fn apply(self, appointment: &mut Appointment) -> Result<(), ApiError> {
        let src = self;
        merge_fields!(src => appointment;
            doctor_id, doctor_name, date, start_time, duration, kind, status,
            reason, symptoms;
            optional notes, diagnosis, prescription, follow_up_date);
        appointment.end_time =
            rules::appointment_end_time(appointment.start_time, appointment.duration);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppointmentFilters {
    pub status: Option<AppointmentStatus>,
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<AppointmentType>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl AppointmentFilters {
    pub fn matches(&self, a: &Appointment) -> bool {
        self.status.map_or(true, |s| a.status == s)
            && self.doctor_id.as_ref().map_or(true, |d| &a.doctor_id == d)
            && self.patient_id.as_ref().map_or(true, |p| &a.patient_id == p)
            && self.kind.map_or(true, |k| a.kind == k)
            && self.date_from.map_or(true, |from| a.date >= from)
            && self.date_to.map_or(true, |to| a.date <= to)
    }
}

/// Collection total plus today's appointments broken down by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentStats {
    pub total: usize,
    pub today: usize,
    pub scheduled: usize,
    pub confirmed: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub no_show: usize,
}
