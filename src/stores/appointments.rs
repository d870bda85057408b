use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Utc};

use super::{local_today, new_id, StoreError};
use crate::mock_api::MockApi;
use crate::models::{
    Appointment, AppointmentFilters, AppointmentStats, AppointmentStatus, AppointmentUpdate,
    NewAppointment,
};
use crate::store::{EntityState, EntityStore};

/// Size of the upcoming-appointments list.
pub const UPCOMING_LIMIT: usize = 10;

pub type AppointmentState = EntityState<Appointment, AppointmentFilters>;

pub struct AppointmentStore {
    entities: EntityStore<Appointment, AppointmentFilters>,
}

deref_entity_store!(AppointmentStore, entities: Appointment, AppointmentFilters);

impl AppointmentStore {
    pub fn new(api: Arc<MockApi<Appointment>>) -> Self {
        Self {
            entities: EntityStore::new(api),
        }
    }

    pub async fn create(&self, new: NewAppointment) -> Result<Appointment, StoreError> {
        new.validate()?;
        let appointment = new.into_appointment(new_id(), Utc::now());
        self.entities.insert(appointment).await
    }

    /// Any change of start time or duration recomputes the end time.
    pub async fn update(
        &self,
        id: &str,
        update: AppointmentUpdate,
    ) -> Result<Appointment, StoreError> {
        self.entities.patch(id, update).await
    }

    pub async fn set_status(
        &self,
        id: &str,
        status: AppointmentStatus,
    ) -> Result<Appointment, StoreError> {
        self.update(id, AppointmentUpdate::status(status)).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.entities.remove(id).await
    }

    // ── Filter shortcuts ────────────────────────────────────

    /// Restricts the list to one calendar day.
    pub fn filter_by_date(&self, day: NaiveDate) {
        self.update_filters(|f| {
            f.date_from = Some(day);
            f.date_to = Some(day);
        });
    }

    pub fn filter_by_doctor(&self, doctor_id: impl Into<String>) {
        let doctor_id = doctor_id.into();
        self.update_filters(|f| f.doctor_id = Some(doctor_id));
    }

    pub fn filter_by_patient(&self, patient_id: impl Into<String>) {
        let patient_id = patient_id.into();
        self.update_filters(|f| f.patient_id = Some(patient_id));
    }

    pub fn filter_by_status(&self, status: AppointmentStatus) {
        self.update_filters(|f| f.status = Some(status));
    }

    // ── Derived views ───────────────────────────────────────

    pub fn filtered(&self) -> Vec<Appointment> {
        self.store().with(|s| {
            s.data
                .iter()
                .filter(|a| s.filters.matches(a))
                .cloned()
                .collect()
        })
    }

    pub fn todays_on(&self, day: NaiveDate) -> Vec<Appointment> {
        self.store().with(|s| {
            s.data
                .iter()
                .filter(|a| a.date == day)
                .cloned()
                .collect()
        })
    }

    pub fn todays(&self) -> Vec<Appointment> {
        self.todays_on(local_today())
    }

    /// Scheduled or confirmed appointments starting at or after `now`,
    /// soonest first, at most [`UPCOMING_LIMIT`].
    pub fn upcoming_from(&self, now: DateTime<Utc>) -> Vec<Appointment> {
        let mut upcoming: Vec<Appointment> = self.store().with(|s| {
            s.data
                .iter()
                .filter(|a| a.is_open() && a.starts_at() >= now)
                .cloned()
                .collect()
        });
        upcoming.sort_by_key(Appointment::starts_at);
        upcoming.truncate(UPCOMING_LIMIT);
        upcoming
    }

    /// Upcoming appointments relative to the local wall clock.
    pub fn upcoming(&self) -> Vec<Appointment> {
        self.upcoming_from(Local::now().naive_local().and_utc())
    }

    pub fn stats_on(&self, day: NaiveDate) -> AppointmentStats {
        self.store().with(|s| {
            let mut stats = AppointmentStats {
                total: s.data.len(),
                ..AppointmentStats::default()
            };
            for a in s.data.iter().filter(|a| a.date == day) {
                stats.today += 1;
                match a.status {
                    AppointmentStatus::Scheduled => stats.scheduled += 1,
                    AppointmentStatus::Confirmed => stats.confirmed += 1,
                    AppointmentStatus::InProgress => stats.in_progress += 1,
                    AppointmentStatus::Completed => stats.completed += 1,
                    AppointmentStatus::Cancelled => stats.cancelled += 1,
                    AppointmentStatus::NoShow => stats.no_show += 1,
                }
            }
            stats
        })
    }

    pub fn stats(&self) -> AppointmentStats {
        self.stats_on(local_today())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use chrono::{NaiveTime, TimeZone};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn new_appt(date: NaiveDate, h: u32, doctor: &str, status: AppointmentStatus) -> NewAppointment {
        NewAppointment {
            patient_id: "p1".into(),
            patient_name: "Ayşe Yılmaz".into(),
            doctor_id: doctor.into(),
            doctor_name: "Dr. Mehmet Öz".into(),
            date,
            start_time: NaiveTime::from_hms_opt(h, 0, 0).unwrap(),
            duration: 30,
            kind: AppointmentType::Consultation,
            status,
            reason: "Kontrol muayenesi".into(),
            notes: None,
            symptoms: vec![],
        }
    }

    fn empty_store() -> AppointmentStore {
        AppointmentStore::new(Arc::new(MockApi::instant(vec![])))
    }

    #[tokio::test]
    async fn create_and_reschedule_keep_end_time_consistent() {
        let store = empty_store();
        let a = store
            .create(new_appt(day(4), 9, "d1", AppointmentStatus::Scheduled))
            .await
            .unwrap();
        assert_eq!(a.end_time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());

        let moved = store
            .update(
                &a.id,
                AppointmentUpdate {
                    start_time: NaiveTime::from_hms_opt(14, 15, 0),
                    duration: Some(45),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.end_time, NaiveTime::from_hms_opt(15, 0, 0).unwrap());
        assert_eq!(moved.reason, "Kontrol muayenesi");
    }

    #[tokio::test]
    async fn filter_shortcuts_accumulate() {
        let store = empty_store();
        store
            .create(new_appt(day(4), 9, "d1", AppointmentStatus::Scheduled))
            .await
            .unwrap();
        store
            .create(new_appt(day(4), 10, "d2", AppointmentStatus::Scheduled))
            .await
            .unwrap();
        store
            .create(new_appt(day(5), 9, "d1", AppointmentStatus::Completed))
            .await
            .unwrap();

        store.filter_by_date(day(4));
        assert_eq!(store.filtered().len(), 2);
        store.filter_by_doctor("d1");
        assert_eq!(store.filtered().len(), 1);
        store.clear_filters();
        store.filter_by_status(AppointmentStatus::Completed);
        assert_eq!(store.filtered()[0].date, day(5));
    }

    #[tokio::test]
    async fn upcoming_is_open_future_sorted_and_capped() {
        let store = empty_store();
        for d in (1..=14).rev() {
            store
                .create(new_appt(day(d), 9, "d1", AppointmentStatus::Confirmed))
                .await
                .unwrap();
        }
        store
            .create(new_appt(day(3), 8, "d1", AppointmentStatus::Cancelled))
            .await
            .unwrap();

        let now = Utc.with_ymd_and_hms(2024, 3, 3, 8, 30, 0).unwrap();
        let upcoming = store.upcoming_from(now);
        assert_eq!(upcoming.len(), UPCOMING_LIMIT);
        assert_eq!(upcoming[0].date, day(3));
        assert!(upcoming.windows(2).all(|w| w[0].starts_at() <= w[1].starts_at()));
        assert!(upcoming.iter().all(|a| a.status == AppointmentStatus::Confirmed));
    }

    #[tokio::test]
    async fn stats_break_down_the_day_by_status() {
        let store = empty_store();
        store
            .create(new_appt(day(4), 9, "d1", AppointmentStatus::Scheduled))
            .await
            .unwrap();
        let done = store
            .create(new_appt(day(4), 10, "d1", AppointmentStatus::Scheduled))
            .await
            .unwrap();
        store
            .create(new_appt(day(6), 9, "d1", AppointmentStatus::Scheduled))
            .await
            .unwrap();
        store
            .set_status(&done.id, AppointmentStatus::NoShow)
            .await
            .unwrap();

        let stats = store.stats_on(day(4));
        assert_eq!(stats.total, 3);
        assert_eq!(stats.today, 2);
        assert_eq!(stats.scheduled, 1);
        assert_eq!(stats.no_show, 1);
        assert_eq!(store.todays_on(day(6)).len(), 1);
    }
}
