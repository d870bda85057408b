//! Seed data for every collection and the routine that loads it.
//!
//! `SeedData::demo(today)` builds a small, internally consistent clinic:
//! every appointment, record, invoice and payment points at patients and
//! staff that exist in the same fixture. Dates are laid out around `today`
//! so the dashboards (today's appointments, overdue invoices, expiring
//! stock) have something to show.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core_state::ClinicState;
use crate::mock_api::{Entity, MockApi};
use crate::models::*;
use crate::rules;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid seed file: {0}")]
    Json(#[from] serde_json::Error),
}

// ═══════════════════════════════════════════════════════════
// SeedData
// ═══════════════════════════════════════════════════════════

/// One snapshot per collection plus the plaintext demo passwords.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub users: Vec<User>,
    /// Email → password.
    pub credentials: BTreeMap<String, String>,
    pub patients: Vec<Patient>,
    pub appointments: Vec<Appointment>,
    pub medical_records: Vec<MedicalRecord>,
    pub invoices: Vec<Invoice>,
    pub payments: Vec<Payment>,
    pub inventory: Vec<InventoryItem>,
    pub stock_movements: Vec<StockMovement>,
    pub notifications: Vec<Notification>,
}

impl SeedData {
    pub fn from_json_file(path: &Path) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path)?;
        let data = serde_json::from_str(&raw)?;
        tracing::debug!(path = %path.display(), "loaded seed file");
        Ok(data)
    }

    pub fn stats(&self) -> SeedStats {
        SeedStats::of(self)
    }

    /// The demo clinic, with dates relative to `today`.
    pub fn demo(today: NaiveDate) -> Self {
        let created = at(today - Duration::days(400), 9, 0);

        let (users, credentials) = demo_users(created);
        let patients = demo_patients(today, created);
        let appointments = demo_appointments(today);
        let medical_records = demo_records(today);
        let (invoices, payments) = demo_billing(today);
        let (inventory, stock_movements) = demo_inventory(today, created);
        let notifications = demo_notifications(today);

        Self {
            users,
            credentials,
            patients,
            appointments,
            medical_records,
            invoices,
            payments,
            inventory,
            stock_movements,
            notifications,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// SeedStats
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserSeedStats {
    pub total: usize,
    pub doctors: usize,
    pub nurses: usize,
    pub receptionists: usize,
    pub admins: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatientSeedStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub male: usize,
    pub female: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppointmentSeedStats {
    pub total: usize,
    pub scheduled: usize,
    pub confirmed: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub no_show: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordSeedStats {
    pub total: usize,
    pub with_prescriptions: usize,
    pub with_lab_results: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BillingSeedStats {
    pub total_invoices: usize,
    pub total_revenue: Money,
    pub paid: usize,
    pub pending: usize,
    pub overdue: usize,
    pub total_payments: usize,
    pub total_paid: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InventorySeedStats {
    pub total: usize,
    pub medications: usize,
    pub equipment: usize,
    pub consumables: usize,
    pub in_stock: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub expired: usize,
    pub total_value: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationSeedStats {
    pub total: usize,
    pub unread: usize,
    pub read: usize,
    pub urgent: usize,
    pub high: usize,
}

/// Per-collection summary counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedStats {
    pub users: UserSeedStats,
    pub patients: PatientSeedStats,
    pub appointments: AppointmentSeedStats,
    pub medical_records: RecordSeedStats,
    pub billing: BillingSeedStats,
    pub inventory: InventorySeedStats,
    pub notifications: NotificationSeedStats,
}

fn count<T>(items: &[T], pred: impl Fn(&T) -> bool) -> usize {
    items.iter().filter(|item| pred(item)).count()
}

impl SeedStats {
    fn of(data: &SeedData) -> Self {
        let users = &data.users;
        let patients = &data.patients;
        let appts = &data.appointments;
        let records = &data.medical_records;
        let invoices = &data.invoices;
        let items = &data.inventory;
        let notes = &data.notifications;

        Self {
            users: UserSeedStats {
                total: users.len(),
                doctors: count(users, |u| u.role == UserRole::Doctor),
                nurses: count(users, |u| u.role == UserRole::Nurse),
                receptionists: count(users, |u| u.role == UserRole::Receptionist),
                admins: count(users, |u| u.role == UserRole::Admin),
            },
            patients: PatientSeedStats {
                total: patients.len(),
                active: count(patients, |p| p.status == PatientStatus::Active),
                inactive: count(patients, |p| p.status == PatientStatus::Inactive),
                male: count(patients, |p| p.gender == Gender::Male),
                female: count(patients, |p| p.gender == Gender::Female),
            },
            appointments: AppointmentSeedStats {
                total: appts.len(),
                scheduled: count(appts, |a| a.status == AppointmentStatus::Scheduled),
                confirmed: count(appts, |a| a.status == AppointmentStatus::Confirmed),
                in_progress: count(appts, |a| a.status == AppointmentStatus::InProgress),
                completed: count(appts, |a| a.status == AppointmentStatus::Completed),
                cancelled: count(appts, |a| a.status == AppointmentStatus::Cancelled),
                no_show: count(appts, |a| a.status == AppointmentStatus::NoShow),
            },
            medical_records: RecordSeedStats {
                total: records.len(),
                with_prescriptions: count(records, |r| !r.prescriptions.is_empty()),
                with_lab_results: count(records, |r| !r.lab_results.is_empty()),
            },
            billing: BillingSeedStats {
                total_invoices: invoices.len(),
                total_revenue: invoices.iter().map(|i| i.total).sum(),
                paid: count(invoices, |i| i.status == InvoiceStatus::Paid),
                pending: count(invoices, |i| i.status == InvoiceStatus::Pending),
                overdue: count(invoices, |i| i.status == InvoiceStatus::Overdue),
                total_payments: data.payments.len(),
                total_paid: data.payments.iter().map(|p| p.amount).sum(),
            },
            inventory: InventorySeedStats {
                total: items.len(),
                medications: count(items, |i| i.category == ItemCategory::Medication),
                equipment: count(items, |i| i.category == ItemCategory::Equipment),
                consumables: count(items, |i| i.category == ItemCategory::Consumable),
                in_stock: count(items, |i| i.status == ItemStatus::InStock),
                low_stock: count(items, |i| i.status == ItemStatus::LowStock),
                out_of_stock: count(items, |i| i.status == ItemStatus::OutOfStock),
                expired: count(items, |i| i.status == ItemStatus::Expired),
                total_value: items.iter().map(InventoryItem::stock_value).sum(),
            },
            notifications: NotificationSeedStats {
                total: notes.len(),
                unread: count(notes, |n| n.status == NotificationStatus::Unread),
                read: count(notes, |n| n.status == NotificationStatus::Read),
                urgent: count(notes, |n| n.priority == NotificationPriority::Urgent),
                high: count(notes, |n| n.priority == NotificationPriority::High),
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Seeding
// ═══════════════════════════════════════════════════════════

/// Which collections to touch. By default every collection is seeded and
/// seed records are merged over existing ones by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedOptions {
    /// Empty every collection first, including skipped ones.
    pub clear_existing: bool,
    pub skip_users: bool,
    pub skip_patients: bool,
    pub skip_appointments: bool,
    pub skip_medical_records: bool,
    pub skip_billing: bool,
    pub skip_inventory: bool,
    pub skip_notifications: bool,
}

impl SeedOptions {
    fn step_count(&self) -> usize {
        let skips = [
            self.skip_users,
            self.skip_patients,
            self.skip_appointments,
            self.skip_medical_records,
            self.skip_billing,
            self.skip_inventory,
            self.skip_notifications,
        ];
        // Enabled collections, the optional clear, and the completion step.
        skips.iter().filter(|skip| !**skip).count() + usize::from(self.clear_existing) + 1
    }
}

struct Progress<F> {
    done: usize,
    total: usize,
    report: F,
}

impl<F: FnMut(&str, u8)> Progress<F> {
    fn step(&mut self, message: &str) {
        self.done += 1;
        let percent = (self.done * 100 / self.total.max(1)).min(100);
        tracing::debug!(percent, "{message}");
        (self.report)(message, u8::try_from(percent).unwrap_or(100));
    }
}

/// Upserts `items` by id, after emptying the collection when `clear` is set.
fn merge_into<T: Entity>(api: &MockApi<T>, items: &[T], clear: bool) {
    let mut data = if clear { Vec::new() } else { api.snapshot() };
    let mut index: HashMap<String, usize> = data
        .iter()
        .enumerate()
        .map(|(i, item)| (item.id().to_string(), i))
        .collect();
    for item in items {
        match index.get(item.id()) {
            Some(&i) => data[i] = item.clone(),
            None => {
                index.insert(item.id().to_string(), data.len());
                data.push(item.clone());
            }
        }
    }
    api.set_data(data);
}

/// Loads `data` into the state's collections step by step, reporting
/// `(message, percent)` after each one, then re-mirrors every store.
/// Returns the live collection counts afterwards.
pub fn seed_database(
    state: &ClinicState,
    data: &SeedData,
    options: &SeedOptions,
    on_progress: impl FnMut(&str, u8),
) -> SeedStats {
    let clear = options.clear_existing;
    let mut progress = Progress {
        done: 0,
        total: options.step_count(),
        report: on_progress,
    };

    if clear {
        progress.step("Clearing existing data...");
        state.clear_all();
    }

    if !options.skip_users {
        progress.step(&format!("Seeding {} users...", data.users.len()));
        merge_into(&state.apis.users, &data.users, clear);
        if clear {
            state.credentials.replace_all(&data.credentials);
        } else {
            for (email, password) in &data.credentials {
                state.credentials.set(email, password);
            }
        }
    }
    if !options.skip_patients {
        progress.step(&format!("Seeding {} patients...", data.patients.len()));
        merge_into(&state.apis.patients, &data.patients, clear);
    }
    if !options.skip_appointments {
        progress.step(&format!("Seeding {} appointments...", data.appointments.len()));
        merge_into(&state.apis.appointments, &data.appointments, clear);
    }
    if !options.skip_medical_records {
        progress.step(&format!(
            "Seeding {} medical records...",
            data.medical_records.len()
        ));
        merge_into(&state.apis.medical_records, &data.medical_records, clear);
    }
    if !options.skip_billing {
        progress.step(&format!(
            "Seeding {} invoices and {} payments...",
            data.invoices.len(),
            data.payments.len()
        ));
        merge_into(&state.apis.invoices, &data.invoices, clear);
        merge_into(&state.apis.payments, &data.payments, clear);
    }
    if !options.skip_inventory {
        progress.step(&format!("Seeding {} inventory items...", data.inventory.len()));
        merge_into(&state.apis.inventory, &data.inventory, clear);
        merge_into(&state.apis.stock_movements, &data.stock_movements, clear);
    }
    if !options.skip_notifications {
        progress.step(&format!(
            "Seeding {} notifications...",
            data.notifications.len()
        ));
        merge_into(&state.apis.notifications, &data.notifications, clear);
    }

    state.sync_stores();
    progress.step("Database seeding completed successfully!");

    let stats = state.collection_stats();
    tracing::info!(
        users = stats.users.total,
        patients = stats.patients.total,
        appointments = stats.appointments.total,
        medical_records = stats.medical_records.total,
        invoices = stats.billing.total_invoices,
        payments = stats.billing.total_payments,
        inventory = stats.inventory.total,
        notifications = stats.notifications.total,
        "seed data summary"
    );
    stats
}

// ═══════════════════════════════════════════════════════════
// Demo fixture
// ═══════════════════════════════════════════════════════════

pub const ADMIN_ID: &str = "usr-admin";
pub const DOCTOR_AYSE_ID: &str = "usr-dr-ayse";
pub const DOCTOR_MEHMET_ID: &str = "usr-dr-mehmet";
pub const NURSE_ID: &str = "usr-nurse-fatma";
pub const RECEPTION_ID: &str = "usr-reception";

fn at(day: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    day.and_time(hm(hour, minute)).and_utc()
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn days(n: i64) -> Duration {
    Duration::days(n)
}

fn weekday_schedule(start: NaiveTime, end: NaiveTime) -> WeeklySchedule {
    ["monday", "tuesday", "wednesday", "thursday", "friday"]
        .into_iter()
        .map(|day| (day.to_string(), vec![WorkingHours { start, end }]))
        .collect()
}

struct StaffRow {
    id: &'static str,
    email: &'static str,
    password: &'static str,
    name: (&'static str, &'static str),
    role: UserRole,
    department: &'static str,
    specialization: Option<&'static str>,
}

const STAFF: [StaffRow; 5] = [
    StaffRow { id: ADMIN_ID, email: "admin@klinik.com", password: "admin123",
        name: ("Ahmet", "Yılmaz"), role: UserRole::Admin, department: "Yönetim",
        specialization: None },
    StaffRow { id: DOCTOR_AYSE_ID, email: "dr.ayse@klinik.com", password: "doctor123",
        name: ("Ayşe", "Demir"), role: UserRole::Doctor, department: "Dahiliye",
        specialization: Some("Dahiliye") },
    StaffRow { id: DOCTOR_MEHMET_ID, email: "dr.mehmet@klinik.com", password: "doctor123",
        name: ("Mehmet", "Kaya"), role: UserRole::Doctor, department: "Kardiyoloji",
        specialization: Some("Kardiyoloji") },
    StaffRow { id: NURSE_ID, email: "nurse.fatma@klinik.com", password: "nurse123",
        name: ("Fatma", "Şahin"), role: UserRole::Nurse, department: "Dahiliye",
        specialization: None },
    StaffRow { id: RECEPTION_ID, email: "reception@klinik.com", password: "reception123",
        name: ("Zeynep", "Arslan"), role: UserRole::Receptionist, department: "Kabul",
        specialization: None },
];

fn demo_users(created: DateTime<Utc>) -> (Vec<User>, BTreeMap<String, String>) {
    let mut credentials = BTreeMap::new();
    let users = STAFF
        .iter()
        .map(|row| {
            let (user, password) = NewUser {
                email: row.email.into(),
                password: row.password.into(),
                first_name: row.name.0.into(),
                last_name: row.name.1.into(),
                role: row.role,
                status: UserStatus::Active,
                contact: Some(Contact {
                    phone: "05321234567".into(),
                    email: Some(row.email.into()),
                    address: None,
                }),
                avatar: None,
                specialization: row.specialization.map(String::from),
                license_number: row
                    .specialization
                    .map(|_| format!("TR-{}", row.id.to_uppercase())),
                department: Some(row.department.into()),
                working_hours: Some(weekday_schedule(hm(9, 0), hm(17, 0))),
            }
            .into_user(row.id.into(), created);
            credentials.insert(user.email.clone(), password);
            user
        })
        .collect();
    (users, credentials)
}

struct PatientRow {
    id: &'static str,
    tc_no: &'static str,
    name: (&'static str, &'static str),
    birth: (i32, u32, u32),
    gender: Gender,
    blood: BloodType,
    status: PatientStatus,
    city: &'static str,
    insurance: InsuranceType,
    registered_days_ago: i64,
}

const PATIENTS: [PatientRow; 6] = [
    PatientRow { id: "pat-001", tc_no: "10000000146", name: ("Ali", "Öztürk"), birth: (1978, 4, 12),
        gender: Gender::Male, blood: BloodType::APos, status: PatientStatus::Active,
        city: "İstanbul", insurance: InsuranceType::Sgk, registered_days_ago: 380 },
    PatientRow { id: "pat-002", tc_no: "10000000278", name: ("Elif", "Çelik"), birth: (1990, 9, 3),
        gender: Gender::Female, blood: BloodType::ONeg, status: PatientStatus::Active,
        city: "İstanbul", insurance: InsuranceType::Private, registered_days_ago: 200 },
    PatientRow { id: "pat-003", tc_no: "10000000300", name: ("Mustafa", "Aydın"), birth: (1955, 1, 27),
        gender: Gender::Male, blood: BloodType::BPos, status: PatientStatus::Active,
        city: "Ankara", insurance: InsuranceType::Sgk, registered_days_ago: 150 },
    PatientRow { id: "pat-004", tc_no: "10000000432", name: ("Hatice", "Koç"), birth: (1967, 11, 18),
        gender: Gender::Female, blood: BloodType::AbPos, status: PatientStatus::Active,
        city: "İzmir", insurance: InsuranceType::Sgk, registered_days_ago: 90 },
    PatientRow { id: "pat-005", tc_no: "10000000564", name: ("Can", "Yıldız"), birth: (2001, 6, 30),
        gender: Gender::Male, blood: BloodType::OPos, status: PatientStatus::Active,
        city: "İstanbul", insurance: InsuranceType::None, registered_days_ago: 5 },
    PatientRow { id: "pat-006", tc_no: "10000000696", name: ("Emine", "Kurt"), birth: (1948, 2, 14),
        gender: Gender::Female, blood: BloodType::ANeg, status: PatientStatus::Inactive,
        city: "Bursa", insurance: InsuranceType::Sgk, registered_days_ago: 700 },
];

fn demo_patients(today: NaiveDate, fallback_created: DateTime<Utc>) -> Vec<Patient> {
    PATIENTS
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let (first, last) = row.name;
            let created = today
                .checked_sub_signed(days(row.registered_days_ago))
                .map_or(fallback_created, |d| at(d, 10, 0));
            NewPatient {
                tc_no: row.tc_no.into(),
                first_name: first.into(),
                last_name: last.into(),
                birth_date: ymd(row.birth.0, row.birth.1, row.birth.2),
                gender: row.gender,
                blood_type: Some(row.blood),
                status: row.status,
                contact: Contact {
                    phone: format!("0532{:07}", 1_000_000 + i * 137),
                    email: Some(format!(
                        "{}.{}@ornek.com",
                        first.to_lowercase(),
                        last.to_lowercase()
                    )),
                    address: Some(Address {
                        street: format!("Cumhuriyet Caddesi No: {}", i + 1),
                        city: row.city.into(),
                        state: row.city.into(),
                        district: None,
                        zip_code: "34000".into(),
                        country: "Türkiye".into(),
                    }),
                },
                emergency_contact: EmergencyContact {
                    name: format!("{} Yakını", last),
                    relationship: "Eş".into(),
                    phone: "05550000000".into(),
                },
                insurance: match row.insurance {
                    InsuranceType::None => Insurance::none(),
                    kind => Insurance {
                        kind,
                        company: (kind == InsuranceType::Private).then(|| "Anadolu Sigorta".into()),
                        provider: (kind == InsuranceType::Sgk).then(|| "SGK".into()),
                        policy_number: Some(format!("POL-{}", row.tc_no)),
                    },
                },
                medical_history: (i % 2 == 0).then(|| MedicalHistory {
                    allergies: vec!["Penisilin".into()],
                    past_illnesses: vec!["Hipertansiyon".into()],
                    surgeries: vec![],
                    medications: vec![],
                }),
                avatar: None,
            }
            .into_patient(row.id.into(), created)
        })
        .collect()
}

fn patient_name(id: &str) -> String {
    PATIENTS
        .iter()
        .find(|p| p.id == id)
        .map(|p| rules::full_name(p.name.0, p.name.1))
        .unwrap_or_default()
}

fn doctor_name(id: &str) -> String {
    match id {
        DOCTOR_AYSE_ID => "Dr. Ayşe Demir".into(),
        DOCTOR_MEHMET_ID => "Dr. Mehmet Kaya".into(),
        _ => String::new(),
    }
}

/// (id, patient, doctor, day offset, start, kind, status, reason)
type AppointmentRow = (
    &'static str,
    &'static str,
    &'static str,
    i64,
    (u32, u32),
    AppointmentType,
    AppointmentStatus,
    &'static str,
);

const APPOINTMENTS: [AppointmentRow; 8] = [
    ("apt-001", "pat-001", DOCTOR_AYSE_ID, -14, (10, 0), AppointmentType::Consultation,
        AppointmentStatus::Completed, "Baş ağrısı ve halsizlik"),
    ("apt-002", "pat-002", DOCTOR_MEHMET_ID, -7, (11, 0), AppointmentType::Consultation,
        AppointmentStatus::Completed, "Çarpıntı şikayeti"),
    ("apt-003", "pat-003", DOCTOR_AYSE_ID, -3, (14, 0), AppointmentType::FollowUp,
        AppointmentStatus::Cancelled, "Tansiyon kontrolü"),
    ("apt-004", "pat-004", DOCTOR_MEHMET_ID, -1, (9, 30), AppointmentType::RoutineCheckup,
        AppointmentStatus::NoShow, "Yıllık kontrol"),
    ("apt-005", "pat-001", DOCTOR_AYSE_ID, 0, (9, 0), AppointmentType::FollowUp,
        AppointmentStatus::Confirmed, "Tahlil sonuçlarının değerlendirilmesi"),
    ("apt-006", "pat-005", DOCTOR_MEHMET_ID, 0, (13, 30), AppointmentType::Consultation,
        AppointmentStatus::Scheduled, "Göğüs ağrısı"),
    ("apt-007", "pat-002", DOCTOR_AYSE_ID, 2, (10, 30), AppointmentType::FollowUp,
        AppointmentStatus::Scheduled, "Kontrol muayenesi"),
    ("apt-008", "pat-003", DOCTOR_MEHMET_ID, 5, (15, 0), AppointmentType::RoutineCheckup,
        AppointmentStatus::Confirmed, "EKG kontrolü"),
];

fn demo_appointments(today: NaiveDate) -> Vec<Appointment> {
    APPOINTMENTS
        .iter()
        .map(|&(id, patient, doctor, offset, (h, m), kind, status, reason)| {
            let date = today + days(offset);
            let booked = at(date - days(10), 12, 0);
            NewAppointment {
                patient_id: patient.into(),
                patient_name: patient_name(patient),
                doctor_id: doctor.into(),
                doctor_name: doctor_name(doctor),
                date,
                start_time: hm(h, m),
                duration: DEFAULT_DURATION_MINUTES,
                kind,
                status,
                reason: reason.into(),
                notes: None,
                symptoms: vec![],
            }
            .into_appointment(id.into(), booked)
        })
        .collect()
}

fn record(
    patient: &str,
    appointment: Option<&str>,
    doctor: &str,
    visit: DateTime<Utc>,
    (complaint, assessment, plan): (&str, &str, &str),
) -> NewMedicalRecord {
    NewMedicalRecord {
        patient_id: patient.into(),
        patient_name: Some(patient_name(patient)),
        appointment_id: appointment.map(String::from),
        doctor_id: doctor.into(),
        doctor_name: Some(doctor_name(doctor)),
        visit_date: visit,
        chief_complaint: complaint.into(),
        present_illness: None,
        physical_examination: None,
        vital_signs: Some(VitalSigns {
            temperature: Some(36.8),
            blood_pressure_systolic: Some(130),
            blood_pressure_diastolic: Some(85),
            heart_rate: Some(78),
            weight: Some(82.0),
            height: Some(178.0),
            ..VitalSigns::default()
        }),
        diagnoses: vec![],
        prescriptions: vec![],
        lab_results: vec![],
        procedures: vec![],
        assessment: assessment.into(),
        plan: plan.into(),
        follow_up_instructions: None,
        notes: None,
    }
}

fn demo_records(today: NaiveDate) -> Vec<MedicalRecord> {
    let first_visit = today - days(60);
    let headache = today - days(14);
    let palpitations = today - days(7);

    let mut older = record(
        "pat-001",
        None,
        DOCTOR_AYSE_ID,
        at(first_visit, 10, 15),
        ("Yüksek tansiyon takibi", "Esansiyel hipertansiyon", "Tuz kısıtlaması ve takip"),
    );
    older.diagnoses = vec![Diagnosis {
        id: "dx-001".into(),
        code: "I10".into(),
        name: "Esansiyel hipertansiyon".into(),
        description: None,
        severity: Some(DiagnosisSeverity::Moderate),
        status: DiagnosisStatus::Chronic,
        diagnosed_date: first_visit,
        resolved_date: None,
    }];

    let mut latest = record(
        "pat-001",
        Some("apt-001"),
        DOCTOR_AYSE_ID,
        at(headache, 10, 5),
        ("Baş ağrısı ve halsizlik", "Gerilim tipi baş ağrısı", "Analjezik ve istirahat"),
    );
    latest.prescriptions = vec![Prescription {
        id: "rx-001".into(),
        medications: vec![Medication {
            id: "med-001".into(),
            name: "Parasetamol".into(),
            dosage: "500 mg".into(),
            frequency: "Günde 3 kez".into(),
            duration: "5 gün".into(),
            instructions: Some("Tok karnına".into()),
            start_date: headache,
            end_date: Some(headache + days(5)),
        }],
        notes: None,
        prescribed_date: headache,
        prescribed_by: DOCTOR_AYSE_ID.into(),
    }];

    let mut cardio = record(
        "pat-002",
        Some("apt-002"),
        DOCTOR_MEHMET_ID,
        at(palpitations, 11, 10),
        ("Çarpıntı şikayeti", "Sinüs taşikardisi", "Holter ve tiroid tahlili"),
    );
    cardio.lab_results = vec![LabResult {
        id: "lab-001".into(),
        test_name: "TSH".into(),
        test_type: "Hormon".into(),
        result: "0.2".into(),
        unit: Some("mIU/L".into()),
        reference_range: Some("0.4-4.0".into()),
        status: LabResultStatus::Abnormal,
        test_date: palpitations,
        notes: None,
    }];
    cardio.procedures = vec!["EKG".into()];

    [("emr-001", older), ("emr-002", latest), ("emr-003", cardio)]
        .into_iter()
        .map(|(id, new)| {
            let visited = new.visit_date;
            new.into_record(id.into(), visited)
        })
        .collect()
}

fn service(description: &str, quantity: u32, unit_price: Money) -> NewInvoiceItem {
    NewInvoiceItem {
        description: description.into(),
        quantity,
        unit_price,
        tax_rate: DEFAULT_TAX_RATE,
        service_code: None,
    }
}

fn demo_billing(today: NaiveDate) -> (Vec<Invoice>, Vec<Payment>) {
    let mut sequences: HashMap<(i32, u32), usize> = HashMap::new();
    let mut number = |issue: NaiveDate| {
        let seq = sequences.entry((issue.year(), issue.month())).or_insert(0);
        *seq += 1;
        rules::invoice_number(issue, *seq)
    };

    let rows = [
        ("inv-001", "pat-001", Some("apt-001"), -14, InvoiceStatus::Pending,
            vec![service("Dahiliye muayenesi", 1, 75_000)]),
        ("inv-002", "pat-002", Some("apt-002"), -7, InvoiceStatus::Pending,
            vec![service("Kardiyoloji muayenesi", 1, 90_000), service("EKG", 1, 35_000)]),
        ("inv-003", "pat-004", None, -40, InvoiceStatus::Overdue,
            vec![service("Kan tahlili", 3, 12_000)]),
        ("inv-004", "pat-001", Some("apt-005"), 0, InvoiceStatus::Draft,
            vec![service("Kontrol muayenesi", 1, 50_000)]),
    ];

    let mut invoices: Vec<Invoice> = rows
        .into_iter()
        .map(|(id, patient, appointment, offset, status, items)| {
            let issue = today + days(offset);
            NewInvoice {
                patient_id: patient.into(),
                patient_name: Some(patient_name(patient)),
                appointment_id: appointment.map(String::from),
                issue_date: issue,
                due_date: None,
                status,
                items,
                notes: None,
            }
            .into_invoice(id.into(), number(issue), at(issue, 16, 0))
        })
        .collect();

    let payment = |id: &str, invoice: &Invoice, amount: Money, method: PaymentMethod| {
        let paid_at = at(invoice.issue_date, 16, 30);
        NewPayment {
            invoice_id: invoice.id.clone(),
            payment_date: Some(paid_at),
            amount,
            method,
            reference_number: None,
            notes: None,
        }
        .into_payment(id.into(), RECEPTION_ID.into(), paid_at)
    };

    let payments = vec![
        payment("pay-001", &invoices[0], invoices[0].total, PaymentMethod::CreditCard),
        payment("pay-002", &invoices[1], 50_000, PaymentMethod::Cash),
    ];
    for p in &payments {
        if let Some(invoice) = invoices.iter_mut().find(|i| i.id == p.invoice_id) {
            rules::apply_payment(invoice, p.amount);
        }
    }
    (invoices, payments)
}

struct ItemRow {
    id: &'static str,
    name: &'static str,
    category: ItemCategory,
    sku: &'static str,
    stock: u32,
    min: u32,
    max: u32,
    unit: &'static str,
    price: Money,
    expiry_offset: Option<i64>,
}

const ITEMS: [ItemRow; 7] = [
    ItemRow { id: "inv-item-001", name: "Parasetamol 500 mg", category: ItemCategory::Medication,
        sku: "MED-PAR-500", stock: 240, min: 50, max: 500, unit: "tablet", price: 150,
        expiry_offset: Some(400) },
    ItemRow { id: "inv-item-002", name: "Amoksisilin 1000 mg", category: ItemCategory::Medication,
        sku: "MED-AMX-1000", stock: 8, min: 20, max: 120, unit: "kutu", price: 8_500,
        expiry_offset: Some(300) },
    ItemRow { id: "inv-item-003", name: "Nitril Eldiven", category: ItemCategory::Consumable,
        sku: "CON-ELD-M", stock: 0, min: 10, max: 100, unit: "kutu", price: 12_000,
        expiry_offset: None },
    ItemRow { id: "inv-item-004", name: "Enjektör 5 ml", category: ItemCategory::Consumable,
        sku: "CON-ENJ-5", stock: 600, min: 100, max: 1_000, unit: "adet", price: 250,
        expiry_offset: Some(700) },
    ItemRow { id: "inv-item-005", name: "İnsülin Kalemi", category: ItemCategory::Medication,
        sku: "MED-INS-01", stock: 30, min: 10, max: 60, unit: "adet", price: 32_000,
        expiry_offset: Some(30) },
    ItemRow { id: "inv-item-006", name: "Öksürük Şurubu", category: ItemCategory::Medication,
        sku: "MED-OKS-150", stock: 12, min: 5, max: 40, unit: "şişe", price: 6_500,
        expiry_offset: Some(-10) },
    ItemRow { id: "inv-item-007", name: "Dijital Tansiyon Aleti", category: ItemCategory::Equipment,
        sku: "EQP-TNS-01", stock: 4, min: 1, max: 6, unit: "adet", price: 145_000,
        expiry_offset: None },
];

fn demo_inventory(
    today: NaiveDate,
    created: DateTime<Utc>,
) -> (Vec<InventoryItem>, Vec<StockMovement>) {
    let items: Vec<InventoryItem> = ITEMS
        .iter()
        .map(|row| {
            NewInventoryItem {
                name: row.name.into(),
                category: row.category,
                sku: Some(row.sku.into()),
                barcode: None,
                description: None,
                manufacturer: None,
                current_stock: row.stock,
                min_stock_level: row.min,
                max_stock_level: row.max,
                unit: row.unit.into(),
                unit_price: row.price,
                expiry_date: row.expiry_offset.map(|d| today + days(d)),
                location: Some("Ana depo".into()),
                notes: None,
            }
            .into_item(row.id.into(), today, created)
        })
        .collect();

    let movement = |id: &str, item: &InventoryItem, kind, quantity: u32, previous: u32, ago: i64| {
        let when = at(today - days(ago), 15, 0);
        StockMovement {
            id: id.into(),
            item_id: item.id.clone(),
            item_name: Some(item.name.clone()),
            kind,
            quantity,
            previous_stock: previous,
            new_stock: item.current_stock,
            reason: None,
            reference_number: None,
            performed_by: NURSE_ID.into(),
            created_at: when,
            updated_at: when,
        }
    };
    let movements = vec![
        movement("mov-001", &items[0], StockMovementType::Purchase, 200, 40, 20),
        movement("mov-002", &items[2], StockMovementType::Usage, 6, 6, 2),
    ];
    (items, movements)
}

fn demo_notifications(today: NaiveDate) -> Vec<Notification> {
    let rows = [
        ("ntf-001", DOCTOR_AYSE_ID, NotificationType::AppointmentReminder,
            NotificationPriority::Medium, "Yaklaşan randevu",
            "Ali Öztürk bugün 09:00 randevusuna gelecek", 0, false),
        ("ntf-002", ADMIN_ID, NotificationType::StockAlert, NotificationPriority::Urgent,
            "Stok tükendi", "Nitril Eldiven stok tükendi", 2, false),
        ("ntf-003", ADMIN_ID, NotificationType::StockAlert, NotificationPriority::High,
            "Düşük stok", "Amoksisilin 1000 mg düşük stokta (8 kutu)", 3, false),
        ("ntf-004", RECEPTION_ID, NotificationType::PaymentReceived, NotificationPriority::Low,
            "Ödeme alındı", "Elif Çelik için 500,00 ₺ ödeme alındı", 7, true),
        ("ntf-005", DOCTOR_MEHMET_ID, NotificationType::LabResultReady,
            NotificationPriority::High, "Tahlil sonucu hazır",
            "Elif Çelik TSH sonucu referans dışında", 6, false),
    ];
    rows.into_iter()
        .map(|(id, user, kind, priority, title, message, ago, read)| {
            let when = at(today - days(ago), 8, 30);
            let mut n = NewNotification {
                user_id: user.into(),
                kind,
                priority,
                title: title.into(),
                message: message.into(),
                data: None,
                action_url: None,
            }
            .into_notification(id.into(), when);
            if read {
                n.status = NotificationStatus::Read;
                n.read_at = Some(when + Duration::hours(1));
            }
            n
        })
        .collect()
}
