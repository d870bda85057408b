use std::collections::HashMap;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{hhmm, Contact};
use super::enums::{UserRole, UserStatus};
use crate::mock_api::{ApiError, Patch};
use crate::rules;

/// One working interval within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

/// Weekday name (`monday`, ...) to working intervals.
pub type WeeklySchedule = HashMap<String, Vec<WorkingHours>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub role: UserRole,
    pub status: UserStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<WeeklySchedule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

entity!(User, "User");

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// Form payload for creating a user. The password never lands on `User`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    #[serde(default = "default_user_status")]
    pub status: UserStatus,
    #[serde(default)]
    pub contact: Option<Contact>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub working_hours: Option<WeeklySchedule>,
}

fn default_user_status() -> UserStatus {
    UserStatus::Active
}

impl NewUser {
    /// Splits the payload into the stored user and the plaintext password.
    pub fn into_user(self, id: String, now: DateTime<Utc>) -> (User, String) {
        let user = User {
            id,
            full_name: rules::full_name(&self.first_name, &self.last_name),
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            status: self.status,
            contact: self.contact,
            avatar: self.avatar,
            last_login: None,
            specialization: self.specialization,
            license_number: self.license_number,
            department: self.department,
            working_hours: self.working_hours,
            created_at: now,
            updated_at: now,
        };
        (user, self.password)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub contact: Option<Contact>,
    pub avatar: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub department: Option<String>,
    pub working_hours: Option<WeeklySchedule>,
}

impl Patch<User> for UserUpdate {
    fn apply(self, user: &mut User) -> Result<(), ApiError> {
        let renamed = self.first_name.is_some() || self.last_name.is_some();
        let src = self;
        merge_fields!(src => user;
            email, first_name, last_name, role, status;
            optional contact, avatar, last_login, specialization,
            license_number, department, working_hours);
        if renamed {
            user.full_name = rules::full_name(&user.first_name, &user.last_name);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserFilters {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub department: Option<String>,
}

impl UserFilters {
    pub fn matches(&self, user: &User) -> bool {
        self.role.map_or(true, |r| user.role == r)
            && self.status.map_or(true, |s| user.status == s)
            && self
                .department
                .as_ref()
                .map_or(true, |d| user.department.as_ref() == Some(d))
    }
}

/// Logged-in user plus bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user() -> NewUser {
        NewUser {
            email: "zeynep@klinik.com".into(),
            password: "secret1".into(),
            first_name: "Zeynep".into(),
            last_name: "Kaya".into(),
            role: UserRole::Doctor,
            status: UserStatus::Active,
            contact: None,
            avatar: None,
            specialization: Some("Kardiyoloji".into()),
            license_number: None,
            department: None,
            working_hours: None,
        }
    }

    #[test]
    fn password_is_split_off() {
        let (user, password) = new_user().into_user("u9".into(), Utc::now());
        assert_eq!(password, "secret1");
        assert_eq!(user.full_name, "Zeynep Kaya");
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret1"));
    }

    #[test]
    fn rename_recomputes_full_name() {
        let (mut user, _) = new_user().into_user("u9".into(), Utc::now());
        UserUpdate {
            first_name: Some("Elif".into()),
            ..Default::default()
        }
        .apply(&mut user)
        .unwrap();
        assert_eq!(user.full_name, "Elif Kaya");
    }

    #[test]
    fn session_expiry_is_inclusive() {
        let (user, _) = new_user().into_user("u9".into(), Utc::now());
        let now = Utc::now();
        let session = AuthSession {
            user,
            token: "t".into(),
            expires_at: now,
        };
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - chrono::Duration::seconds(1)));
    }

    #[test]
    fn working_hours_use_clock_strings() {
        let hours: WorkingHours = serde_json::from_str(r#"{"start":"09:00","end":"17:30"}"#).unwrap();
        assert_eq!(hours.end, NaiveTime::from_hms_opt(17, 30, 0).unwrap());
    }
}
