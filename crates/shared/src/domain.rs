use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(MemberId);
id_newtype!(ContributionId);
id_newtype!(StatementId);
id_newtype!(NotificationId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::Member];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

/// The authenticated identity. This is also the shape of the persisted
/// session record, so field names follow the stored JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "id")]
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextOfKin {
    pub name: String,
    pub relationship: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub id: MemberId,
    pub passport_photo: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub employer_name: String,
    pub employer_id: String,
    pub employer_address: String,
    pub employment_date: NaiveDate,
    pub next_of_kin: NextOfKin,
}

impl MemberProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionType {
    Mandatory,
    Voluntary,
}

impl ContributionType {
    pub fn label(self) -> &'static str {
        match self {
            ContributionType::Mandatory => "Mandatory",
            ContributionType::Voluntary => "Voluntary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionStatus {
    Pending,
    Processed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: ContributionId,
    pub date: NaiveDate,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: ContributionType,
    pub status: ContributionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employer_contribution: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_contribution: Option<f64>,
}

impl Contribution {
    pub fn from_draft(id: ContributionId, draft: NewContribution) -> Self {
        Self {
            id,
            date: draft.date,
            amount: draft.amount,
            kind: draft.kind,
            status: draft.status,
            description: draft.description,
            employer_contribution: draft.employer_contribution,
            employee_contribution: draft.employee_contribution,
        }
    }

    pub fn is_in_month_of(&self, date: NaiveDate) -> bool {
        self.date.year() == date.year() && self.date.month() == date.month()
    }
}

/// A contribution as submitted, before an id has been assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContribution {
    pub date: NaiveDate,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: ContributionType,
    pub status: ContributionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employer_contribution: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_contribution: Option<f64>,
}

impl NewContribution {
    pub fn new(date: NaiveDate, amount: f64, kind: ContributionType) -> Self {
        Self {
            date,
            amount,
            kind,
            status: ContributionStatus::Pending,
            description: None,
            employer_contribution: None,
            employee_contribution: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub id: StatementId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub contributions: Vec<Contribution>,
    pub opening_balance: f64,
    pub closing_balance: f64,
    pub total_contributions: f64,
    pub earnings: f64,
    pub fees: f64,
    pub generated_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    pub date: DateTime<Utc>,
    pub is_read: bool,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_serializes_with_stored_field_names() {
        let session = Session {
            user_id: UserId::new("1"),
            name: "Admin User".into(),
            email: "admin@example.com".into(),
            role: Role::Admin,
            avatar_url: Some("https://i.pravatar.cc/150?u=admin".into()),
        };

        let raw = serde_json::to_value(&session).expect("serialize");
        assert_eq!(raw["id"], "1");
        assert_eq!(raw["role"], "admin");
        assert_eq!(raw["avatarUrl"], "https://i.pravatar.cc/150?u=admin");

        let back: Session = serde_json::from_value(raw).expect("deserialize");
        assert_eq!(back, session);
    }

    #[test]
    fn session_without_avatar_parses() {
        let raw = r#"{"id":"2","name":"John Doe","email":"member@example.com","role":"member"}"#;
        let session: Session = serde_json::from_str(raw).expect("parse");
        assert_eq!(session.role, Role::Member);
        assert!(session.avatar_url.is_none());
    }

    #[test]
    fn month_match_ignores_day() {
        let draft = NewContribution::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"),
            100.0,
            ContributionType::Mandatory,
        );
        let contribution = Contribution::from_draft(ContributionId::new("c-1"), draft);
        assert!(contribution.is_in_month_of(NaiveDate::from_ymd_opt(2024, 3, 31).expect("date")));
        assert!(!contribution.is_in_month_of(NaiveDate::from_ymd_opt(2023, 3, 15).expect("date")));
    }
}
