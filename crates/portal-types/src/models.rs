use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// -- Categories --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// -- Contacts --

/// Pipeline stage of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactStatus {
    Lead,
    Contacted,
    Rejected,
    #[serde(rename = "Demo Stage")]
    DemoStage,
    #[serde(rename = "Decision Pending")]
    DecisionPending,
    #[serde(rename = "Closed Won")]
    ClosedWon,
    #[serde(rename = "Closed Lost")]
    ClosedLost,
    Completed,
}

impl ContactStatus {
    pub const ALL: [ContactStatus; 8] = [
        Self::Lead,
        Self::Contacted,
        Self::Rejected,
        Self::DemoStage,
        Self::DecisionPending,
        Self::ClosedWon,
        Self::ClosedLost,
        Self::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lead => "Lead",
            Self::Contacted => "Contacted",
            Self::Rejected => "Rejected",
            Self::DemoStage => "Demo Stage",
            Self::DecisionPending => "Decision Pending",
            Self::ClosedWon => "Closed Won",
            Self::ClosedLost => "Closed Lost",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactStatus {
    type Err = FieldError;

    /// Exact match only; enumerated values are never trimmed or case-folded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| FieldError::InvalidStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub category_id: Uuid,
    pub business_name: Option<String>,
    pub email: Option<String>,
    pub mobile_number: Option<String>,
    pub status: ContactStatus,
    pub link: Option<String>,
    pub notes: Option<String>,
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub contact_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// Current value of an editable column, as shown in the grid.
    pub fn field_text(&self, field: ContactField) -> Option<&str> {
        match field {
            ContactField::BusinessName => self.business_name.as_deref(),
            ContactField::Email => self.email.as_deref(),
            ContactField::MobileNumber => self.mobile_number.as_deref(),
            ContactField::Status => Some(self.status.as_str()),
            ContactField::Link => self.link.as_deref(),
            ContactField::Notes => self.notes.as_deref(),
        }
    }

    /// True when none of the identifying fields (name, email, mobile) hold text.
    pub fn is_blank(&self) -> bool {
        [&self.business_name, &self.email, &self.mobile_number]
            .into_iter()
            .all(|v| v.as_deref().is_none_or(|s| s.trim().is_empty()))
    }
}

/// Caller-supplied defaults for a new contact. The store fills in id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContact {
    pub category_id: Uuid,
    pub business_name: Option<String>,
    pub email: Option<String>,
    pub mobile_number: Option<String>,
    pub status: ContactStatus,
    pub link: Option<String>,
    pub notes: Option<String>,
}

impl NewContact {
    /// The blank row inserted by the grid's "add row" action.
    pub fn blank(category_id: Uuid) -> Self {
        Self {
            category_id,
            business_name: None,
            email: None,
            mobile_number: None,
            status: ContactStatus::Lead,
            link: None,
            notes: None,
        }
    }
}

/// Editable contact columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    BusinessName,
    Email,
    MobileNumber,
    Status,
    Link,
    Notes,
}

impl ContactField {
    pub const ALL: [ContactField; 6] = [
        Self::BusinessName,
        Self::Email,
        Self::MobileNumber,
        Self::Status,
        Self::Link,
        Self::Notes,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Self::BusinessName => "business_name",
            Self::Email => "email",
            Self::MobileNumber => "mobile_number",
            Self::Status => "status",
            Self::Link => "link",
            Self::Notes => "notes",
        }
    }

    pub fn is_enumerated(self) -> bool {
        matches!(self, Self::Status)
    }
}

impl fmt::Display for ContactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("Invalid status: {0:?}")]
    InvalidStatus(String),
}

/// A normalized single-column change to a contact.
#[derive(Debug, Clone, PartialEq)]
pub enum ContactUpdate {
    BusinessName(Option<String>),
    Email(Option<String>),
    MobileNumber(Option<String>),
    Status(ContactStatus),
    Link(Option<String>),
    Notes(Option<String>),
}

impl ContactUpdate {
    /// Text fields are trimmed and stored as null when empty.
    /// The status field is matched verbatim.
    pub fn parse(field: ContactField, raw: &str) -> Result<Self, FieldError> {
        Ok(match field {
            ContactField::BusinessName => Self::BusinessName(normalize_text(raw)),
            ContactField::Email => Self::Email(normalize_text(raw)),
            ContactField::MobileNumber => Self::MobileNumber(normalize_text(raw)),
            ContactField::Status => Self::Status(raw.parse()?),
            ContactField::Link => Self::Link(normalize_text(raw)),
            ContactField::Notes => Self::Notes(normalize_text(raw)),
        })
    }

    pub fn field(&self) -> ContactField {
        match self {
            Self::BusinessName(_) => ContactField::BusinessName,
            Self::Email(_) => ContactField::Email,
            Self::MobileNumber(_) => ContactField::MobileNumber,
            Self::Status(_) => ContactField::Status,
            Self::Link(_) => ContactField::Link,
            Self::Notes(_) => ContactField::Notes,
        }
    }

    /// Value bound to the column on write.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::BusinessName(v)
            | Self::Email(v)
            | Self::MobileNumber(v)
            | Self::Link(v)
            | Self::Notes(v) => v.as_deref(),
            Self::Status(status) => Some(status.as_str()),
        }
    }

    pub fn apply(&self, contact: &mut Contact) {
        match self {
            Self::BusinessName(v) => contact.business_name = v.clone(),
            Self::Email(v) => contact.email = v.clone(),
            Self::MobileNumber(v) => contact.mobile_number = v.clone(),
            Self::Status(status) => contact.status = *status,
            Self::Link(v) => contact.link = v.clone(),
            Self::Notes(v) => contact.notes = v.clone(),
        }
    }
}

/// Trimmed text, or `None` when nothing is left.
pub fn normalize_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Result of an outbound-contact action, as persisted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub contact_count: i64,
    pub last_contacted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Email templates --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: Uuid,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- User credits --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEmailStatus {
    Activated,
    Errors,
}

impl UserEmailStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Activated => "Activated",
            Self::Errors => "Errors",
        }
    }
}

impl FromStr for UserEmailStatus {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Activated" => Ok(Self::Activated),
            "Errors" => Ok(Self::Errors),
            other => Err(FieldError::InvalidStatus(other.to_string())),
        }
    }
}

/// Credits granted to a freshly inserted email variation.
pub const DEFAULT_CREDITS: i64 = 5;
pub const DEFAULT_MAX_MONTHLY_CREDITS: i64 = 30;
/// Monthly credits consumed by one copy action.
pub const CREDITS_PER_COPY: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEmail {
    pub id: Uuid,
    pub email: String,
    pub status: UserEmailStatus,
    pub credits: i64,
    pub monthly_credits: i64,
    pub max_monthly_credits: i64,
    pub last_copied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// -- Managed tables --

/// Tables covered by bulk export/import, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    ContactCategories,
    Contacts,
    EmailTemplates,
    UserEmails,
}

impl Table {
    /// Categories come before contacts, which reference them.
    pub const IMPORT_ORDER: [Table; 4] = [
        Self::ContactCategories,
        Self::Contacts,
        Self::EmailTemplates,
        Self::UserEmails,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ContactCategories => "contact_categories",
            Self::Contacts => "contacts",
            Self::EmailTemplates => "email_templates",
            Self::UserEmails => "user_emails",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::IMPORT_ORDER
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| s.to_string())
    }
}
