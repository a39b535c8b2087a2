use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{ContactField, ContactStatus, UserEmail, UserEmailStatus};

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// -- Categories --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCategoryRequest {
    pub name: String,
}

// -- Contacts --

/// Defaults for a new contact row. Every field is optional; an empty body
/// creates the same blank row as the grid's "add row" action.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateContactRequest {
    pub business_name: Option<String>,
    pub email: Option<String>,
    pub mobile_number: Option<String>,
    pub status: Option<ContactStatus>,
    pub link: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateContactRequest {
    pub field: ContactField,
    pub value: String,
}

// -- User credits --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddUserEmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct UserEmailQuery {
    pub base: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserEmailStatusRequest {
    pub status: UserEmailStatus,
}

#[derive(Debug, Serialize)]
pub struct UserEmailResponse {
    #[serde(flatten)]
    pub row: UserEmail,
    /// Row was copied and the daily reset has not happened yet.
    pub copy_window_active: bool,
}

// -- Bulk transfer --

pub const ENVELOPE_VERSION: &str = "1.0";

pub type Record = Map<String, Value>;

/// Whole-store snapshot produced by export and accepted by import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub tables: BTreeMap<String, Vec<Record>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableTally {
    pub inserted: u64,
    pub errors: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    pub success: bool,
    pub results: BTreeMap<String, TableTally>,
}
