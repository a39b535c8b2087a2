//! Database row types. These map directly to SQLite rows and are converted
//! into `portal_types::models` records at the query boundary.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use uuid::Uuid;

use portal_types::models::{Category, Contact, EmailTemplate, UserEmail};
use portal_types::time::parse_timestamp;

use crate::{StoreError, StoreResult};

pub(crate) const CONTACT_COLUMNS: &str = "id, category_id, business_name, email, mobile_number, status, link, notes, last_contacted_at, contact_count, created_at, updated_at";
pub(crate) const CATEGORY_COLUMNS: &str = "id, name, created_at";
pub(crate) const TEMPLATE_COLUMNS: &str = "id, name, subject, body, created_at, updated_at";
pub(crate) const USER_EMAIL_COLUMNS: &str = "id, email, status, credits, monthly_credits, max_monthly_credits, last_copied_at, created_at";

pub struct ContactRow {
    pub id: String,
    pub category_id: String,
    pub business_name: Option<String>,
    pub email: Option<String>,
    pub mobile_number: Option<String>,
    pub status: String,
    pub link: Option<String>,
    pub notes: Option<String>,
    pub last_contacted_at: Option<String>,
    pub contact_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl ContactRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            category_id: row.get(1)?,
            business_name: row.get(2)?,
            email: row.get(3)?,
            mobile_number: row.get(4)?,
            status: row.get(5)?,
            link: row.get(6)?,
            notes: row.get(7)?,
            last_contacted_at: row.get(8)?,
            contact_count: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl TryFrom<ContactRow> for Contact {
    type Error = StoreError;

    fn try_from(row: ContactRow) -> StoreResult<Self> {
        const T: &str = "contacts";
        Ok(Contact {
            id: uuid(T, &row.id)?,
            category_id: uuid(T, &row.category_id)?,
            status: row
                .status
                .parse()
                .map_err(|e| StoreError::invalid_row(T, e))?,
            last_contacted_at: row
                .last_contacted_at
                .as_deref()
                .map(|ts| timestamp(T, ts))
                .transpose()?,
            created_at: timestamp(T, &row.created_at)?,
            updated_at: timestamp(T, &row.updated_at)?,
            business_name: row.business_name,
            email: row.email,
            mobile_number: row.mobile_number,
            link: row.link,
            notes: row.notes,
            contact_count: row.contact_count,
        })
    }
}

pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

impl CategoryRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
        })
    }
}

impl TryFrom<CategoryRow> for Category {
    type Error = StoreError;

    fn try_from(row: CategoryRow) -> StoreResult<Self> {
        const T: &str = "contact_categories";
        Ok(Category {
            id: uuid(T, &row.id)?,
            created_at: timestamp(T, &row.created_at)?,
            name: row.name,
        })
    }
}

pub struct TemplateRow {
    pub id: String,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TemplateRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            subject: row.get(2)?,
            body: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

impl TryFrom<TemplateRow> for EmailTemplate {
    type Error = StoreError;

    fn try_from(row: TemplateRow) -> StoreResult<Self> {
        const T: &str = "email_templates";
        Ok(EmailTemplate {
            id: uuid(T, &row.id)?,
            created_at: timestamp(T, &row.created_at)?,
            updated_at: timestamp(T, &row.updated_at)?,
            name: row.name,
            subject: row.subject,
            body: row.body,
        })
    }
}

pub struct UserEmailRow {
    pub id: String,
    pub email: String,
    pub status: String,
    pub credits: i64,
    pub monthly_credits: i64,
    pub max_monthly_credits: i64,
    pub last_copied_at: Option<String>,
    pub created_at: String,
}

impl UserEmailRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            status: row.get(2)?,
            credits: row.get(3)?,
            monthly_credits: row.get(4)?,
            max_monthly_credits: row.get(5)?,
            last_copied_at: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

impl TryFrom<UserEmailRow> for UserEmail {
    type Error = StoreError;

    fn try_from(row: UserEmailRow) -> StoreResult<Self> {
        const T: &str = "user_emails";
        Ok(UserEmail {
            id: uuid(T, &row.id)?,
            status: row
                .status
                .parse()
                .map_err(|e| StoreError::invalid_row(T, e))?,
            last_copied_at: row
                .last_copied_at
                .as_deref()
                .map(|ts| timestamp(T, ts))
                .transpose()?,
            created_at: timestamp(T, &row.created_at)?,
            email: row.email,
            credits: row.credits,
            monthly_credits: row.monthly_credits,
            max_monthly_credits: row.max_monthly_credits,
        })
    }
}

fn uuid(table: &'static str, raw: &str) -> StoreResult<Uuid> {
    raw.parse()
        .map_err(|e| StoreError::invalid_row(table, format!("bad id '{raw}': {e}")))
}

pub(crate) fn timestamp(table: &'static str, raw: &str) -> StoreResult<DateTime<Utc>> {
    parse_timestamp(raw)
        .ok_or_else(|| StoreError::invalid_row(table, format!("bad timestamp '{raw}'")))
}
