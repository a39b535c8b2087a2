use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use portal_types::models::{
    Category, Contact, ContactUpdate, DEFAULT_CREDITS, DEFAULT_MAX_MONTHLY_CREDITS,
    EmailTemplate, Interaction, NewContact, UserEmail, UserEmailStatus,
};
use portal_types::time::{format_timestamp, now};

use crate::models::{
    CATEGORY_COLUMNS, CONTACT_COLUMNS, CategoryRow, ContactRow, TEMPLATE_COLUMNS, TemplateRow,
    USER_EMAIL_COLUMNS, UserEmailRow, timestamp,
};
use crate::{Database, StoreError, StoreResult};

impl Database {
    // -- Categories --

    pub fn list_categories(&self) -> StoreResult<Vec<Category>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CATEGORY_COLUMNS} FROM contact_categories ORDER BY name ASC"
            ))?;
            let rows = stmt
                .query_map([], CategoryRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(Category::try_from).collect()
        })
    }

    pub fn create_category(&self, name: &str) -> StoreResult<Category> {
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: now(),
        };
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO contact_categories (id, name, created_at) VALUES (?1, ?2, ?3)",
                (
                    category.id.to_string(),
                    &category.name,
                    format_timestamp(category.created_at),
                ),
            )?;
            Ok(())
        })?;
        Ok(category)
    }

    // -- Contacts --

    /// All contacts of a category, oldest first.
    pub fn get_contacts(&self, category_id: Uuid) -> StoreResult<Vec<Contact>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts
                 WHERE category_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt
                .query_map([category_id.to_string()], ContactRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(Contact::try_from).collect()
        })
    }

    pub fn get_contact(&self, id: Uuid) -> StoreResult<Option<Contact>> {
        self.with_conn(|conn| query_contact(conn, id))
    }

    pub fn create_contact(&self, new: &NewContact) -> StoreResult<Contact> {
        let created_at = now();
        let contact = Contact {
            id: Uuid::new_v4(),
            category_id: new.category_id,
            business_name: new.business_name.clone(),
            email: new.email.clone(),
            mobile_number: new.mobile_number.clone(),
            status: new.status,
            link: new.link.clone(),
            notes: new.notes.clone(),
            last_contacted_at: None,
            contact_count: 0,
            created_at,
            updated_at: created_at,
        };
        let stamp = format_timestamp(created_at);

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO contacts (id, category_id, business_name, email, mobile_number, status, link, notes, contact_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?9)",
                rusqlite::params![
                    contact.id.to_string(),
                    contact.category_id.to_string(),
                    contact.business_name,
                    contact.email,
                    contact.mobile_number,
                    contact.status.as_str(),
                    contact.link,
                    contact.notes,
                    stamp,
                ],
            )?;
            Ok(())
        })?;

        Ok(contact)
    }

    /// Writes one column and bumps `updated_at`. Returns the new `updated_at`.
    pub fn update_contact_field(
        &self,
        id: Uuid,
        update: &ContactUpdate,
    ) -> StoreResult<DateTime<Utc>> {
        let updated_at = now();
        // Column name comes from the closed ContactField enum, never from input.
        let sql = format!(
            "UPDATE contacts SET {} = ?1, updated_at = ?2 WHERE id = ?3",
            update.field().column()
        );

        let changed = self.with_conn_mut(|conn| {
            Ok(conn.execute(
                &sql,
                rusqlite::params![update.value(), format_timestamp(updated_at), id.to_string()],
            )?)
        })?;

        if changed == 0 {
            return Err(StoreError::not_found("contacts", id));
        }
        Ok(updated_at)
    }

    pub fn delete_contact(&self, id: Uuid) -> StoreResult<()> {
        let changed = self.with_conn_mut(|conn| {
            Ok(conn.execute("DELETE FROM contacts WHERE id = ?1", [id.to_string()])?)
        })?;

        if changed == 0 {
            return Err(StoreError::not_found("contacts", id));
        }
        Ok(())
    }

    /// Atomic `contact_count + 1`. `last_contacted_at` never moves backwards.
    pub fn increment_contact_count(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Interaction> {
        let stamp = format_timestamp(at);

        let row: Option<(i64, String, String)> = self.with_conn_mut(|conn| {
            Ok(conn
                .query_row(
                    "UPDATE contacts
                     SET contact_count = contact_count + 1,
                         last_contacted_at = CASE
                             WHEN last_contacted_at IS NOT NULL AND last_contacted_at > ?1
                             THEN last_contacted_at ELSE ?1 END,
                         updated_at = ?1
                     WHERE id = ?2
                     RETURNING contact_count, last_contacted_at, updated_at",
                    rusqlite::params![stamp, id.to_string()],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?)
        })?;

        let (contact_count, last_contacted_at, updated_at) =
            row.ok_or_else(|| StoreError::not_found("contacts", id))?;

        Ok(Interaction {
            contact_count,
            last_contacted_at: timestamp("contacts", &last_contacted_at)?,
            updated_at: timestamp("contacts", &updated_at)?,
        })
    }

    // -- Email templates --

    pub fn list_email_templates(&self) -> StoreResult<Vec<EmailTemplate>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TEMPLATE_COLUMNS} FROM email_templates ORDER BY name ASC"
            ))?;
            let rows = stmt
                .query_map([], TemplateRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(EmailTemplate::try_from).collect()
        })
    }

    // -- User emails --

    pub fn list_user_email_addresses(&self) -> StoreResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT email FROM user_emails ORDER BY email ASC")?;
            let emails = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(emails)
        })
    }

    /// Batch-fetch the rows for a set of addresses, oldest first.
    pub fn get_user_emails(&self, emails: &[String]) -> StoreResult<Vec<UserEmail>> {
        if emails.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=emails.len()).map(|i| format!("?{i}")).collect();
            let sql = format!(
                "SELECT {USER_EMAIL_COLUMNS} FROM user_emails
                 WHERE email IN ({})
                 ORDER BY created_at ASC, rowid ASC",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(emails), UserEmailRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(UserEmail::try_from).collect()
        })
    }

    /// Inserts the addresses that do not exist yet with default credits.
    /// Returns how many rows were added.
    pub fn insert_user_emails(&self, emails: &[String]) -> StoreResult<usize> {
        let stamp = format_timestamp(now());

        self.with_conn_mut(|conn| {
            let mut stmt = conn.prepare(
                "INSERT OR IGNORE INTO user_emails (id, email, status, credits, monthly_credits, max_monthly_credits, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)",
            )?;
            let mut inserted = 0;
            for email in emails {
                inserted += stmt.execute(rusqlite::params![
                    Uuid::new_v4().to_string(),
                    email,
                    UserEmailStatus::Activated.as_str(),
                    DEFAULT_CREDITS,
                    DEFAULT_MAX_MONTHLY_CREDITS,
                    stamp,
                ])?;
            }
            Ok(inserted)
        })
    }

    pub fn set_user_email_status(&self, id: Uuid, status: UserEmailStatus) -> StoreResult<UserEmail> {
        self.with_conn_mut(|conn| {
            let row = conn
                .query_row(
                    &format!(
                        "UPDATE user_emails SET status = ?1 WHERE id = ?2 RETURNING {USER_EMAIL_COLUMNS}"
                    ),
                    rusqlite::params![status.as_str(), id.to_string()],
                    UserEmailRow::from_row,
                )
                .optional()?;
            row.ok_or_else(|| StoreError::not_found("user_emails", id))?
                .try_into()
        })
    }

    /// Spends one copy worth of monthly credits, capped at the row's maximum,
    /// and stamps `last_copied_at`. Never lowers `monthly_credits`.
    pub fn record_copy(&self, id: Uuid, step: i64, at: DateTime<Utc>) -> StoreResult<UserEmail> {
        self.with_conn_mut(|conn| {
            let row = conn
                .query_row(
                    &format!(
                        "UPDATE user_emails
                         SET monthly_credits = MAX(monthly_credits, MIN(monthly_credits + ?1, max_monthly_credits)),
                             last_copied_at = ?2
                         WHERE id = ?3
                         RETURNING {USER_EMAIL_COLUMNS}"
                    ),
                    rusqlite::params![step, format_timestamp(at), id.to_string()],
                    UserEmailRow::from_row,
                )
                .optional()?;
            row.ok_or_else(|| StoreError::not_found("user_emails", id))?
                .try_into()
        })
    }
}

fn query_contact(conn: &Connection, id: Uuid) -> StoreResult<Option<Contact>> {
    let row = conn
        .query_row(
            &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
            [id.to_string()],
            ContactRow::from_row,
        )
        .optional()?;

    row.map(Contact::try_from).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use portal_types::models::{CREDITS_PER_COPY, ContactField, ContactStatus};

    #[test]
    fn contacts_are_scoped_and_ordered() {
        let t = test_support::open();
        let a = t.db.create_category("Restaurants").unwrap();
        let b = t.db.create_category("Clinics").unwrap();

        let first = t.db.create_contact(&NewContact::blank(a.id)).unwrap();
        let second = t.db.create_contact(&NewContact::blank(a.id)).unwrap();
        t.db.create_contact(&NewContact::blank(b.id)).unwrap();

        let ids: Vec<Uuid> = t.db.get_contacts(a.id).unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[test]
    fn update_writes_null_for_blank_text() {
        let t = test_support::open();
        let cat = t.db.create_category("Leads").unwrap();
        let contact = t.db.create_contact(&NewContact::blank(cat.id)).unwrap();

        let set = ContactUpdate::parse(ContactField::Email, "x@y.com").unwrap();
        t.db.update_contact_field(contact.id, &set).unwrap();
        let clear = ContactUpdate::parse(ContactField::Email, "   ").unwrap();
        t.db.update_contact_field(contact.id, &clear).unwrap();

        let stored = t.db.get_contact(contact.id).unwrap().unwrap();
        assert_eq!(stored.email, None);
    }

    #[test]
    fn update_missing_contact_is_not_found() {
        let t = test_support::open();
        let err = t
            .db
            .update_contact_field(Uuid::new_v4(), &ContactUpdate::Status(ContactStatus::Contacted))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn contact_requires_existing_category() {
        let t = test_support::open();
        let err = t.db.create_contact(&NewContact::blank(Uuid::new_v4())).unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn interaction_increments_and_never_rewinds() {
        let t = test_support::open();
        let cat = t.db.create_category("Leads").unwrap();
        let contact = t.db.create_contact(&NewContact::blank(cat.id)).unwrap();

        let later = now();
        let earlier = later - chrono::Duration::hours(1);

        let first = t.db.increment_contact_count(contact.id, later).unwrap();
        assert_eq!(first.contact_count, 1);

        let second = t.db.increment_contact_count(contact.id, earlier).unwrap();
        assert_eq!(second.contact_count, 2);
        assert_eq!(second.last_contacted_at, first.last_contacted_at);
    }

    #[test]
    fn insert_user_emails_skips_existing() {
        let t = test_support::open();
        let emails = vec!["ab@x.com".to_string(), "a.b@x.com".to_string()];
        assert_eq!(t.db.insert_user_emails(&emails).unwrap(), 2);
        assert_eq!(t.db.insert_user_emails(&emails).unwrap(), 0);

        let rows = t.db.get_user_emails(&emails).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.credits == DEFAULT_CREDITS && r.monthly_credits == 0));
    }

    #[test]
    fn copy_caps_monthly_credits() {
        let t = test_support::open();
        let emails = vec!["cap@x.com".to_string()];
        t.db.insert_user_emails(&emails).unwrap();
        let id = t.db.get_user_emails(&emails).unwrap()[0].id;

        let mut last = 0;
        for _ in 0..10 {
            let row = t.db.record_copy(id, CREDITS_PER_COPY, now()).unwrap();
            assert!(row.monthly_credits >= last);
            assert!(row.monthly_credits <= row.max_monthly_credits);
            assert!(row.last_copied_at.is_some());
            last = row.monthly_credits;
        }
        assert_eq!(last, DEFAULT_MAX_MONTHLY_CREDITS);
    }

    #[test]
    fn status_change_returns_row() {
        let t = test_support::open();
        let emails = vec!["s@x.com".to_string()];
        t.db.insert_user_emails(&emails).unwrap();
        let id = t.db.get_user_emails(&emails).unwrap()[0].id;

        let row = t.db.set_user_email_status(id, UserEmailStatus::Errors).unwrap();
        assert_eq!(row.status, UserEmailStatus::Errors);
        assert!(matches!(
            t.db.set_user_email_status(Uuid::new_v4(), UserEmailStatus::Errors),
            Err(StoreError::NotFound { .. })
        ));
    }
}
