//! Whole-table access used by bulk export/import. Rows travel as JSON
//! objects keyed by column name, so a snapshot restores field-for-field.

use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value};
use uuid::Uuid;

use portal_types::api::Record;
use portal_types::models::{ContactStatus, Table, UserEmailStatus};
use portal_types::time::{format_timestamp, parse_timestamp};

use crate::{Database, StoreError, StoreResult};

pub fn columns(table: Table) -> &'static [&'static str] {
    match table {
        Table::ContactCategories => &["id", "name", "created_at"],
        Table::Contacts => &[
            "id",
            "category_id",
            "business_name",
            "email",
            "mobile_number",
            "status",
            "link",
            "notes",
            "last_contacted_at",
            "contact_count",
            "created_at",
            "updated_at",
        ],
        Table::EmailTemplates => &["id", "name", "subject", "body", "created_at", "updated_at"],
        Table::UserEmails => &[
            "id",
            "email",
            "status",
            "credits",
            "monthly_credits",
            "max_monthly_credits",
            "last_copied_at",
            "created_at",
        ],
    }
}

impl Database {
    /// Every row of a table, in insertion order.
    pub fn select_all(&self, table: Table) -> StoreResult<Vec<Record>> {
        let cols = columns(table);
        let sql = format!("SELECT {} FROM {} ORDER BY rowid ASC", cols.join(", "), table.name());

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query([])?;
            let mut records = Vec::new();

            while let Some(row) = rows.next()? {
                let mut record = Record::new();
                for (idx, col) in cols.iter().enumerate() {
                    let value = json_from_sql(row.get_ref(idx)?)
                        .ok_or_else(|| StoreError::invalid_row(table.name(), format!("unsupported value in {col}")))?;
                    record.insert((*col).to_string(), value);
                }
                records.push(record);
            }

            Ok(records)
        })
    }

    /// Insert-or-update by `id`. Only the columns present in the record are
    /// written. On update, absent columns keep their stored values; on insert
    /// they take the column default, and a record missing a NOT NULL column
    /// without one (`category_id`, `email`, `name`, ...) is rejected even if
    /// the id already exists.
    ///
    /// Ids, timestamps and statuses are validated and stored in canonical
    /// form, so every accepted row reads back as a typed record.
    pub fn upsert_record(&self, table: Table, record: &Record) -> StoreResult<()> {
        let known = columns(table);

        match record.get("id") {
            Some(Value::String(id)) if !id.is_empty() => {}
            _ => return Err(StoreError::invalid_row(table.name(), "missing string id")),
        }

        let mut names = Vec::with_capacity(record.len());
        let mut values = Vec::with_capacity(record.len());
        for (key, value) in record {
            let Some(col) = known.iter().find(|c| **c == key.as_str()) else {
                return Err(StoreError::UnknownColumn {
                    table: table.name(),
                    column: key.clone(),
                });
            };
            names.push(*col);
            values.push(canonical_value(table, col, value)?);
        }

        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
        let updates: Vec<String> = names
            .iter()
            .filter(|c| **c != "id")
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();
        let conflict = if updates.is_empty() {
            "DO NOTHING".to_string()
        } else {
            format!("DO UPDATE SET {}", updates.join(", "))
        };
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(id) {}",
            table.name(),
            names.join(", "),
            placeholders.join(", "),
            conflict
        );

        self.with_conn_mut(|conn| {
            conn.execute(&sql, rusqlite::params_from_iter(values))?;
            Ok(())
        })
    }
}

#[derive(Clone, Copy)]
enum ColumnKind {
    Id,
    Timestamp,
    ContactStatus,
    UserEmailStatus,
    Plain,
}

fn column_kind(table: Table, column: &str) -> ColumnKind {
    match (table, column) {
        (_, "id") | (Table::Contacts, "category_id") => ColumnKind::Id,
        (_, "created_at" | "updated_at" | "last_contacted_at" | "last_copied_at") => ColumnKind::Timestamp,
        (Table::Contacts, "status") => ColumnKind::ContactStatus,
        (Table::UserEmails, "status") => ColumnKind::UserEmailStatus,
        _ => ColumnKind::Plain,
    }
}

/// Typed columns must parse; timestamps are rewritten to the fixed-width UTC
/// form so text comparison in queries stays chronological. Nulls pass through
/// for the schema to accept or reject.
fn canonical_value(table: Table, column: &str, value: &Value) -> StoreResult<SqlValue> {
    let kind = column_kind(table, column);
    if matches!(kind, ColumnKind::Plain) || value.is_null() {
        return Ok(sql_from_json(value));
    }
    let Value::String(raw) = value else {
        return Err(StoreError::invalid_row(table.name(), format!("{column} must be a string")));
    };
    let invalid = |what: &str| StoreError::invalid_row(table.name(), format!("{what} {column}: {raw:?}"));

    let canonical = match kind {
        ColumnKind::Id => raw.parse::<Uuid>().map_err(|_| invalid("invalid UUID in"))?.to_string(),
        ColumnKind::Timestamp => parse_timestamp(raw)
            .map(format_timestamp)
            .ok_or_else(|| invalid("invalid timestamp in"))?,
        ColumnKind::ContactStatus => raw
            .parse::<ContactStatus>()
            .map_err(|_| invalid("unknown"))?
            .as_str()
            .to_string(),
        ColumnKind::UserEmailStatus => raw
            .parse::<UserEmailStatus>()
            .map_err(|_| invalid("unknown"))?
            .as_str()
            .to_string(),
        ColumnKind::Plain => raw.clone(),
    };
    Ok(SqlValue::Text(canonical))
}

fn json_from_sql(value: ValueRef<'_>) -> Option<Value> {
    match value {
        ValueRef::Null => Some(Value::Null),
        ValueRef::Integer(i) => Some(Value::from(i)),
        ValueRef::Real(f) => Some(Number::from_f64(f).map_or(Value::Null, Value::Number)),
        ValueRef::Text(bytes) => Some(Value::String(String::from_utf8_lossy(bytes).into_owned())),
        ValueRef::Blob(_) => None,
    }
}

fn sql_from_json(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        // Nested structures are stored as their JSON text
        other => SqlValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn upsert_inserts_then_replaces() {
        let t = test_support::open();
        let id = "6f2c1a8e-3b7d-4e52-9c1a-2d8f4b6e0a11";
        let first = record(json!({"id": id, "name": "Dentists", "created_at": "2024-01-01T00:00:00.000Z"}));
        t.db.upsert_record(Table::ContactCategories, &first).unwrap();

        let second = record(json!({"id": id, "name": "Orthodontists"}));
        t.db.upsert_record(Table::ContactCategories, &second).unwrap();

        let rows = t.db.select_all(Table::ContactCategories).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("Orthodontists"));
        assert_eq!(rows[0]["created_at"], json!("2024-01-01T00:00:00.000Z"));
    }

    #[test]
    fn upsert_rejects_unknown_columns_and_missing_id() {
        let t = test_support::open();
        let err = t
            .db
            .upsert_record(
                Table::ContactCategories,
                &record(json!({"id": "0b8f7c62-5d1e-4a3b-8c9d-7e6f5a4b3c2d", "colour": "red"})),
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownColumn { .. }));

        let err = t
            .db
            .upsert_record(Table::ContactCategories, &record(json!({"name": "No id"})))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRow { .. }));
    }

    #[test]
    fn select_all_preserves_types() {
        let t = test_support::open();
        let row = record(json!({
            "id": "a1e2c3d4-0000-4000-8000-000000000001",
            "email": "typed@x.com",
            "status": "Activated",
            "credits": 5,
            "monthly_credits": 10,
            "max_monthly_credits": 30,
            "last_copied_at": null,
            "created_at": "2024-02-01T00:00:00.000Z"
        }));
        t.db.upsert_record(Table::UserEmails, &row).unwrap();

        let rows = t.db.select_all(Table::UserEmails).unwrap();
        assert_eq!(rows, vec![row]);
    }

    fn contact(category_id: Uuid, id: &str, extra: Value) -> Record {
        let mut row = record(json!({ "id": id, "category_id": category_id.to_string() }));
        row.extend(record(extra));
        row
    }

    #[test]
    fn bad_contact_status_is_rejected_and_category_stays_readable() {
        let t = test_support::open();
        let category = t.db.create_category("Cafes").unwrap();
        let good = contact(category.id, "11111111-1111-4111-8111-111111111111", json!({ "status": "Contacted" }));
        let bad = contact(category.id, "22222222-2222-4222-8222-222222222222", json!({ "status": "Pending" }));

        t.db.upsert_record(Table::Contacts, &good).unwrap();
        let err = t.db.upsert_record(Table::Contacts, &bad).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRow { .. }), "{err}");

        let contacts = t.db.get_contacts(category.id).unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].status, ContactStatus::Contacted);
    }

    #[test]
    fn malformed_ids_and_timestamps_are_rejected() {
        let t = test_support::open();
        let category = t.db.create_category("Cafes").unwrap();
        let id = "33333333-3333-4333-8333-333333333333";

        for row in [
            contact(category.id, "not-a-uuid", json!({})),
            record(json!({ "id": id, "category_id": "cafes" })),
            contact(category.id, id, json!({ "created_at": "last tuesday" })),
            contact(category.id, id, json!({ "last_contacted_at": 1_700_000_000 })),
        ] {
            let err = t.db.upsert_record(Table::Contacts, &row).unwrap_err();
            assert!(matches!(err, StoreError::InvalidRow { .. }), "{err}");
        }

        let err = t
            .db
            .upsert_record(
                Table::UserEmails,
                &record(json!({ "id": id, "email": "a@x.com", "status": "Suspended" })),
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRow { .. }), "{err}");
        assert!(t.db.select_all(Table::Contacts).unwrap().is_empty());
        assert!(t.db.select_all(Table::UserEmails).unwrap().is_empty());
    }

    #[test]
    fn offset_timestamps_are_stored_as_utc() {
        let t = test_support::open();
        let category = t.db.create_category("Cafes").unwrap();
        let older = "44444444-4444-4444-8444-444444444444";
        let newer = "55555555-5555-4555-8555-555555555555";

        // 03:00Z written as 12:00+09:00 sorts after 04:00Z as text.
        t.db.upsert_record(
            Table::Contacts,
            &contact(category.id, newer, json!({ "created_at": "2024-03-01T04:00:00.000Z" })),
        )
        .unwrap();
        t.db.upsert_record(
            Table::Contacts,
            &contact(
                category.id,
                older,
                json!({
                    "created_at": "2024-03-01T12:00:00+09:00",
                    "last_contacted_at": "2024-03-01T12:00:00+09:00"
                }),
            ),
        )
        .unwrap();

        let rows = t.db.select_all(Table::Contacts).unwrap();
        assert_eq!(rows[1]["created_at"], json!("2024-03-01T03:00:00.000Z"));

        let ids: Vec<String> = t
            .db
            .get_contacts(category.id)
            .unwrap()
            .iter()
            .map(|c| c.id.to_string())
            .collect();
        assert_eq!(ids, [older, newer]);

        let at = "2024-03-01T03:30:00Z".parse().unwrap();
        let interaction = t.db.increment_contact_count(older.parse().unwrap(), at).unwrap();
        assert_eq!(interaction.last_contacted_at, at);
    }
}
