use rusqlite::Connection;
use tracing::info;

use crate::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE contact_categories (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE contacts (
                id                 TEXT PRIMARY KEY,
                category_id        TEXT NOT NULL REFERENCES contact_categories(id) ON DELETE CASCADE,
                business_name      TEXT,
                email              TEXT,
                mobile_number      TEXT,
                status             TEXT NOT NULL DEFAULT 'Lead'
                                   CHECK (status IN ('Lead', 'Contacted', 'Rejected', 'Demo Stage',
                                                     'Decision Pending', 'Closed Won', 'Closed Lost',
                                                     'Completed')),
                link               TEXT,
                notes              TEXT,
                last_contacted_at  TEXT,
                contact_count      INTEGER NOT NULL DEFAULT 0 CHECK (contact_count >= 0),
                created_at         TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at         TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_contacts_category
                ON contacts(category_id, created_at);

            CREATE TABLE email_templates (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                subject     TEXT NOT NULL,
                body        TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE user_emails (
                id                   TEXT PRIMARY KEY,
                email                TEXT NOT NULL UNIQUE,
                status               TEXT NOT NULL DEFAULT 'Activated'
                                     CHECK (status IN ('Activated', 'Errors')),
                credits              INTEGER NOT NULL DEFAULT 5,
                monthly_credits      INTEGER NOT NULL DEFAULT 0 CHECK (monthly_credits >= 0),
                max_monthly_credits  INTEGER NOT NULL DEFAULT 30,
                last_copied_at       TEXT,
                created_at           TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_types::models::ContactStatus;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn contact_status_is_checked_against_every_variant() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        conn.execute("INSERT INTO contact_categories (id, name) VALUES ('c', 'Cafes')", [])
            .unwrap();

        let insert = |id: &str, status: &str| {
            conn.execute(
                "INSERT INTO contacts (id, category_id, status) VALUES (?1, 'c', ?2)",
                [id, status],
            )
        };
        for (i, status) in ContactStatus::ALL.into_iter().enumerate() {
            insert(&i.to_string(), status.as_str()).unwrap();
        }
        let err = insert("pending", "Pending").unwrap_err();
        assert!(crate::StoreError::from(err).is_constraint_violation());
    }
}
