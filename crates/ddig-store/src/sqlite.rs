use std::path::Path;

use ddig_core::{Category, Record};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::query::{ListQuery, Order, RecordId};
use crate::schema;
use crate::{check_category, RecordStore};

/// SQLite-backed store. The single connection is guarded by a mutex, which
/// also serializes appends per category.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("create dir: {e}")))?;
        }
        let conn = Connection::open(path)?;
        let store = Self::init(conn)?;
        info!(path = %path.display(), "sqlite store opened");
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(schema::PRAGMAS)
            .map_err(|e| StoreError::Database(format!("pragmas: {e}")))?;
        conn.execute_batch(schema::CREATE_TABLES)
            .map_err(|e| StoreError::Database(format!("schema: {e}")))?;

        let version: Option<u32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .optional()?;
        if version.is_none() {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [schema::SCHEMA_VERSION],
            )?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn decode(category: Category, seq: i64, body: &str) -> Option<Record> {
        let decoded = serde_json::from_str::<Value>(body)
            .map_err(StoreError::from)
            .and_then(|v| Record::from_value(category, v).map_err(StoreError::from));
        match decoded {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(category = %category, seq, error = %e, "skipping unreadable record");
                None
            }
        }
    }
}

impl RecordStore for SqliteStore {
    fn append(&self, category: Category, record: &Record) -> Result<RecordId, StoreError> {
        check_category(category, record)?;
        let body = serde_json::to_string(&record.to_value())?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO records (category, record_id, event_name, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                category.as_str(),
                record.id(),
                record.event_name(),
                body,
                record.created_at().to_rfc3339(),
            ],
        )
        .map_err(|e| match StoreError::from(e) {
            StoreError::Conflict(_) => StoreError::Conflict(format!(
                "{category} id {} already exists",
                record.id().unwrap_or_default()
            )),
            other => other,
        })?;

        let id = match record.id() {
            Some(id) => RecordId::natural(id),
            None => {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM records WHERE category = ?1",
                    [category.as_str()],
                    |row| row.get(0),
                )?;
                RecordId::positional(usize::try_from(count).unwrap_or_default())
            }
        };
        debug!(category = %category, id = %id, "record appended");
        Ok(id)
    }

    fn list(&self, category: Category, query: &ListQuery) -> Result<Vec<Record>, StoreError> {
        let category_name = category.as_str();
        let event = query.event.as_deref().map(str::trim);
        let mut args: Vec<&dyn ToSql> = vec![&category_name];

        let mut sql = String::from("SELECT seq, body FROM records WHERE category = ?1");
        if let Some(event) = &event {
            sql.push_str(" AND trim(event_name) = ?2 COLLATE NOCASE");
            args.push(event);
        }
        sql.push_str(match query.order {
            Order::NewestFirst => " ORDER BY seq DESC",
            Order::OldestFirst => " ORDER BY seq ASC",
        });
        // The active flag lives in the body, so capping waits for decode.
        if let (Some(limit), false) = (query.limit, query.active_only) {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(args.as_slice(), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records: Vec<Record> = rows
            .iter()
            .filter_map(|(seq, body)| Self::decode(category, *seq, body))
            .filter(|r| !query.active_only || r.is_active())
            .collect();
        if let Some(limit) = query.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    fn get(&self, category: Category, id: &str) -> Result<Record, StoreError> {
        let conn = self.conn.lock();
        let body: String = conn
            .query_row(
                "SELECT body FROM records WHERE category = ?1 AND record_id = ?2",
                params![category.as_str(), id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("{category} record {id}")))?;
        let value = serde_json::from_str::<Value>(&body)?;
        Ok(Record::from_value(category, value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ddig_core::{EventRegistration, NewsletterSubscriber};

    fn registration(n: u32, event: &str) -> Record {
        Record::Registration(EventRegistration {
            id: format!("DDIG-20250325-{}", 1000 + n),
            full_name: format!("Attendee {n}"),
            email: format!("a{n}@x.com"),
            phone: None,
            location: None,
            profession: None,
            diaspora_status: None,
            attendee_type: Some("in-person".into()),
            event_name: event.to_string(),
            additional_info: None,
            newsletter_opt_in: true,
            terms_accepted: true,
            created_at: Utc.with_ymd_and_hms(2025, 3, 25, 9, 0, n % 60).unwrap(),
        })
    }

    fn subscriber(email: &str) -> Record {
        Record::Subscriber(NewsletterSubscriber {
            email: email.into(),
            subscribed_at: Utc::now(),
            source_ip: "10.0.0.1".into(),
            is_active: true,
        })
    }

    #[test]
    fn append_list_get() {
        let store = SqliteStore::in_memory().unwrap();
        for n in 0..3 {
            store.append(Category::Registrations, &registration(n, "Summit")).unwrap();
        }
        let listed = store.list(Category::Registrations, &ListQuery::recent()).unwrap();
        let ids: Vec<_> = listed.iter().filter_map(Record::id).collect();
        assert_eq!(ids, vec!["DDIG-20250325-1002", "DDIG-20250325-1001", "DDIG-20250325-1000"]);

        let got = store.get(Category::Registrations, "DDIG-20250325-1001").unwrap();
        assert_eq!(got, registration(1, "Summit"));
    }

    #[test]
    fn duplicate_id_conflicts() {
        let store = SqliteStore::in_memory().unwrap();
        store.append(Category::Registrations, &registration(1, "Summit")).unwrap();
        let err = store
            .append(Category::Registrations, &registration(1, "Summit"))
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn subscribers_get_positions() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.append(Category::Newsletter, &subscriber("a@x.com")).unwrap().as_str(), "#1");
        assert_eq!(store.append(Category::Newsletter, &subscriber("a@x.com")).unwrap().as_str(), "#2");
        let listed = store.list(Category::Newsletter, &ListQuery::export()).unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn categories_are_independent() {
        let store = SqliteStore::in_memory().unwrap();
        store.append(Category::Newsletter, &subscriber("a@x.com")).unwrap();
        assert!(store.list(Category::Contacts, &ListQuery::export()).unwrap().is_empty());
        assert!(matches!(
            store.get(Category::Contacts, "INQ-20250325-100"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn event_filter_and_cap_run_in_sql() {
        let store = SqliteStore::in_memory().unwrap();
        for n in 0..5 {
            store.append(Category::Registrations, &registration(n, "Summit")).unwrap();
        }
        for n in 5..8 {
            store.append(Category::Registrations, &registration(n, "Networking")).unwrap();
        }

        let query = ListQuery {
            event: Some("  SUMMIT ".into()),
            limit: Some(2),
            ..ListQuery::default()
        };
        let listed = store.list(Category::Registrations, &query).unwrap();
        let ids: Vec<_> = listed.iter().filter_map(Record::id).collect();
        assert_eq!(ids, vec!["DDIG-20250325-1004", "DDIG-20250325-1003"]);

        let oldest = store
            .list(
                Category::Registrations,
                &ListQuery {
                    order: Order::OldestFirst,
                    limit: Some(1),
                    ..ListQuery::default()
                },
            )
            .unwrap();
        assert_eq!(oldest[0].id(), Some("DDIG-20250325-1000"));
    }

    #[test]
    fn reopen_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ddig.db");
        SqliteStore::open(&path)
            .unwrap()
            .append(Category::Registrations, &registration(7, "Networking"))
            .unwrap();
        let store = SqliteStore::open(&path).unwrap();
        let listed = store
            .list(Category::Registrations, &ListQuery::for_event("networking"))
            .unwrap();
        assert_eq!(listed.len(), 1);
    }
}
