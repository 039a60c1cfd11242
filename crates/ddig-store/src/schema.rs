/// Connection pragmas applied on open.
pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;
"#;

/// All categories share one table; `seq` preserves append order and
/// `record_id` is NULL for categories without natural ids.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    category    TEXT NOT NULL,
    record_id   TEXT,
    event_name  TEXT,
    body        TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE (category, record_id)
);

CREATE INDEX IF NOT EXISTS idx_records_category ON records(category, seq);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

pub const SCHEMA_VERSION: u32 = 1;
