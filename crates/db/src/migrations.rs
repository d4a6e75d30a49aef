/// Inline SQL migrations for the voicetime database schema.
///
/// We use simple inline migrations rather than sqlx migration files
/// because the schema is small and self-contained.

pub const MIGRATIONS: &[&str] = &[
    // Migration 1: session_records table (append-only history)
    r#"
CREATE TABLE IF NOT EXISTS session_records (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    username TEXT NOT NULL,
    channel_id INTEGER NOT NULL,
    channel_name TEXT NOT NULL,
    started_at INTEGER NOT NULL,
    ended_at INTEGER NOT NULL,
    duration_secs INTEGER NOT NULL CHECK (duration_secs >= 0)
);
"#,
    // Migrations 2-3: record lookup indexes. User history is always read
    // in start order; duo queries scan by channel.
    r#"
CREATE INDEX IF NOT EXISTS idx_records_user_started ON session_records(user_id, started_at);
"#,
    r#"
CREATE INDEX IF NOT EXISTS idx_records_channel_started ON session_records(channel_id, started_at);
"#,
    // Migration 4: user_totals table (one upserted row per user)
    r#"
CREATE TABLE IF NOT EXISTS user_totals (
    user_id INTEGER PRIMARY KEY,
    username TEXT NOT NULL DEFAULT '',
    total_secs INTEGER NOT NULL DEFAULT 0 CHECK (total_secs >= 0)
);
"#,
];
