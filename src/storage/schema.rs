//! Database schema definitions
//!
//! The bookkeeping tables are fixed; post tables are created on first append,
//! one per board, all with the same column layout.

/// SQL schema for the bookkeeping tables
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS harvest_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Per-board outcome of each run
CREATE TABLE IF NOT EXISTS board_reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES harvest_runs(id),
    board_id TEXT NOT NULL,
    output_table TEXT NOT NULL,
    links_discovered INTEGER NOT NULL,
    discovery_stop TEXT,
    complete INTEGER NOT NULL,
    partially_failed INTEGER NOT NULL,
    failed INTEGER NOT NULL,
    skipped_duplicates INTEGER NOT NULL,
    persisted INTEGER NOT NULL,
    flush_sizes TEXT NOT NULL,
    unreachable TEXT,
    persistence_error TEXT
);

CREATE INDEX IF NOT EXISTS idx_board_reports_run ON board_reports(run_id);
"#;

/// Names the bookkeeping schema reserves
pub const RESERVED_TABLES: &[&str] = &["harvest_runs", "board_reports"];

/// Columns of every post table, in insertion order
pub const POST_COLUMNS: &[&str] = &[
    "id",
    "link",
    "title",
    "body",
    "comments",
    "status",
    "crawled_at",
];

/// Quotes an identifier for SQLite
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// DDL for one post table and its identifier index
///
/// The identifier is indexed but not unique; appends accept
/// duplicate rows.
pub fn post_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL,
            link TEXT NOT NULL,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            comments TEXT NOT NULL,
            status TEXT NOT NULL,
            crawled_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS {index} ON {table}(id);",
        table = quote_ident(table),
        index = quote_ident(&format!("{}_id_idx", table)),
    )
}

/// Initializes the bookkeeping schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
