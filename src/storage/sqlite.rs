//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the post table,
//! maintenance and run log traits. Each board writes to its own SQL table
//! inside one database file.

use crate::state::{BoardReport, DiscoveryStop, ExtractionStatus, PostRecord};
use crate::storage::schema::{initialize_schema, post_table_sql, quote_ident, POST_COLUMNS};
use crate::storage::traits::{
    PostTable, RunLog, StorageError, StorageResult, TableMaintenance,
};
use crate::storage::{validate_table_name, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn checked_table(&self, table: &str) -> StorageResult<String> {
        validate_table_name(table)?;
        Ok(quote_ident(table))
    }
}

impl PostTable for SqliteStorage {
    fn table_exists(&self, table: &str) -> StorageResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn read_column(&self, table: &str, column: &str) -> StorageResult<HashSet<String>> {
        if !POST_COLUMNS.contains(&column) {
            return Err(StorageError::UnknownColumn(column.to_string()));
        }

        let quoted = self.checked_table(table)?;
        if !self.table_exists(table)? {
            return Ok(HashSet::new());
        }

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT DISTINCT {} FROM {}", column, quoted))?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(values)
    }

    fn append_rows(
        &mut self,
        table: &str,
        rows: &[PostRecord],
        write_header_if_new: bool,
    ) -> StorageResult<()> {
        let quoted = self.checked_table(table)?;

        let tx = self.conn.transaction()?;

        if write_header_if_new {
            tx.execute_batch(&post_table_sql(table))?;
        } else {
            let exists: i64 = tx.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Err(StorageError::MissingTable(table.to_string()));
            }
        }

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                quoted,
                POST_COLUMNS.join(", ")
            ))?;

            for record in rows {
                stmt.execute(params![
                    record.id,
                    record.link,
                    record.title,
                    record.body,
                    record.comments_field(),
                    record.status.to_db_string(),
                    record.crawled_at.to_rfc3339(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

impl TableMaintenance for SqliteStorage {
    fn count_rows(&self, table: &str) -> StorageResult<u64> {
        let quoted = self.checked_table(table)?;
        if !self.table_exists(table)? {
            return Ok(0);
        }

        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", quoted), [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }

    fn count_distinct_ids(&self, table: &str) -> StorageResult<u64> {
        let quoted = self.checked_table(table)?;
        if !self.table_exists(table)? {
            return Ok(0);
        }

        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(DISTINCT id) FROM {}", quoted),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_by_status(&self, table: &str) -> StorageResult<HashMap<ExtractionStatus, u64>> {
        let quoted = self.checked_table(table)?;
        let mut summary = HashMap::new();
        if !self.table_exists(table)? {
            return Ok(summary);
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT status, COUNT(*) FROM {} GROUP BY status",
            quoted
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (status_str, count) = row?;
            if let Some(status) = ExtractionStatus::from_db_string(&status_str) {
                summary.insert(status, count as u64);
            }
        }

        Ok(summary)
    }

    fn remove_duplicates(&mut self, table: &str) -> StorageResult<u64> {
        let quoted = self.checked_table(table)?;
        if !self.table_exists(table)? {
            return Ok(0);
        }

        let removed = self.conn.execute(
            &format!(
                "DELETE FROM {t} WHERE row_id NOT IN (SELECT MIN(row_id) FROM {t} GROUP BY id)",
                t = quoted
            ),
            [],
        )?;
        Ok(removed as u64)
    }

    fn read_titles(&self, table: &str) -> StorageResult<Vec<String>> {
        let quoted = self.checked_table(table)?;
        if !self.table_exists(table)? {
            return Ok(Vec::new());
        }

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT title FROM {} ORDER BY row_id", quoted))?;
        let titles = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(titles)
    }
}

impl RunLog for SqliteStorage {
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO harvest_runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE harvest_runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn record_board_report(&mut self, run_id: i64, report: &BoardReport) -> StorageResult<()> {
        let flush_sizes = report
            .flushes
            .iter()
            .map(|size| size.to_string())
            .collect::<Vec<_>>()
            .join(",");

        self.conn.execute(
            "INSERT INTO board_reports (run_id, board_id, output_table, links_discovered,
             discovery_stop, complete, partially_failed, failed, skipped_duplicates, persisted,
             flush_sizes, unreachable, persistence_error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                run_id,
                report.board_id,
                report.output_table,
                report.links_discovered as i64,
                report.discovery_stop.map(|s| s.to_db_string()),
                report.complete as i64,
                report.partially_failed as i64,
                report.failed as i64,
                report.skipped_duplicates as i64,
                report.persisted as i64,
                flush_sizes,
                report.unreachable,
                report.persistence_error,
            ],
        )?;
        Ok(())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status
             FROM harvest_runs ORDER BY id DESC LIMIT 1",
        )?;

        let run = stmt
            .query_row([], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    config_hash: row.get(3)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(RunStatus::Running),
                })
            })
            .optional()?;

        Ok(run)
    }

    fn get_board_reports(&self, run_id: i64) -> StorageResult<Vec<BoardReport>> {
        let mut stmt = self.conn.prepare(
            "SELECT board_id, output_table, links_discovered, discovery_stop, complete,
             partially_failed, failed, skipped_duplicates, persisted, flush_sizes,
             unreachable, persistence_error
             FROM board_reports WHERE run_id = ?1 ORDER BY id",
        )?;

        let reports = stmt
            .query_map(params![run_id], |row| {
                let flush_sizes: String = row.get(9)?;
                Ok(BoardReport {
                    board_id: row.get(0)?,
                    output_table: row.get(1)?,
                    links_discovered: row.get::<_, i64>(2)? as usize,
                    discovery_stop: row
                        .get::<_, Option<String>>(3)?
                        .and_then(|s| DiscoveryStop::from_db_string(&s)),
                    complete: row.get::<_, i64>(4)? as usize,
                    partially_failed: row.get::<_, i64>(5)? as usize,
                    failed: row.get::<_, i64>(6)? as usize,
                    skipped_duplicates: row.get::<_, i64>(7)? as usize,
                    persisted: row.get::<_, i64>(8)? as usize,
                    flushes: flush_sizes
                        .split(',')
                        .filter_map(|s| s.parse().ok())
                        .collect(),
                    unreachable: row.get(10)?,
                    persistence_error: row.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{BoardTarget, UNRESOLVED_TITLE};

    fn record(id: &str, status: ExtractionStatus) -> PostRecord {
        PostRecord {
            id: id.to_string(),
            link: format!("https://forum.example.com/p/{}", id),
            title: format!("title {}", id),
            body: "body".to_string(),
            comments: vec!["nice".to_string(), "agreed".to_string()],
            status,
            crawled_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteStorage::in_memory().is_ok());
    }

    #[test]
    fn test_append_creates_table_once() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        assert!(!storage.table_exists("travel").unwrap());

        storage
            .append_rows("travel", &[record("1", ExtractionStatus::Complete)], true)
            .unwrap();
        assert!(storage.table_exists("travel").unwrap());

        storage
            .append_rows("travel", &[record("2", ExtractionStatus::Complete)], false)
            .unwrap();
        assert_eq!(storage.count_rows("travel").unwrap(), 2);
    }

    #[test]
    fn test_append_to_missing_table_without_header_fails() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        let result = storage.append_rows("food", &[record("1", ExtractionStatus::Complete)], false);
        assert!(matches!(result, Err(StorageError::MissingTable(_))));
    }

    #[test]
    fn test_read_column_seeds_identifiers() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        assert!(storage.read_column("travel", "id").unwrap().is_empty());

        storage
            .append_rows(
                "travel",
                &[
                    record("a", ExtractionStatus::Complete),
                    record("b", ExtractionStatus::PartiallyFailed),
                    record("a", ExtractionStatus::Complete),
                ],
                true,
            )
            .unwrap();

        let ids = storage.read_column("travel", "id").unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("a") && ids.contains("b"));

        assert!(matches!(
            storage.read_column("travel", "id; DROP TABLE travel"),
            Err(StorageError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_comments_stored_as_delimited_field() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        storage
            .append_rows("travel", &[record("1", ExtractionStatus::Complete)], true)
            .unwrap();

        let comments = storage.read_column("travel", "comments").unwrap();
        assert!(comments.contains("nice || agreed"));
    }

    #[test]
    fn test_remove_duplicates_keeps_first_row() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        let mut first = record("a", ExtractionStatus::Complete);
        first.title = "first".to_string();
        let mut second = record("a", ExtractionStatus::PartiallyFailed);
        second.title = UNRESOLVED_TITLE.to_string();

        storage
            .append_rows(
                "travel",
                &[first, record("b", ExtractionStatus::Complete), second],
                true,
            )
            .unwrap();

        assert_eq!(storage.count_rows("travel").unwrap(), 3);
        assert_eq!(storage.remove_duplicates("travel").unwrap(), 1);
        assert_eq!(storage.count_rows("travel").unwrap(), 2);
        assert_eq!(storage.count_distinct_ids("travel").unwrap(), 2);
        assert_eq!(storage.read_titles("travel").unwrap(), vec!["first", "title b"]);
    }

    #[test]
    fn test_count_by_status() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        storage
            .append_rows(
                "travel",
                &[
                    record("1", ExtractionStatus::Complete),
                    record("2", ExtractionStatus::PartiallyFailed),
                    record("3", ExtractionStatus::PartiallyFailed),
                ],
                true,
            )
            .unwrap();

        let summary = storage.count_by_status("travel").unwrap();
        assert_eq!(summary.get(&ExtractionStatus::Complete), Some(&1));
        assert_eq!(summary.get(&ExtractionStatus::PartiallyFailed), Some(&2));
        assert_eq!(summary.get(&ExtractionStatus::Failed), None);
    }

    #[test]
    fn test_invalid_table_name_rejected() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        let result = storage.append_rows("harvest_runs", &[], true);
        assert!(matches!(result, Err(StorageError::InvalidTableName { .. })));
    }

    #[test]
    fn test_run_log_roundtrip() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        assert!(storage.get_latest_run().unwrap().is_none());

        let run_id = storage.create_run("abc123").unwrap();
        let target = BoardTarget {
            board_id: "travel".to_string(),
            output_table: "travel".to_string(),
            target_count: 5,
        };
        let mut report = BoardReport::new(&target);
        report.complete = 4;
        report.partially_failed = 1;
        report.persisted = 5;
        report.flushes = vec![2, 2, 1];
        report.discovery_stop = Some(DiscoveryStop::TargetReached);

        storage.record_board_report(run_id, &report).unwrap();
        storage
            .record_board_report(run_id, &BoardReport::unreachable(&target, "timeout"))
            .unwrap();
        storage.finish_run(run_id, RunStatus::Partial).unwrap();

        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.status, RunStatus::Partial);
        assert!(run.finished_at.is_some());

        let reports = storage.get_board_reports(run_id).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0], report);
        assert_eq!(reports[1].unreachable.as_deref(), Some("timeout"));
        assert!(reports[1].flushes.is_empty());
    }

    #[test]
    fn test_finish_unknown_run() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        assert!(matches!(
            storage.finish_run(99, RunStatus::Completed),
            Err(StorageError::RunNotFound(99))
        ));
    }

    #[test]
    fn test_reopen_file_database_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("boards.db");

        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage
                .append_rows("travel", &[record("1", ExtractionStatus::Complete)], true)
                .unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        assert_eq!(storage.count_rows("travel").unwrap(), 1);
    }
}
