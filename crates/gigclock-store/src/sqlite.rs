//! SQLite-based store implementation

use chrono::{DateTime, Datelike, SecondsFormat, TimeZone, Utc};
use gigclock_api::{AttendanceEvent, Coordinate};
use gigclock_util::{EventId, TimeRange, WorkerId};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{AuditEvent, AuditEventType, Store, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Column values of one `attendance_events` row
type EventRow = (String, String, String, f64, f64, f64, bool, String);

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Attendance events (append-only)
            CREATE TABLE IF NOT EXISTS attendance_events (
                id TEXT PRIMARY KEY,
                worker_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                distance_meters REAL NOT NULL,
                verified INTEGER NOT NULL,
                status TEXT NOT NULL
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_events_worker_time
                ON attendance_events(worker_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

/// Fixed-width RFC 3339 UTC text, so lexical order matches instant order
fn to_sql_timestamp(instant: &DateTime<Utc>) -> String {
    let clamped = if instant.year() > 9999 {
        Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59)
            .single()
            .unwrap_or(*instant)
    } else if instant.year() < 0 {
        Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(*instant)
    } else {
        *instant
    };
    clamped.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn from_sql_timestamp(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("bad timestamp '{}': {}", s, e)))
}

fn event_from_row(row: EventRow) -> StoreResult<AttendanceEvent> {
    let (id, kind, timestamp, latitude, longitude, distance_meters, verified, status) = row;
    let serialization = |e: gigclock_api::ValueError| StoreError::Serialization(e.to_string());

    Ok(AttendanceEvent {
        id: EventId::parse(&id)
            .map_err(|e| StoreError::Serialization(format!("bad event id '{}': {}", id, e)))?,
        kind: kind.parse().map_err(serialization)?,
        timestamp: from_sql_timestamp(&timestamp)?,
        coordinate: Coordinate::new(latitude, longitude).map_err(serialization)?,
        distance_meters,
        verified,
        status: status.parse().map_err(serialization)?,
    })
}

impl Store for SqliteStore {
    fn append_event(&self, worker: &WorkerId, event: &AttendanceEvent) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO attendance_events
                (id, worker_id, kind, timestamp, latitude, longitude,
                 distance_meters, verified, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                event.id.to_string(),
                worker.as_str(),
                event.kind.as_str(),
                to_sql_timestamp(&event.timestamp),
                event.coordinate.latitude(),
                event.coordinate.longitude(),
                event.distance_meters,
                event.verified,
                event.status.as_str(),
            ],
        )?;

        debug!(
            worker_id = %worker,
            event_id = %event.id,
            kind = %event.kind,
            "Attendance event appended"
        );
        Ok(())
    }

    fn list_events(
        &self,
        worker: &WorkerId,
        range: Option<TimeRange>,
    ) -> StoreResult<Vec<AttendanceEvent>> {
        let conn = self.conn()?;

        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<EventRow> {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
            ))
        };

        let rows: Vec<EventRow> = match range {
            Some(range) => {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, kind, timestamp, latitude, longitude,
                           distance_meters, verified, status
                    FROM attendance_events
                    WHERE worker_id = ? AND timestamp >= ? AND timestamp < ?
                    ORDER BY timestamp ASC, rowid ASC
                    "#,
                )?;
                let rows = stmt.query_map(
                    params![
                        worker.as_str(),
                        to_sql_timestamp(&range.start),
                        to_sql_timestamp(&range.end)
                    ],
                    map_row,
                )?;
                rows.collect::<rusqlite::Result<_>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, kind, timestamp, latitude, longitude,
                           distance_meters, verified, status
                    FROM attendance_events
                    WHERE worker_id = ?
                    ORDER BY timestamp ASC, rowid ASC
                    "#,
                )?;
                let rows = stmt.query_map([worker.as_str()], map_row)?;
                rows.collect::<rusqlite::Result<_>>()?
            }
        };

        rows.into_iter().map(event_from_row).collect()
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![to_sql_timestamp(&event.timestamp), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(audit_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = from_sql_timestamp(&timestamp_str)?;
            let event: AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
