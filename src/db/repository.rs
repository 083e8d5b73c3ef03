use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection as SqliteConnection, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{NewSummaryRecord, SummaryRecord};

use super::schema::SCHEMA;

const SELECT_COLUMNS: &str = "SELECT id, source_link, headline, summary, created_at FROM summaries";

// SQLite's own lower() and LIKE only fold ASCII.
const CASEFOLD_FN: &str = "casefold";

/// Summary store. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            register_casefold(conn)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    pub async fn insert(&self, record: NewSummaryRecord) -> Result<SummaryRecord> {
        // Stored at microsecond precision; keep the returned value identical.
        let created_at = Utc::now().trunc_subsecs(6);
        let stamp = format_datetime(&created_at);

        let stored = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO summaries (source_link, headline, summary, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![record.source_link, record.headline, record.summary, stamp],
                )?;
                Ok(SummaryRecord {
                    id: conn.last_insert_rowid(),
                    source_link: record.source_link,
                    headline: record.headline,
                    summary: record.summary,
                    created_at,
                })
            })
            .await?;

        tracing::debug!("Saved summary {} for {}", stored.id, stored.source_link);
        Ok(stored)
    }

    /// Up to `limit` records, newest first.
    pub async fn latest(&self, limit: usize) -> Result<Vec<SummaryRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC LIMIT ?1"
                ))?;
                let records = stmt
                    .query_map(params![limit], record_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await?;
        Ok(records)
    }

    /// Records whose headline contains `query`, ignoring case, newest first.
    pub async fn search_by_headline(&self, query: &str) -> Result<Vec<SummaryRecord>> {
        let needle = query.to_lowercase();
        let records = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_COLUMNS} WHERE instr({CASEFOLD_FN}(headline), ?1) > 0 ORDER BY created_at DESC, id DESC"
                ))?;
                let records = stmt
                    .query_map(params![needle], record_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await?;
        Ok(records)
    }

    pub async fn count(&self) -> Result<usize> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM summaries", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

// Fixed-width UTC stamps so lexical order in SQL matches chronological order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Rows written by hand with sqlite's datetime('now')
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn register_casefold(conn: &SqliteConnection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        CASEFOLD_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text = ctx.get::<Option<String>>(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

fn record_from_row(row: &Row) -> rusqlite::Result<SummaryRecord> {
    Ok(SummaryRecord {
        id: row.get(0)?,
        source_link: row.get(1)?,
        headline: row.get(2)?,
        summary: row.get(3)?,
        created_at: stored_datetime(row.get(0)?, row.get(4)?),
    })
}

fn stored_datetime(id: i64, stamp: String) -> DateTime<Utc> {
    parse_datetime(&stamp).unwrap_or_else(|| {
        tracing::warn!("Summary {} has unreadable created_at {:?}", id, stamp);
        DateTime::<Utc>::UNIX_EPOCH
    })
}
