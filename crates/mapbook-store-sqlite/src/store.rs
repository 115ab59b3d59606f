//! [`SqliteStore`]: the SQLite implementation of [`ReportStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, named_params};
use uuid::Uuid;

use mapbook_core::{
  report::{Query, QueryEdit, Report, ReportSnapshot, ReportUpdate, fork_title},
  store::ReportStore,
};

use crate::{
  Result,
  encode::{REPORT_COLUMNS, RawQuery, RawReport, encode_dt, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Mapbook report store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls
/// are serialised onto the connection's thread, so each closure passed to
/// [`tokio_rusqlite::Connection::call`] observes a single consistent state.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

/// Read a non-archived report as seen by `viewer`.
fn read_report(
  conn:   &rusqlite::Connection,
  id:     &str,
  viewer: &str,
) -> rusqlite::Result<Option<RawReport>> {
  conn
    .query_row(
      &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = :id AND NOT archived"),
      named_params! { ":id": id, ":viewer": viewer },
      RawReport::from_row,
    )
    .optional()
}

fn read_queries(
  conn:      &rusqlite::Connection,
  report_id: &str,
) -> rusqlite::Result<Vec<RawQuery>> {
  let mut stmt = conn.prepare(
    "SELECT id, report_id, query_text FROM queries
     WHERE report_id = ?1
     ORDER BY created_at, id",
  )?;
  stmt
    .query_map(rusqlite::params![report_id], RawQuery::from_row)?
    .collect()
}

fn now() -> String { encode_dt(Utc::now()) }

// ─── ReportStore impl ────────────────────────────────────────────────────────

impl ReportStore for SqliteStore {
  type Error = crate::Error;

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn create_report(&self, owner: &str) -> Result<Report> {
    let now_dt = Utc::now();
    let report = Report {
      id:         Uuid::new_v4(),
      title:      mapbook_core::report::UNTITLED.to_owned(),
      map_config: String::new(),
      can_write:  true,
      created_at: now_dt,
      updated_at: now_dt,
    };

    let id_str    = encode_uuid(report.id);
    let owner_str = owner.to_owned();
    let at_str    = encode_dt(now_dt);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO reports (id, author_email, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?3)",
          rusqlite::params![id_str, owner_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(report)
  }

  async fn get_report(&self, id: Uuid, viewer: &str) -> Result<Option<Report>> {
    let id_str     = encode_uuid(id);
    let viewer_str = viewer.to_owned();

    let raw = self
      .conn
      .call(move |conn| Ok(read_report(conn, &id_str, &viewer_str)?))
      .await?;

    raw.map(RawReport::into_report).transpose()
  }

  async fn list_reports(&self, viewer: &str) -> Result<Vec<Report>> {
    let viewer_str = viewer.to_owned();

    let raws: Vec<RawReport> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REPORT_COLUMNS} FROM reports
           WHERE author_email = :viewer AND NOT archived
           ORDER BY updated_at DESC, created_at DESC"
        ))?;
        let rows = stmt
          .query_map(named_params! { ":viewer": viewer_str }, RawReport::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReport::into_report).collect()
  }

  async fn snapshot(&self, id: Uuid, viewer: &str) -> Result<Option<ReportSnapshot>> {
    let id_str     = encode_uuid(id);
    let viewer_str = viewer.to_owned();

    // One read transaction so the report row and its queries come from the
    // same commit.
    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(report) = read_report(&tx, &id_str, &viewer_str)? else {
          return Ok(None);
        };
        let queries = read_queries(&tx, &id_str)?;
        tx.commit()?;
        Ok(Some((report, queries)))
      })
      .await?;

    let Some((report, queries)) = raw else {
      return Ok(None);
    };

    Ok(Some(ReportSnapshot {
      report:  report.into_report()?,
      queries: queries
        .into_iter()
        .map(RawQuery::into_query)
        .collect::<Result<_>>()?,
    }))
  }

  async fn update_report(
    &self,
    id:     Uuid,
    owner:  &str,
    update: ReportUpdate,
    edits:  Vec<QueryEdit>,
  ) -> Result<bool> {
    let id_str    = encode_uuid(id);
    let owner_str = owner.to_owned();
    let at_str    = now();
    let edits: Vec<(String, String)> = edits
      .into_iter()
      .map(|e| (encode_uuid(e.id), e.query_text))
      .collect();

    let applied = self
      .conn
      .call(move |conn| {
        // Returning early drops `tx`, which rolls back.
        let tx = conn.transaction()?;

        let n = tx.execute(
          "UPDATE reports SET map_config = ?1, title = ?2, updated_at = ?3
           WHERE id = ?4 AND author_email = ?5 AND NOT archived",
          rusqlite::params![update.map_config, update.title, at_str, id_str, owner_str],
        )?;
        if n == 0 {
          return Ok(false);
        }

        for (query_id, query_text) in &edits {
          let n = tx.execute(
            "UPDATE queries SET query_text = ?1, updated_at = ?2
             WHERE id = ?3 AND report_id = ?4",
            rusqlite::params![query_text, at_str, query_id, id_str],
          )?;
          if n == 0 {
            return Ok(false);
          }
        }

        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(applied)
  }

  async fn set_archived(&self, id: Uuid, owner: &str, archived: bool) -> Result<bool> {
    let id_str    = encode_uuid(id);
    let owner_str = owner.to_owned();
    let at_str    = now();

    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE reports SET archived = ?1, updated_at = ?2
           WHERE id = ?3 AND author_email = ?4",
          rusqlite::params![archived, at_str, id_str, owner_str],
        )?)
      })
      .await?;

    Ok(n > 0)
  }

  async fn fork_report(&self, source: Uuid, owner: &str) -> Result<Option<Report>> {
    let source_str = encode_uuid(source);
    let owner_str  = owner.to_owned();
    let now_dt     = Utc::now();
    let at_str     = encode_dt(now_dt);
    let fork_id    = Uuid::new_v4();
    let fork_str   = encode_uuid(fork_id);

    let copied = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let Some(src) = read_report(&tx, &source_str, &owner_str)? else {
          return Ok(None);
        };
        let queries = read_queries(&tx, &source_str)?;
        let title   = fork_title(&src.title);

        tx.execute(
          "INSERT INTO reports (id, author_email, map_config, title, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![fork_str, owner_str, src.map_config, title, at_str],
        )?;

        {
          let mut insert = tx.prepare(
            "INSERT INTO queries (id, report_id, query_text, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
          )?;
          for query in &queries {
            insert.execute(rusqlite::params![
              encode_uuid(Uuid::new_v4()),
              fork_str,
              query.query_text,
              at_str,
            ])?;
          }
        }

        tx.commit()?;
        Ok(Some((title, src.map_config)))
      })
      .await?;

    Ok(copied.map(|(title, map_config)| Report {
      id: fork_id,
      title,
      map_config,
      can_write: true,
      created_at: now_dt,
      updated_at: now_dt,
    }))
  }

  // ── Queries ───────────────────────────────────────────────────────────────

  async fn get_queries(&self, report_id: Uuid) -> Result<Vec<Query>> {
    let report_str = encode_uuid(report_id);

    let raws = self
      .conn
      .call(move |conn| Ok(read_queries(conn, &report_str)?))
      .await?;

    raws.into_iter().map(RawQuery::into_query).collect()
  }

  async fn create_query(&self, report_id: Uuid, query_text: String) -> Result<Option<Query>> {
    let query = Query {
      id: Uuid::new_v4(),
      report_id,
      query_text,
    };

    let id_str     = encode_uuid(query.id);
    let report_str = encode_uuid(report_id);
    let text       = query.query_text.clone();
    let at_str     = now();

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          "INSERT INTO queries (id, report_id, query_text, created_at, updated_at)
           SELECT ?1, ?2, ?3, ?4, ?4
           WHERE EXISTS (SELECT 1 FROM reports WHERE id = ?2 AND NOT archived)",
          rusqlite::params![id_str, report_str, text, at_str],
        )?;
        if n == 0 {
          return Ok(false);
        }
        tx.execute(
          "UPDATE reports SET updated_at = ?1 WHERE id = ?2",
          rusqlite::params![at_str, report_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(inserted.then_some(query))
  }

  async fn update_query(&self, id: Uuid, query_text: String) -> Result<Option<Uuid>> {
    let id_str = encode_uuid(id);
    let at_str = now();

    let report_str: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          "UPDATE queries SET query_text = ?1, updated_at = ?2 WHERE id = ?3",
          rusqlite::params![query_text, at_str, id_str],
        )?;
        if n == 0 {
          return Ok(None);
        }
        tx.execute(
          "UPDATE reports SET updated_at = ?1
           WHERE id = (SELECT report_id FROM queries WHERE id = ?2)",
          rusqlite::params![at_str, id_str],
        )?;
        tx.commit()?;

        // The request only names the query; the owning report is read back
        // after the commit so the caller can notify the right viewers.
        Ok(
          conn
            .query_row(
              "SELECT report_id FROM queries WHERE id = ?1 LIMIT 1",
              rusqlite::params![id_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    report_str.as_deref().map(crate::encode::decode_uuid).transpose()
  }
}
