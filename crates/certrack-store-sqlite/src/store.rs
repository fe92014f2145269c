//! [`SqliteStore`], the SQLite implementation of [`CertStore`].

use std::path::Path;

use certrack_core::{
  import::{CreatedEntities, ImportRow, RowOutcome, SchoolRelink},
  model::{
    CertStatus, Certification, CertificationView, ClassGroup, NewTeacher,
    School, Teacher, Year, Zone,
  },
  overview::{GroupCount, Overview, OverviewQuery, OverviewRow},
  store::{CertStore, Outcome},
};
use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension as _, ToSql, Transaction};

use crate::{
  Result,
  encode::{
    CERTIFICATION_COLUMNS, RawCertification, RawCertificationView, decode_status,
    encode_dt, encode_status,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A certrack store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
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

  /// Run a CRUD write in its own transaction.
  ///
  /// Commits only on [`Outcome::Applied`]. A constraint violation rolls the
  /// transaction back and becomes [`Outcome::Conflict`].
  async fn write<T, F>(&self, f: F) -> Result<Outcome<T>>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> rusqlite::Result<Outcome<T>> + Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let outcome = match f(&tx) {
          Ok(Outcome::Applied(t)) => tx.commit().map(|()| Outcome::Applied(t)),
          Ok(other) => Ok(other),
          Err(e) => Err(e),
        };
        match outcome {
          Err(e) if is_constraint_violation(&e) => Ok(Outcome::Conflict(e.to_string())),
          other => Ok(other?),
        }
      })
      .await?;
    Ok(outcome)
  }
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
  e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation)
}

/// `Applied(())` when the statement touched a row, `NotFound` otherwise.
fn touched(changed: usize) -> Outcome<()> {
  if changed == 0 { Outcome::NotFound } else { Outcome::Applied(()) }
}

fn exists(conn: &Connection, table: &str, id: i64) -> rusqlite::Result<bool> {
  conn
    .query_row(
      &format!("SELECT 1 FROM {table} WHERE id = ?1"),
      [id],
      |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

// ─── Get-or-create helpers ───────────────────────────────────────────────────

/// Return the id selected by `select`, inserting with `insert` if none.
/// The flag is `true` when the row was created.
fn get_or_create(
  conn: &Connection,
  select: &str,
  insert: &str,
  params: &[&dyn ToSql],
) -> rusqlite::Result<(i64, bool)> {
  if let Some(id) = conn.query_row(select, params, |r| r.get(0)).optional()? {
    return Ok((id, false));
  }
  conn.execute(insert, params)?;
  Ok((conn.last_insert_rowid(), true))
}

fn zone_by_name(conn: &Connection, name: &str) -> rusqlite::Result<(i64, bool)> {
  get_or_create(
    conn,
    "SELECT id FROM zones WHERE name = ?1",
    "INSERT INTO zones (name) VALUES (?1)",
    rusqlite::params![name],
  )
}

fn year_by_value(conn: &Connection, value: i64) -> rusqlite::Result<(i64, bool)> {
  get_or_create(
    conn,
    "SELECT id FROM years WHERE value = ?1",
    "INSERT INTO years (value) VALUES (?1)",
    rusqlite::params![value],
  )
}

fn class_by_number(
  conn: &Connection,
  number: i64,
  year_id: i64,
) -> rusqlite::Result<(i64, bool)> {
  get_or_create(
    conn,
    "SELECT id FROM classes WHERE number = ?1 AND year_id = ?2",
    "INSERT INTO classes (number, year_id) VALUES (?1, ?2)",
    rusqlite::params![number, year_id],
  )
}

/// Get-or-create a school by name under `zone_id`. An existing school filed
/// under another zone is moved to `zone_id`; the move is returned.
fn school_in_zone(
  conn: &Connection,
  name: &str,
  zone_id: i64,
  zone_name: &str,
) -> rusqlite::Result<(i64, bool, Option<SchoolRelink>)> {
  let existing: Option<(i64, i64)> = conn
    .query_row(
      "SELECT id, zone_id FROM schools WHERE name = ?1",
      [name],
      |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .optional()?;

  match existing {
    Some((id, current)) if current == zone_id => Ok((id, false, None)),
    Some((id, current)) => {
      let from_zone: String = conn.query_row(
        "SELECT name FROM zones WHERE id = ?1",
        [current],
        |r| r.get(0),
      )?;
      conn.execute(
        "UPDATE schools SET zone_id = ?2 WHERE id = ?1",
        [id, zone_id],
      )?;
      Ok((
        id,
        false,
        Some(SchoolRelink {
          school: name.to_owned(),
          from_zone,
          to_zone: zone_name.to_owned(),
        }),
      ))
    }
    None => {
      conn.execute(
        "INSERT INTO schools (name, zone_id) VALUES (?1, ?2)",
        rusqlite::params![name, zone_id],
      )?;
      Ok((conn.last_insert_rowid(), true, None))
    }
  }
}

/// Insert a `NOT_CERTIFIED` certification unless one already exists for the
/// pair. The year is copied from the class. Returns `true` if inserted.
fn insert_certification(
  conn: &Connection,
  teacher_id: i64,
  class_id: i64,
) -> rusqlite::Result<bool> {
  let changed = conn.execute(
    "INSERT INTO certifications (teacher_id, class_id, year_id, status, created_at)
     SELECT ?1, c.id, c.year_id, ?3, ?4 FROM classes c WHERE c.id = ?2
     ON CONFLICT (teacher_id, class_id) DO NOTHING",
    rusqlite::params![
      teacher_id,
      class_id,
      encode_status(CertStatus::NotCertified),
      encode_dt(Utc::now()),
    ],
  )?;
  Ok(changed == 1)
}

fn class_group(conn: &Connection, id: i64) -> rusqlite::Result<ClassGroup> {
  conn.query_row(
    "SELECT c.id, c.number, c.year_id, y.value
     FROM classes c JOIN years y ON y.id = c.year_id
     WHERE c.id = ?1",
    [id],
    |r| {
      Ok(ClassGroup {
        id:      r.get(0)?,
        number:  r.get(1)?,
        year_id: r.get(2)?,
        year:    r.get(3)?,
      })
    },
  )
}

fn raw_certification(
  conn: &Connection,
  id: i64,
) -> rusqlite::Result<Option<RawCertification>> {
  conn
    .query_row(
      &format!("SELECT {CERTIFICATION_COLUMNS} FROM certifications ce WHERE ce.id = ?1"),
      [id],
      RawCertification::from_row,
    )
    .optional()
}

// ─── Overview SQL ────────────────────────────────────────────────────────────

/// Join from the certification outward. Parameters: `?1` class number,
/// `?2` year value (both NULL for no class filter), `?3` status or NULL.
const OVERVIEW_FROM: &str = "
  FROM certifications ce
  JOIN teachers t ON t.id = ce.teacher_id
  JOIN schools  s ON s.id = t.school_id
  JOIN zones    z ON z.id = s.zone_id
  JOIN classes  c ON c.id = ce.class_id
  JOIN years    y ON y.id = c.year_id
  WHERE (?1 IS NULL OR (c.number = ?1 AND y.value = ?2))
    AND (?3 IS NULL OR ce.status = ?3)";

fn group_counts(
  conn: &Connection,
  key: &str,
  params: &[&dyn ToSql],
) -> rusqlite::Result<Vec<GroupCount>> {
  let sql = format!(
    "SELECT CAST({key} AS TEXT), COUNT(ce.id) {OVERVIEW_FROM}
     GROUP BY {key} ORDER BY {key}"
  );
  let mut stmt = conn.prepare(&sql)?;
  let counts = stmt
    .query_map(params, |r| Ok(GroupCount { label: r.get(0)?, value: r.get(1)? }))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(counts)
}

// ─── CertStore impl ──────────────────────────────────────────────────────────

impl CertStore for SqliteStore {
  type Error = crate::Error;

  // ── Zones ─────────────────────────────────────────────────────────────────

  async fn list_zones(&self) -> Result<Vec<Zone>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare("SELECT id, name FROM zones ORDER BY name")?;
          let rows = stmt
            .query_map([], |r| Ok(Zone { id: r.get(0)?, name: r.get(1)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn get_zone(&self, id: i64) -> Result<Option<Zone>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row("SELECT id, name FROM zones WHERE id = ?1", [id], |r| {
                Ok(Zone { id: r.get(0)?, name: r.get(1)? })
              })
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn create_zone(&self, name: String) -> Result<Outcome<Zone>> {
    self
      .write(move |tx| {
        tx.execute("INSERT INTO zones (name) VALUES (?1)", [&name])?;
        Ok(Outcome::Applied(Zone { id: tx.last_insert_rowid(), name }))
      })
      .await
  }

  async fn rename_zone(&self, id: i64, name: String) -> Result<Outcome<Zone>> {
    self
      .write(move |tx| {
        let changed = tx.execute(
          "UPDATE zones SET name = ?2 WHERE id = ?1",
          rusqlite::params![id, name],
        )?;
        Ok(touched(changed).map(|()| Zone { id, name }))
      })
      .await
  }

  async fn delete_zone(&self, id: i64) -> Result<Outcome<()>> {
    self
      .write(move |tx| Ok(touched(tx.execute("DELETE FROM zones WHERE id = ?1", [id])?)))
      .await
  }

  // ── Schools ───────────────────────────────────────────────────────────────

  async fn list_schools(&self) -> Result<Vec<School>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt =
            conn.prepare("SELECT id, name, zone_id FROM schools ORDER BY name")?;
          let rows = stmt
            .query_map([], |r| {
              Ok(School { id: r.get(0)?, name: r.get(1)?, zone_id: r.get(2)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn get_school(&self, id: i64) -> Result<Option<School>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT id, name, zone_id FROM schools WHERE id = ?1",
                [id],
                |r| Ok(School { id: r.get(0)?, name: r.get(1)?, zone_id: r.get(2)? }),
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn create_school(&self, name: String, zone_id: i64) -> Result<Outcome<School>> {
    self
      .write(move |tx| {
        if !exists(tx, "zones", zone_id)? {
          return Ok(Outcome::NotFound);
        }
        tx.execute(
          "INSERT INTO schools (name, zone_id) VALUES (?1, ?2)",
          rusqlite::params![name, zone_id],
        )?;
        Ok(Outcome::Applied(School { id: tx.last_insert_rowid(), name, zone_id }))
      })
      .await
  }

  async fn update_school(
    &self,
    id: i64,
    name: String,
    zone_id: i64,
  ) -> Result<Outcome<School>> {
    self
      .write(move |tx| {
        if !exists(tx, "zones", zone_id)? {
          return Ok(Outcome::NotFound);
        }
        let changed = tx.execute(
          "UPDATE schools SET name = ?2, zone_id = ?3 WHERE id = ?1",
          rusqlite::params![id, name, zone_id],
        )?;
        Ok(touched(changed).map(|()| School { id, name, zone_id }))
      })
      .await
  }

  async fn delete_school(&self, id: i64) -> Result<Outcome<()>> {
    self
      .write(move |tx| Ok(touched(tx.execute("DELETE FROM schools WHERE id = ?1", [id])?)))
      .await
  }

  // ── Teachers ──────────────────────────────────────────────────────────────

  async fn list_teachers(&self) -> Result<Vec<Teacher>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare(
            "SELECT id, name, document, email, school_id FROM teachers ORDER BY name, id",
          )?;
          let rows = stmt
            .query_map([], |r| {
              Ok(Teacher {
                id:        r.get(0)?,
                name:      r.get(1)?,
                document:  r.get(2)?,
                email:     r.get(3)?,
                school_id: r.get(4)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn get_teacher(&self, id: i64) -> Result<Option<Teacher>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT id, name, document, email, school_id FROM teachers WHERE id = ?1",
                [id],
                |r| {
                  Ok(Teacher {
                    id:        r.get(0)?,
                    name:      r.get(1)?,
                    document:  r.get(2)?,
                    email:     r.get(3)?,
                    school_id: r.get(4)?,
                  })
                },
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn create_teacher(&self, input: NewTeacher) -> Result<Outcome<Teacher>> {
    self
      .write(move |tx| {
        if !exists(tx, "schools", input.school_id)? {
          return Ok(Outcome::NotFound);
        }
        tx.execute(
          "INSERT INTO teachers (name, document, email, school_id) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![input.name, input.document, input.email, input.school_id],
        )?;
        let teacher = Teacher {
          id:        tx.last_insert_rowid(),
          name:      input.name,
          document:  input.document,
          email:     input.email,
          school_id: input.school_id,
        };

        if let Some(enrollment) = input.enrollment {
          let (year_id, _) = year_by_value(tx, enrollment.year)?;
          let (class_id, _) = class_by_number(tx, enrollment.class.number, year_id)?;
          insert_certification(tx, teacher.id, class_id)?;
        }

        Ok(Outcome::Applied(teacher))
      })
      .await
  }

  async fn delete_teacher(&self, id: i64) -> Result<Outcome<()>> {
    self
      .write(move |tx| Ok(touched(tx.execute("DELETE FROM teachers WHERE id = ?1", [id])?)))
      .await
  }

  // ── Years and classes ─────────────────────────────────────────────────────

  async fn list_years(&self) -> Result<Vec<Year>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare("SELECT id, value FROM years ORDER BY value")?;
          let rows = stmt
            .query_map([], |r| Ok(Year { id: r.get(0)?, value: r.get(1)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn create_year(&self, value: i64) -> Result<Outcome<Year>> {
    self
      .write(move |tx| {
        tx.execute("INSERT INTO years (value) VALUES (?1)", [value])?;
        Ok(Outcome::Applied(Year { id: tx.last_insert_rowid(), value }))
      })
      .await
  }

  async fn delete_year(&self, id: i64) -> Result<Outcome<()>> {
    self
      .write(move |tx| Ok(touched(tx.execute("DELETE FROM years WHERE id = ?1", [id])?)))
      .await
  }

  async fn list_classes(&self, year: Option<i64>) -> Result<Vec<ClassGroup>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT c.id, c.number, c.year_id, y.value
             FROM classes c JOIN years y ON y.id = c.year_id
             WHERE ?1 IS NULL OR y.value = ?1
             ORDER BY y.value, c.number",
          )?;
          let rows = stmt
            .query_map([year], |r| {
              Ok(ClassGroup {
                id:      r.get(0)?,
                number:  r.get(1)?,
                year_id: r.get(2)?,
                year:    r.get(3)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn create_next_class(&self, year: i64) -> Result<ClassGroup> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          let (year_id, _) = year_by_value(&tx, year)?;
          let next: i64 = tx.query_row(
            "SELECT COALESCE(MAX(number), 0) + 1 FROM classes WHERE year_id = ?1",
            [year_id],
            |r| r.get(0),
          )?;
          tx.execute(
            "INSERT INTO classes (number, year_id) VALUES (?1, ?2)",
            [next, year_id],
          )?;
          let class = class_group(&tx, tx.last_insert_rowid())?;
          tx.commit()?;
          Ok(class)
        })
        .await?,
    )
  }

  async fn delete_class(&self, id: i64) -> Result<Outcome<()>> {
    self
      .write(move |tx| Ok(touched(tx.execute("DELETE FROM classes WHERE id = ?1", [id])?)))
      .await
  }

  // ── Certifications ────────────────────────────────────────────────────────

  async fn get_certification(&self, id: i64) -> Result<Option<Certification>> {
    let raw = self
      .conn
      .call(move |conn| Ok(raw_certification(conn, id)?))
      .await?;
    raw.map(RawCertification::into_certification).transpose()
  }

  async fn list_certifications(&self, status: CertStatus) -> Result<Vec<CertificationView>> {
    let status_str = encode_status(status);

    let raws: Vec<RawCertificationView> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CERTIFICATION_COLUMNS}, t.name, s.name, z.name, c.number, y.value
           FROM certifications ce
           JOIN teachers t ON t.id = ce.teacher_id
           JOIN schools  s ON s.id = t.school_id
           JOIN zones    z ON z.id = s.zone_id
           JOIN classes  c ON c.id = ce.class_id
           JOIN years    y ON y.id = c.year_id
           WHERE ce.status = ?1
           ORDER BY ce.id DESC"
        ))?;
        let rows = stmt
          .query_map([status_str], |r| {
            Ok(RawCertificationView {
              certification: RawCertification::from_row(r)?,
              teacher:       r.get(7)?,
              school:        r.get(8)?,
              zone:          r.get(9)?,
              class_number:  r.get(10)?,
              year:          r.get(11)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCertificationView::into_view).collect()
  }

  async fn set_certificate_file(
    &self,
    id: i64,
    file_path: Option<String>,
    status: CertStatus,
  ) -> Result<Option<Certification>> {
    let status_str = encode_status(status);

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE certifications SET file_path = ?2, status = ?3 WHERE id = ?1",
          rusqlite::params![id, file_path, status_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(raw_certification(conn, id)?)
      })
      .await?;

    raw.map(RawCertification::into_certification).transpose()
  }

  // ── Import ────────────────────────────────────────────────────────────────

  async fn apply_import_row(&self, row: ImportRow) -> Result<RowOutcome> {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let (zone_id, zone) = zone_by_name(&tx, &row.zone)?;
        let (school_id, school, school_relink) =
          school_in_zone(&tx, &row.school, zone_id, &row.zone)?;
        let (teacher_id, teacher) = get_or_create(
          &tx,
          "SELECT id FROM teachers WHERE name = ?1 AND school_id = ?2 ORDER BY id LIMIT 1",
          "INSERT INTO teachers (name, school_id) VALUES (?1, ?2)",
          rusqlite::params![row.teacher, school_id],
        )?;
        let (year_id, year) = year_by_value(&tx, row.year)?;
        let (class_id, class) = class_by_number(&tx, row.class_number, year_id)?;
        let certification = insert_certification(&tx, teacher_id, class_id)?;

        tx.commit()?;

        Ok(RowOutcome {
          created: CreatedEntities { zone, school, teacher, year, class, certification },
          school_relink,
        })
      })
      .await?;

    if let Some(relink) = &outcome.school_relink {
      tracing::debug!(
        school = %relink.school,
        from = %relink.from_zone,
        to = %relink.to_zone,
        "school moved to another zone by import"
      );
    }

    Ok(outcome)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn overview(&self, query: &OverviewQuery) -> Result<Overview> {
    let class_number = query.class.map(|c| c.number);
    let year_value = query.class.map(|c| c.year);
    let status = query.only_certified.then(|| encode_status(CertStatus::Certified));

    let (raw_rows, by_zone, by_school, by_year) = self
      .conn
      .call(move |conn| {
        let params: &[&dyn ToSql] = &[&class_number, &year_value, &status];

        let mut stmt = conn.prepare(&format!(
          "SELECT z.name, s.name, t.name, y.value, c.number,
                  ce.file_path IS NOT NULL, ce.status, ce.id
           {OVERVIEW_FROM}
           ORDER BY z.name, s.name, t.name, ce.id"
        ))?;
        let rows = stmt
          .query_map(params, |r| {
            Ok((
              r.get::<_, String>(0)?,
              r.get::<_, String>(1)?,
              r.get::<_, String>(2)?,
              r.get::<_, i64>(3)?,
              r.get::<_, i64>(4)?,
              r.get::<_, bool>(5)?,
              r.get::<_, String>(6)?,
              r.get::<_, i64>(7)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let by_zone = group_counts(conn, "z.name", params)?;
        let by_school = group_counts(conn, "s.name", params)?;
        let by_year = group_counts(conn, "y.value", params)?;

        Ok((rows, by_zone, by_school, by_year))
      })
      .await?;

    let rows = raw_rows
      .into_iter()
      .map(|(zone, school, teacher, year, number, has_file, status, id)| {
        Ok(OverviewRow {
          zone,
          school,
          teacher,
          year,
          class: format!("{number}/{year}"),
          has_file,
          status: decode_status(&status)?,
          certification_id: id,
        })
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(Overview { rows, by_zone, by_school, by_year })
  }
}
