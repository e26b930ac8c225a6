use crate::calc::{ExamType, RawMarkEntry};
use anyhow::anyhow;
use rusqlite::{params_from_iter, types::Value, Connection, OptionalExtension};
use std::path::Path;
use uuid::Uuid;

pub const DB_FILE_NAME: &str = "resultsd.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    // Only raw marks live here. Percentage/grade/points are derived on read
    // so they can never drift from the active grading scale.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS mark_entries(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            class_id TEXT NOT NULL,
            term_id TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            exam_type TEXT NOT NULL,
            marks_obtained REAL NOT NULL,
            out_of REAL NOT NULL,
            comment TEXT,
            entered_by TEXT NOT NULL,
            updated_at TEXT,
            UNIQUE(student_id, subject_id, term_id, academic_year, exam_type)
        )",
        [],
    )?;
    ensure_mark_entries_updated_at(&conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_mark_entries_class_term
         ON mark_entries(class_id, term_id, academic_year)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_mark_entries_student_term
         ON mark_entries(student_id, term_id)",
        [],
    )?;

    Ok(conn)
}

fn ensure_mark_entries_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "mark_entries", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE mark_entries ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn settings_get_json(
    conn: &Connection,
    key: &str,
) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    let text = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, text),
    )?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

impl UpsertOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            UpsertOutcome::Created => "created",
            UpsertOutcome::Updated => "updated",
        }
    }
}

/// Inserts or overwrites the entry for
/// `(student, subject, term, academicYear, examType)`.
pub fn upsert_mark(conn: &Connection, entry: &RawMarkEntry) -> anyhow::Result<UpsertOutcome> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM mark_entries
             WHERE student_id = ? AND subject_id = ? AND term_id = ?
               AND academic_year = ? AND exam_type = ?",
            (
                &entry.student_id,
                &entry.subject_id,
                &entry.term_id,
                &entry.academic_year,
                entry.exam_type.as_str(),
            ),
            |r| r.get(0),
        )
        .optional()?;

    let id = existing
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let updated_at = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO mark_entries(
            id, student_id, subject_id, class_id, term_id, academic_year, exam_type,
            marks_obtained, out_of, comment, entered_by, updated_at
         )
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(student_id, subject_id, term_id, academic_year, exam_type) DO UPDATE SET
           class_id = excluded.class_id,
           marks_obtained = excluded.marks_obtained,
           out_of = excluded.out_of,
           comment = excluded.comment,
           entered_by = excluded.entered_by,
           updated_at = excluded.updated_at",
        rusqlite::params![
            id,
            entry.student_id,
            entry.subject_id,
            entry.class_id,
            entry.term_id,
            entry.academic_year,
            entry.exam_type.as_str(),
            entry.marks_obtained,
            entry.out_of,
            entry.comment,
            entry.entered_by,
            updated_at,
        ],
    )?;

    Ok(if existing.is_some() {
        UpsertOutcome::Updated
    } else {
        UpsertOutcome::Created
    })
}

pub fn delete_mark(
    conn: &Connection,
    student_id: &str,
    subject_id: &str,
    term_id: &str,
    academic_year: &str,
    exam_type: ExamType,
) -> anyhow::Result<bool> {
    let n = conn.execute(
        "DELETE FROM mark_entries
         WHERE student_id = ? AND subject_id = ? AND term_id = ?
           AND academic_year = ? AND exam_type = ?",
        (
            student_id,
            subject_id,
            term_id,
            academic_year,
            exam_type.as_str(),
        ),
    )?;
    Ok(n > 0)
}

#[derive(Debug, Clone, Default)]
pub struct MarkQuery {
    pub class_id: Option<String>,
    pub term_id: String,
    pub academic_year: Option<String>,
    pub exam_type: Option<ExamType>,
    pub student_id: Option<String>,
}

/// Entries matching the query in submission order within each
/// `(student, subject)` pair.
pub fn query_marks(conn: &Connection, q: &MarkQuery) -> anyhow::Result<Vec<RawMarkEntry>> {
    let mut clauses: Vec<&str> = vec!["term_id = ?"];
    let mut bind_values: Vec<Value> = vec![Value::Text(q.term_id.clone())];
    if let Some(class_id) = &q.class_id {
        clauses.push("class_id = ?");
        bind_values.push(Value::Text(class_id.clone()));
    }
    if let Some(year) = &q.academic_year {
        clauses.push("academic_year = ?");
        bind_values.push(Value::Text(year.clone()));
    }
    if let Some(exam_type) = q.exam_type {
        clauses.push("exam_type = ?");
        bind_values.push(Value::Text(exam_type.as_str().to_string()));
    }
    if let Some(student_id) = &q.student_id {
        clauses.push("student_id = ?");
        bind_values.push(Value::Text(student_id.clone()));
    }

    let sql = format!(
        "SELECT student_id, subject_id, class_id, term_id, academic_year, exam_type,
                marks_obtained, out_of, comment, entered_by
         FROM mark_entries
         WHERE {}
         ORDER BY student_id, subject_id, COALESCE(updated_at, ''), rowid",
        clauses.join(" AND ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(bind_values), |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, String>(5)?,
                r.get::<_, f64>(6)?,
                r.get::<_, f64>(7)?,
                r.get::<_, Option<String>>(8)?,
                r.get::<_, String>(9)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::with_capacity(rows.len());
    for (
        student_id,
        subject_id,
        class_id,
        term_id,
        academic_year,
        exam_type_raw,
        marks_obtained,
        out_of,
        comment,
        entered_by,
    ) in rows
    {
        let exam_type = ExamType::parse(&exam_type_raw)
            .ok_or_else(|| anyhow!("stored mark has unknown exam type: {}", exam_type_raw))?;
        out.push(RawMarkEntry {
            student_id,
            subject_id,
            class_id,
            term_id,
            academic_year,
            exam_type,
            marks_obtained,
            out_of,
            comment,
            entered_by,
        });
    }
    Ok(out)
}

/// Distinct classes a student has marks under for a term.
pub fn classes_for_student(
    conn: &Connection,
    student_id: &str,
    term_id: &str,
    academic_year: Option<&str>,
) -> anyhow::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT class_id FROM mark_entries
         WHERE student_id = ? AND term_id = ? AND (? IS NULL OR academic_year = ?)
         ORDER BY class_id",
    )?;
    let ids = stmt
        .query_map((student_id, term_id, academic_year, academic_year), |r| {
            r.get::<_, String>(0)
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}
